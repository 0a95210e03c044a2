//! Generation options and their defaults.

/// Literal placeholder in a prompt template that gets replaced with the raw
/// prompt text. Replaced exactly once per request.
pub const PROMPT_PLACEHOLDER: &str = "{prompt}";

/// Stop sequences applied to every completion request.
pub const STOP_SEQUENCES: &[&str] = &["</s>", "<|end|>", "<|im_end|>", "<|eot_id|>"];

const DEFAULT_PROMPT_TEMPLATE: &str =
    "<|im_start|>user\n{prompt}<|im_end|>\n<|im_start|>assistant\n";

/// Fully resolved options for an inference session.
///
/// Every field except `model_path` has a default. Callers adjust a subset
/// per request through [`SessionOverrides`] and [`SessionOptions::merged`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    /// Path to the local GGUF file. No default; an empty path is an error.
    pub model_path: String,
    /// Template the prompt is substituted into, see [`PROMPT_PLACEHOLDER`].
    pub prompt_template: String,
    pub temperature: f32,
    pub max_tokens: usize,
    pub context_size: u32,
    /// Layers offloaded to the GPU. 0 keeps inference on the CPU.
    pub gpu_layers: u32,
    /// Lock model weights in memory (mlock).
    pub use_mlock: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            model_path: String::new(),
            prompt_template: DEFAULT_PROMPT_TEMPLATE.to_string(),
            temperature: 0.7,
            max_tokens: 1024,
            context_size: 2048,
            gpu_layers: 0,
            use_mlock: false,
        }
    }
}

impl SessionOptions {
    /// Default options bound to a model file.
    pub fn for_model(model_path: impl Into<String>) -> Self {
        Self {
            model_path: model_path.into(),
            ..Self::default()
        }
    }

    /// Field-wise merge: every override that is set wins, everything else is
    /// taken from `self`. Pure; neither input is modified.
    pub fn merged(&self, overrides: &SessionOverrides) -> SessionOptions {
        SessionOptions {
            model_path: self.model_path.clone(),
            prompt_template: overrides
                .prompt_template
                .clone()
                .unwrap_or_else(|| self.prompt_template.clone()),
            temperature: overrides.temperature.unwrap_or(self.temperature),
            max_tokens: overrides.max_tokens.unwrap_or(self.max_tokens),
            context_size: overrides.context_size.unwrap_or(self.context_size),
            gpu_layers: overrides.gpu_layers.unwrap_or(self.gpu_layers),
            use_mlock: overrides.use_mlock.unwrap_or(self.use_mlock),
        }
    }
}

/// Per-request overrides. Unset fields fall back to the session's options.
#[derive(Debug, Clone, Default)]
pub struct SessionOverrides {
    pub prompt_template: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<usize>,
    pub context_size: Option<u32>,
    pub gpu_layers: Option<u32>,
    pub use_mlock: Option<bool>,
}
