//! Session lifecycle over an [`Engine`].
//!
//! A [`SessionManager`] owns exactly one engine and is either uninitialized
//! or bound to a single model file. Re-initializing releases the previous
//! model before the new one is loaded.

use crate::backend::{create_engine, Engine};
use futures::StreamExt;
use pocketmind_core::options::{PROMPT_PLACEHOLDER, STOP_SEQUENCES};
use pocketmind_core::protocol::InferenceEvent;
use pocketmind_core::{PocketError, SessionOptions, SessionOverrides};

/// Substitute the user prompt into a template.
///
/// Only the first occurrence of the placeholder is replaced; a template
/// without the placeholder is returned unchanged.
pub fn render_prompt(template: &str, prompt: &str) -> String {
    template.replacen(PROMPT_PLACEHOLDER, prompt, 1)
}

/// Cut `text` at the earliest stop sequence, if any occurs.
fn truncate_at_stop(text: &str) -> &str {
    let cut = STOP_SEQUENCES
        .iter()
        .filter_map(|stop| text.find(stop))
        .min();
    match cut {
        Some(idx) => &text[..idx],
        None => text,
    }
}

/// Manages a single inference session bound to one model at a time.
pub struct SessionManager {
    engine: Box<dyn Engine>,
    options: Option<SessionOptions>,
}

impl SessionManager {
    /// Create a manager backed by the default engine for this build.
    pub async fn new() -> Self {
        Self {
            engine: create_engine().await,
            options: None,
        }
    }

    /// Create a manager over a caller-supplied engine.
    pub fn with_engine(engine: Box<dyn Engine>) -> Self {
        Self {
            engine,
            options: None,
        }
    }

    /// True once a model has been loaded and not yet released.
    pub fn is_ready(&self) -> bool {
        self.options.is_some()
    }

    /// The model path this session is bound to, if any.
    pub fn bound_model(&self) -> Option<&str> {
        self.options.as_ref().map(|o| o.model_path.as_str())
    }

    /// The model path the engine reports as loaded, if any.
    pub fn loaded_model(&self) -> Option<&str> {
        self.engine.loaded_model()
    }

    /// Load a model and bind the session to it.
    ///
    /// Any previously bound model is released first. On failure the session
    /// stays (or becomes) uninitialized.
    pub async fn initialize(&mut self, options: SessionOptions) -> Result<(), PocketError> {
        if options.model_path.is_empty() {
            return Err(PocketError::EmptyModelPath);
        }

        self.release().await;

        self.engine
            .load_model(&options.model_path, &options)
            .await
            .map_err(|e| PocketError::EngineInit(e.to_string()))?;

        log::info!("session bound to {}", options.model_path);
        self.options = Some(options);
        Ok(())
    }

    /// Run one prompt through the bound model and collect the full reply.
    ///
    /// The prompt is rendered through the session's template, the engine's
    /// event stream is drained, and the accumulated text is truncated at the
    /// earliest stop sequence.
    pub async fn generate(
        &mut self,
        prompt: &str,
        overrides: Option<&SessionOverrides>,
    ) -> Result<String, PocketError> {
        let options = match (&self.options, overrides) {
            (Some(base), Some(ov)) => base.merged(ov),
            (Some(base), None) => base.clone(),
            (None, _) => return Err(PocketError::NotInitialized),
        };

        let rendered = render_prompt(&options.prompt_template, prompt);

        let mut events = self
            .engine
            .infer(&rendered, &options)
            .await
            .map_err(|e| PocketError::Inference(e.to_string()))?;

        let mut reply = String::new();
        while let Some(event) = events.next().await {
            match event.map_err(|e| PocketError::Inference(e.to_string()))? {
                InferenceEvent::ProcessStart => {}
                InferenceEvent::Content(piece) => reply.push_str(&piece),
                InferenceEvent::Complete => break,
            }
        }

        Ok(truncate_at_stop(&reply).trim().to_string())
    }

    /// Unload the bound model, if any. Safe to call repeatedly.
    pub async fn release(&mut self) {
        if self.engine.is_loaded() {
            if let Err(e) = self.engine.unload_model().await {
                log::warn!("failed to unload model: {}", e);
            }
        }
        self.options = None;
    }
}
