#![cfg(feature = "real-engine")]

use crate::backend::Engine;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::channel::mpsc;
use futures::sink::SinkExt;
use llama_cpp_2::context::params::LlamaContextParams;
use llama_cpp_2::llama_backend::LlamaBackend;
use llama_cpp_2::llama_batch::LlamaBatch;
use llama_cpp_2::model::params::LlamaModelParams;
use llama_cpp_2::model::{AddBos, LlamaModel, Special};
use llama_cpp_2::sampling::LlamaSampler;
use pocketmind_core::protocol::InferenceEvent;
use pocketmind_core::SessionOptions;
use std::num::NonZeroU32;
use std::sync::{Arc, OnceLock};

/// Maximum tokens decoded per batch during prefill (llama.cpp limit).
const PREFILL_BATCH_SIZE: usize = 512;

// The llama backend may only be initialized once per process.
static LLAMA_BACKEND: OnceLock<Arc<LlamaBackend>> = OnceLock::new();

fn llama_backend() -> Arc<LlamaBackend> {
    LLAMA_BACKEND
        .get_or_init(|| Arc::new(LlamaBackend::init().expect("failed to init llama backend")))
        .clone()
}

/// Real engine backed by llama.cpp via `llama-cpp-2`.
pub struct Sage {
    backend: Arc<LlamaBackend>,
    model: Option<Arc<LlamaModel>>,
    model_path: Option<String>,
}

impl Sage {
    pub fn new() -> Self {
        Self {
            backend: llama_backend(),
            model: None,
            model_path: None,
        }
    }
}

#[async_trait]
impl Engine for Sage {
    async fn load_model(&mut self, model_path: &str, options: &SessionOptions) -> Result<()> {
        let params = LlamaModelParams::default()
            .with_n_gpu_layers(options.gpu_layers)
            .with_use_mlock(options.use_mlock);

        let model = LlamaModel::load_from_file(&self.backend, model_path, &params)
            .map_err(|e| anyhow!("failed to load model from {}: {}", model_path, e))?;

        self.model = Some(Arc::new(model));
        self.model_path = Some(model_path.to_string());
        Ok(())
    }

    async fn unload_model(&mut self) -> Result<()> {
        self.model = None;
        self.model_path = None;
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    fn loaded_model(&self) -> Option<&str> {
        self.model_path.as_deref()
    }

    async fn infer(
        &mut self,
        prompt: &str,
        options: &SessionOptions,
    ) -> Result<mpsc::Receiver<Result<InferenceEvent>>> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| anyhow!("no model loaded"))?
            .clone();
        let backend = self.backend.clone();

        let prompt_owned = prompt.to_string();
        let context_size = options.context_size.max(8);
        let max_tokens = options.max_tokens;
        let temperature = options.temperature;

        let (mut tx, rx) = mpsc::channel(64);

        // The decode loop is CPU-bound and blocking; give it its own thread
        // so the async executor stays responsive.
        std::thread::spawn(move || {
            let _ = futures::executor::block_on(tx.send(Ok(InferenceEvent::ProcessStart)));

            let n_ctx = NonZeroU32::new(context_size)
                .or(NonZeroU32::new(2048));
            let ctx_params = LlamaContextParams::default().with_n_ctx(n_ctx);

            let mut ctx = match model.new_context(&backend, ctx_params) {
                Ok(ctx) => ctx,
                Err(e) => {
                    let _ = futures::executor::block_on(
                        tx.send(Err(anyhow!("context creation failed: {}", e))),
                    );
                    return;
                }
            };

            let tokens = match model.str_to_token(&prompt_owned, AddBos::Always) {
                Ok(tokens) => tokens,
                Err(e) => {
                    let _ = futures::executor::block_on(
                        tx.send(Err(anyhow!("tokenize failed: {}", e))),
                    );
                    return;
                }
            };

            // Prefill in chunks so a long prompt never exceeds the batch.
            let mut batch = LlamaBatch::new(PREFILL_BATCH_SIZE, 1);
            let last_pos = (tokens.len() as i32).saturating_sub(1);
            let mut pos = 0i32;
            for chunk in tokens.chunks(PREFILL_BATCH_SIZE) {
                batch.clear();
                for (i, &token) in chunk.iter().enumerate() {
                    let p = pos + i as i32;
                    if let Err(e) = batch.add(token, p, &[0], p == last_pos) {
                        let _ = futures::executor::block_on(
                            tx.send(Err(anyhow!("batch add failed: {}", e))),
                        );
                        return;
                    }
                }
                if let Err(e) = ctx.decode(&mut batch) {
                    let _ = futures::executor::block_on(
                        tx.send(Err(anyhow!("prompt decode failed: {}", e))),
                    );
                    return;
                }
                pos += chunk.len() as i32;
            }

            let mut sampler = if temperature <= 0.0 {
                LlamaSampler::greedy()
            } else {
                LlamaSampler::chain_simple([
                    LlamaSampler::temp(temperature),
                    LlamaSampler::dist(1234),
                ])
            };

            let mut n_cur = tokens.len() as i32;
            for _ in 0..max_tokens {
                let token = sampler.sample(&ctx, batch.n_tokens() - 1);
                sampler.accept(token);

                if model.is_eog_token(token) {
                    break;
                }

                let piece = model
                    .token_to_str(token, Special::Tokenize)
                    .unwrap_or_default();
                if futures::executor::block_on(tx.send(Ok(InferenceEvent::Content(piece))))
                    .is_err()
                {
                    // Receiver gone, stop decoding.
                    return;
                }

                batch.clear();
                if batch.add(token, n_cur, &[0], true).is_err() {
                    break;
                }
                if let Err(e) = ctx.decode(&mut batch) {
                    let _ = futures::executor::block_on(
                        tx.send(Err(anyhow!("decode failed: {}", e))),
                    );
                    return;
                }
                n_cur += 1;
            }

            let _ = futures::executor::block_on(tx.send(Ok(InferenceEvent::Complete)));
        });

        Ok(rx)
    }
}
