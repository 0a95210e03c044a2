mod engine_real;
mod engine_stub;

use anyhow::Result;
use async_trait::async_trait;
use futures::channel::mpsc;
use pocketmind_core::protocol::InferenceEvent;
use pocketmind_core::SessionOptions;

#[cfg(feature = "real-engine")]
pub use engine_real::Sage;

#[cfg(not(feature = "real-engine"))]
pub use engine_stub::Parrot;

/// One inference backend. Holds at most one loaded model at a time; the
/// handle is owned exclusively by whoever owns the engine.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Bind the engine to a local model file.
    async fn load_model(&mut self, model_path: &str, options: &SessionOptions) -> Result<()>;

    /// Drop the current model handle, freeing engine resources.
    async fn unload_model(&mut self) -> Result<()>;

    fn is_loaded(&self) -> bool;

    /// Path of the currently bound model, if any.
    fn loaded_model(&self) -> Option<&str>;

    /// Run one completion request. Events arrive on the returned channel,
    /// ending with [`InferenceEvent::Complete`]. Concurrent requests on one
    /// engine are not supported; callers serialize.
    async fn infer(
        &mut self,
        prompt: &str,
        options: &SessionOptions,
    ) -> Result<mpsc::Receiver<Result<InferenceEvent>>>;
}

/// Backend selected by feature: `Sage` (llama.cpp) with `real-engine`,
/// the `Parrot` stub otherwise.
pub async fn create_engine() -> Box<dyn Engine> {
    #[cfg(feature = "real-engine")]
    {
        Box::new(Sage::new())
    }

    #[cfg(not(feature = "real-engine"))]
    {
        Box::new(Parrot::new())
    }
}
