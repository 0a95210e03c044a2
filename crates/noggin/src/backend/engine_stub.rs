#![cfg(not(feature = "real-engine"))]

use crate::backend::Engine;
use anyhow::{anyhow, Result};
use async_std::task;
use async_trait::async_trait;
use futures::channel::mpsc;
use futures::sink::SinkExt;
use pocketmind_core::protocol::InferenceEvent;
use pocketmind_core::SessionOptions;
use std::time::Duration;

/// Stub engine: pretends to load any path and echoes prompts back.
/// Keeps the default build free of llama.cpp while exercising the full
/// event protocol.
#[derive(Default)]
pub struct Parrot {
    loaded_path: Option<String>,
}

impl Parrot {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Engine for Parrot {
    async fn load_model(&mut self, model_path: &str, _options: &SessionOptions) -> Result<()> {
        // Simulate loading time
        task::sleep(Duration::from_millis(50)).await;
        self.loaded_path = Some(model_path.to_string());
        Ok(())
    }

    async fn unload_model(&mut self) -> Result<()> {
        self.loaded_path = None;
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.loaded_path.is_some()
    }

    fn loaded_model(&self) -> Option<&str> {
        self.loaded_path.as_deref()
    }

    async fn infer(
        &mut self,
        prompt: &str,
        _options: &SessionOptions,
    ) -> Result<mpsc::Receiver<Result<InferenceEvent>>> {
        if self.loaded_path.is_none() {
            return Err(anyhow!("parrot: no model loaded"));
        }

        let (mut tx, rx) = mpsc::channel(16);
        let prompt_owned = prompt.to_string();

        task::spawn(async move {
            let _ = tx.send(Ok(InferenceEvent::ProcessStart)).await;
            task::sleep(Duration::from_millis(10)).await;
            let _ = tx
                .send(Ok(InferenceEvent::Content(format!(
                    "Parrot says: {}",
                    prompt_owned
                ))))
                .await;
            let _ = tx.send(Ok(InferenceEvent::Complete)).await;
        });

        Ok(rx)
    }
}
