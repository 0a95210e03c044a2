//! Inference engine abstraction and session lifecycle.
//!
//! The [`Engine`](backend::Engine) trait hides the concrete backend: the
//! default build ships `Parrot`, a stub that echoes prompts, which keeps the
//! crate buildable and testable without llama.cpp. The `real-engine` feature
//! swaps in `Sage`, backed by `llama-cpp-2`.

pub mod backend;
mod session;

pub use backend::{create_engine, Engine};
pub use session::{render_prompt, SessionManager};
