//! # Packrat: The Quartermaster
//!
//! **Model catalog, local store and downloads for pocketmind.**
//!
//! Packrat owns everything about getting model files onto disk: the built-in
//! catalog of downloadable GGUF models, the flat local models directory, and
//! streamed downloads with progress reporting. It is usable as a standalone
//! crate; nothing in it knows about inference or chat.
//!
//! ## Core pieces
//!
//! - **[`ModelCatalog`]**: read-only catalog parsed from an embedded
//!   `catalog.toml`; entries are identified by their local file name.
//! - **[`ModelStore`]**: resolves the platform models directory, answers
//!   existence/listing queries, and performs streamed downloads that
//!   short-circuit when the file is already present.
//! - **[`DownloadController`]**: enforces the single-flight download policy,
//!   tracks per-file progress and defers completion until the caller
//!   explicitly acknowledges it.
//!
//! ## One-shot download
//!
//! ```no_run
//! use packrat::{ModelCatalog, ModelStore};
//!
//! #[async_std::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let catalog = ModelCatalog::builtin()?;
//!     let store = ModelStore::open()?;
//!
//!     let descriptor = catalog
//!         .resolve("llama-3.2-1b-instruct-q4_k_m.gguf")
//!         .expect("not in catalog");
//!
//!     // Returns immediately if the file is already in the store.
//!     let path = store.download(descriptor, |fraction| {
//!         print!("\r{:.0}%", fraction * 100.0);
//!     }).await?;
//!
//!     println!("\nmodel available at {:?}", path);
//!     Ok(())
//! }
//! ```

/// The built-in model catalog.
pub mod catalog;

/// Single-flight download coordination for a UI.
pub mod controller;

/// The local models directory and streamed downloads.
pub mod store;

pub use catalog::ModelCatalog;
pub use controller::{DownloadController, DownloadState};
pub use store::ModelStore;
