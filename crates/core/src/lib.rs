//! Core types shared across the pocketmind workspace: model descriptors,
//! chat messages, session options, protocol events and the error enum.

mod error;

pub mod message;
pub mod model;
pub mod options;
pub mod protocol;

pub use error::PocketError;
pub use message::ChatMessage;
pub use model::ModelDescriptor;
pub use options::{SessionOptions, SessionOverrides};
