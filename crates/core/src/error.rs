use thiserror::Error;

/// Errors surfaced by the pocketmind crates.
///
/// None of these are fatal to the process: every failure leaves the
/// component that raised it in a well-defined, retryable state.
#[derive(Error, Debug)]
pub enum PocketError {
    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("download failed: {0}")]
    DownloadFailed(String),

    #[error("another download is already in flight")]
    DownloadInFlight,

    #[error("model path must not be empty")]
    EmptyModelPath,

    #[error("engine initialization failed: {0}")]
    EngineInit(String),

    #[error("session is not initialized")]
    NotInitialized,

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
