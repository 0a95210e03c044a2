use serde::{Deserialize, Serialize};

/// Static metadata identifying a downloadable model.
///
/// Descriptors are catalog data, created once at startup and never mutated.
/// `local_file_name` is the identity: it must be unique across a catalog and
/// it is the name the file carries in the local models directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Human-readable name shown in pickers.
    pub display_name: String,
    /// Approximate download size as shown to the user, e.g. "0.8 GB".
    pub human_size: String,
    /// Direct URL the GGUF file is fetched from.
    pub source_url: String,
    /// File name under the local models directory.
    pub local_file_name: String,
}
