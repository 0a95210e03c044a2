use serde::{Deserialize, Serialize};

/// Events emitted by an inference engine over the lifetime of one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InferenceEvent {
    ProcessStart,
    Content(String),
    Complete,
}

/// Progress of a model download.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DownloadEvent {
    /// Transfer is starting for the named file.
    Started(String),
    /// Fraction transferred so far, in [0, 1].
    Progress(f64),
    /// Final local path of the downloaded file.
    Complete(String),
    /// Error during the transfer.
    Error(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_round_trip_through_json() {
        let event = InferenceEvent::Content("tok".to_string());
        let json = serde_json::to_string(&event).unwrap();
        let back: InferenceEvent = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, InferenceEvent::Content(s) if s == "tok"));

        let event = DownloadEvent::Progress(0.42);
        let json = serde_json::to_string(&event).unwrap();
        let back: DownloadEvent = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, DownloadEvent::Progress(f) if (f - 0.42).abs() < 1e-9));
    }
}
