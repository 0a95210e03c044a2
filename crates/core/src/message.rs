use std::time::SystemTime;

/// One entry in a chat transcript.
///
/// Transcripts are append-only and kept in creation order; whether the
/// renderer shows them newest-first or oldest-first is a presentation
/// choice, not a property of the data.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: u64,
    pub text: String,
    pub created_at: SystemTime,
    pub sender_is_user: bool,
}
