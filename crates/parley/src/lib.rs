//! Chat orchestration: a transcript plus the session that answers it.
//!
//! [`ChatController`] owns a [`SessionManager`] and an append-only message
//! list. Sending a prompt appends the user's message immediately, runs
//! inference, and appends the reply; a failed generation appends a fallback
//! reply instead so the transcript never loses the user's turn.

use pocketmind_core::{ChatMessage, PocketError, SessionOptions};
use pocketmind_noggin::SessionManager;
use std::time::SystemTime;

/// First assistant message after a model is bound.
pub const WELCOME_MESSAGE: &str = "Hello! How can I help you today?";

/// Shown in place of a reply when generation fails.
pub const FALLBACK_REPLY: &str = "Sorry, something went wrong. Please try again.";

/// Drives one conversation against one bound model.
pub struct ChatController {
    session: SessionManager,
    messages: Vec<ChatMessage>,
    processing: bool,
    init_error: Option<String>,
    next_id: u64,
}

impl ChatController {
    pub fn new(session: SessionManager) -> Self {
        Self {
            session,
            messages: Vec::new(),
            processing: false,
            init_error: None,
            next_id: 0,
        }
    }

    /// Bind the conversation to a model file with default session options.
    pub async fn bind(&mut self, model_path: &str) -> Result<(), PocketError> {
        self.bind_with(SessionOptions::for_model(model_path)).await
    }

    /// Bind the conversation to a model with explicit session options.
    ///
    /// On success a welcome message opens the transcript. On failure the
    /// error text is retained in [`init_error`](Self::init_error) and no
    /// message is appended.
    pub async fn bind_with(&mut self, options: SessionOptions) -> Result<(), PocketError> {
        self.init_error = None;
        match self.session.initialize(options).await {
            Ok(()) => {
                self.append(WELCOME_MESSAGE.to_string(), false);
                Ok(())
            }
            Err(e) => {
                log::warn!("failed to bind model: {}", e);
                self.init_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Release the bound model. The transcript is kept.
    pub async fn unbind(&mut self) {
        self.session.release().await;
    }

    /// Send one user prompt and wait for the assistant's reply.
    ///
    /// The user's message lands in the transcript before inference starts,
    /// and exactly one assistant message follows it, real or fallback. The
    /// processing flag is cleared on every exit path.
    pub async fn send(&mut self, text: &str) -> Result<(), PocketError> {
        if !self.session.is_ready() {
            return Err(PocketError::NotInitialized);
        }

        self.append(text.to_string(), true);
        self.processing = true;

        let reply = match self.session.generate(text, None).await {
            Ok(reply) => reply,
            Err(e) => {
                log::warn!("generation failed: {}", e);
                FALLBACK_REPLY.to_string()
            }
        };

        self.append(reply, false);
        self.processing = false;
        Ok(())
    }

    /// Transcript in creation order.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// True while a reply is being generated.
    pub fn is_processing(&self) -> bool {
        self.processing
    }

    /// Error text from the most recent failed bind, if any.
    pub fn init_error(&self) -> Option<&str> {
        self.init_error.as_deref()
    }

    /// True once a model is bound and ready to answer.
    pub fn is_ready(&self) -> bool {
        self.session.is_ready()
    }

    /// Path of the bound model, if any.
    pub fn bound_model(&self) -> Option<&str> {
        self.session.bound_model()
    }

    fn append(&mut self, text: String, sender_is_user: bool) {
        let id = self.next_id;
        self.next_id += 1;
        self.messages.push(ChatMessage {
            id,
            text,
            created_at: SystemTime::now(),
            sender_is_user,
        });
    }
}
