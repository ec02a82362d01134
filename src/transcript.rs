//! Transcript store
//!
//! Holds the ordered messages of one chat session together with its
//! transient status and the not-yet-submitted draft. Every mutation is a
//! value-to-value transition; messages are only ever appended.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Author of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Model,
}

/// One turn in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            text: text.into(),
            created_at: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::new(Role::Model, text)
    }
}

/// Session status
///
/// The error text lives inside `Errored`, so a session can never carry a
/// stale error while idle or sending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionStatus {
    /// Ready for input, nothing outstanding
    #[default]
    Idle,
    /// Exactly one generation request is in flight
    Sending,
    /// The last submission failed
    Errored { message: String },
}

/// Conversation state of one session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    transcript: Vec<Message>,
    status: SessionStatus,
    draft: String,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn is_sending(&self) -> bool {
        matches!(self.status, SessionStatus::Sending)
    }

    /// Error text of the last failed submission, present only while errored
    pub fn last_error(&self) -> Option<&str> {
        match &self.status {
            SessionStatus::Errored { message } => Some(message),
            _ => None,
        }
    }

    /// Append a user turn and mark the session as sending.
    ///
    /// Performs no validation; callers reject blank text beforehand.
    #[must_use]
    pub fn append_user(mut self, text: impl Into<String>) -> Self {
        self.transcript.push(Message::user(text));
        self.status = SessionStatus::Sending;
        self
    }

    /// Append a model turn and return to idle.
    #[must_use]
    pub fn append_model(mut self, text: impl Into<String>) -> Self {
        self.transcript.push(Message::model(text));
        self.status = SessionStatus::Idle;
        self
    }

    /// Record a failure. The transcript is left as is, so the user turn
    /// that triggered the failed call stays visible.
    #[must_use]
    pub fn set_error(mut self, message: impl Into<String>) -> Self {
        self.status = SessionStatus::Errored {
            message: message.into(),
        };
        self
    }

    #[must_use]
    pub fn set_draft(mut self, text: impl Into<String>) -> Self {
        self.draft = text.into();
        self
    }

    #[must_use]
    pub fn clear_draft(mut self) -> Self {
        self.draft.clear();
        self
    }
}
