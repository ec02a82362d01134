//! Read-only projection of a session for the rendering layer

use crate::config::MISSING_CREDENTIAL_NOTICE;
use crate::state_machine::SessionContext;
use crate::transcript::{Message, Session, SessionStatus};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewStatus {
    Idle,
    Sending,
    Errored,
}

/// Everything the page needs to draw one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionView {
    pub session_id: String,
    pub model: String,
    pub messages: Vec<Message>,
    pub status: ViewStatus,
    pub error: Option<String>,
    pub draft: String,
    /// Text input accepts typing
    pub input_enabled: bool,
    /// Send button is active
    pub submit_enabled: bool,
    /// Persistent configuration notice
    pub notice: Option<String>,
}

pub fn render(session: &Session, context: &SessionContext) -> SessionView {
    let status = match session.status() {
        SessionStatus::Idle => ViewStatus::Idle,
        SessionStatus::Sending => ViewStatus::Sending,
        SessionStatus::Errored { .. } => ViewStatus::Errored,
    };
    let input_enabled = context.submission_enabled && !session.is_sending();

    SessionView {
        session_id: context.session_id.clone(),
        model: context.model_id.clone(),
        messages: session.transcript().to_vec(),
        status,
        error: session.last_error().map(String::from),
        draft: session.draft().to_string(),
        input_enabled,
        submit_enabled: input_enabled && !session.draft().trim().is_empty(),
        notice: (!context.submission_enabled).then(|| MISSING_CREDENTIAL_NOTICE.to_string()),
    }
}
