//! Pure state transition function

use super::{Effect, Event, SessionContext};
use crate::transcript::{Session, SessionStatus};
use thiserror::Error;

/// Leading sentence of every user-visible failure message
pub const ERROR_PREFIX: &str = "Failed to get a response from the chatbot.";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_session: Session,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(session: Session) -> Self {
        Self {
            new_session: session,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Reasons an event is not applied. The session is unchanged in every case.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Message is empty")]
    EmptyMessage,
    #[error("A response is still pending, wait for it before sending again")]
    SessionBusy,
    #[error("Submission is disabled because no API key is configured")]
    SubmissionDisabled,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs and performs
/// no I/O; the runtime executes the returned effects.
pub fn transition(
    session: &Session,
    context: &SessionContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (session.status(), event) {
        (_, Event::DraftChanged { text }) => {
            Ok(TransitionResult::new(session.clone().set_draft(text))
                .with_effect(Effect::PublishSession))
        }

        (_, Event::Submit { .. }) if !context.submission_enabled => {
            Err(TransitionError::SubmissionDisabled)
        }

        (_, Event::Submit { text }) if text.trim().is_empty() => {
            Err(TransitionError::EmptyMessage)
        }

        (SessionStatus::Sending, Event::Submit { .. }) => Err(TransitionError::SessionBusy),

        // Idle | Errored + Submit -> Sending. A previous error never blocks
        // a new attempt.
        (SessionStatus::Idle | SessionStatus::Errored { .. }, Event::Submit { text }) => {
            let prompt = text.trim().to_string();
            let history = session.transcript().to_vec();
            let new_session = session.clone().append_user(prompt.as_str()).clear_draft();
            let mut result = TransitionResult::new(new_session);
            if let Some(message) = result.new_session.transcript().last().cloned() {
                result = result.with_effect(Effect::notify_message(message));
            }
            Ok(result
                .with_effect(Effect::PublishSession)
                .with_effect(Effect::request_generation(history, prompt)))
        }

        (SessionStatus::Sending, Event::GenerationSucceeded { text }) => {
            if text.trim().is_empty() {
                let message =
                    diagnostic_message(Some("The model returned an empty response."), None);
                return Ok(TransitionResult::new(session.clone().set_error(message))
                    .with_effect(Effect::PublishSession)
                    .with_effect(Effect::NotifyDone));
            }

            let new_session = session.clone().append_model(text);
            let mut result = TransitionResult::new(new_session);
            if let Some(message) = result.new_session.transcript().last().cloned() {
                result = result.with_effect(Effect::notify_message(message));
            }
            Ok(result
                .with_effect(Effect::PublishSession)
                .with_effect(Effect::NotifyDone))
        }

        (
            SessionStatus::Sending,
            Event::GenerationFailed {
                message,
                block_reason,
            },
        ) => {
            let message = diagnostic_message(message.as_deref(), block_reason.as_deref());
            Ok(TransitionResult::new(session.clone().set_error(message))
                .with_effect(Effect::PublishSession)
                .with_effect(Effect::NotifyDone))
        }

        (
            status @ (SessionStatus::Idle | SessionStatus::Errored { .. }),
            event @ (Event::GenerationSucceeded { .. } | Event::GenerationFailed { .. }),
        ) => Err(TransitionError::InvalidTransition(format!(
            "No transition from {status:?} with event {event:?}"
        ))),
    }
}

/// Build the user-visible failure text: the fixed prefix, then the
/// underlying message and the content-policy block reason when present.
pub fn diagnostic_message(message: Option<&str>, block_reason: Option<&str>) -> String {
    let mut text = ERROR_PREFIX.to_string();
    if let Some(message) = message.filter(|m| !m.is_empty()) {
        text.push_str(" Details: ");
        text.push_str(message);
    }
    if let Some(reason) = block_reason.filter(|r| !r.is_empty()) {
        text.push_str(" Blocked due to: ");
        text.push_str(reason);
    }
    text
}
