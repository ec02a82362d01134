//! Effects produced by state transitions

use crate::transcript::Message;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Call the generation service once
    RequestGeneration {
        /// Every message before the submission, in order
        history: Vec<Message>,
        /// The new (trimmed) user text
        prompt: String,
    },

    /// Publish the new session snapshot to readers
    PublishSession,

    /// A message was appended to the transcript
    NotifyMessage { message: Message },

    /// The submission cycle finished, successfully or not
    NotifyDone,
}

impl Effect {
    pub fn request_generation(history: Vec<Message>, prompt: impl Into<String>) -> Self {
        Effect::RequestGeneration {
            history,
            prompt: prompt.into(),
        }
    }

    pub fn notify_message(message: Message) -> Self {
        Effect::NotifyMessage { message }
    }
}
