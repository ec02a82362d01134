//! Events that can occur in a session

use crate::llm::LlmError;

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // User events
    DraftChanged {
        text: String,
    },
    Submit {
        text: String,
    },

    // Generation events
    GenerationSucceeded {
        text: String,
    },
    GenerationFailed {
        message: Option<String>,
        block_reason: Option<String>,
    },
}

impl Event {
    pub fn submit(text: impl Into<String>) -> Self {
        Event::Submit { text: text.into() }
    }

    pub fn draft_changed(text: impl Into<String>) -> Self {
        Event::DraftChanged { text: text.into() }
    }

    pub fn generation_failed(error: &LlmError) -> Self {
        Event::GenerationFailed {
            message: error.message.clone(),
            block_reason: error.block_reason.clone(),
        }
    }
}
