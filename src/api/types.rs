//! API request and response types

use crate::view::SessionView;
use serde::{Deserialize, Serialize};

/// Request body carrying user text (draft updates and submissions)
#[derive(Debug, Deserialize)]
pub struct TextRequest {
    pub text: String,
}

/// Response with a session view
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session: SessionView,
}

/// Response for chat action
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub queued: bool,
}

/// Response for lifecycle actions
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Static client configuration
#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub model: String,
    pub configured: bool,
    pub notice: Option<String>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
