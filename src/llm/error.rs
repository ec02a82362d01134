//! LLM error types

use std::fmt;
use thiserror::Error;

/// LLM error with classification
///
/// Both the human-readable message and the content-policy block reason are
/// optional; a prompt rejected by the safety filter may carry only the
/// latter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {}", .message.as_deref().unwrap_or("no details"))]
pub struct LlmError {
    pub kind: LlmErrorKind,
    pub message: Option<String>,
    pub block_reason: Option<String>,
}

impl LlmError {
    pub fn new(kind: LlmErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: Some(message.into()),
            block_reason: None,
        }
    }

    pub fn with_block_reason(mut self, reason: impl Into<String>) -> Self {
        self.block_reason = Some(reason.into());
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Network, message)
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::RateLimit, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::ServerError, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Auth, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::InvalidRequest, message)
    }

    pub fn content_blocked(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::ContentBlocked, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Unknown, message)
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    /// Connection failures, unreadable responses
    Network,
    /// Rate limited or quota exhausted (429)
    RateLimit,
    /// Server error (5xx)
    ServerError,
    /// Authentication failed (401, 403)
    Auth,
    /// Bad request (400)
    InvalidRequest,
    /// Prompt or reply withheld by the safety policy
    ContentBlocked,
    /// Unknown error
    Unknown,
}

impl fmt::Display for LlmErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LlmErrorKind::Network => "network error",
            LlmErrorKind::RateLimit => "rate limited",
            LlmErrorKind::ServerError => "server error",
            LlmErrorKind::Auth => "authentication failed",
            LlmErrorKind::InvalidRequest => "invalid request",
            LlmErrorKind::ContentBlocked => "content blocked",
            LlmErrorKind::Unknown => "unknown error",
        };
        f.write_str(label)
    }
}
