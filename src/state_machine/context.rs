//! Session context (immutable configuration)

/// Context for a session, fixed for its whole lifetime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub session_id: String,
    pub model_id: String,
    /// False when no API credential is configured; submissions are then
    /// never accepted.
    pub submission_enabled: bool,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            model_id: model_id.into(),
            submission_enabled: true,
        }
    }

    /// Create a context for a session whose credential is missing
    pub fn unconfigured(session_id: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            submission_enabled: false,
            ..Self::new(session_id, model_id)
        }
    }
}
