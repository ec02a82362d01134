//! HTTP request handlers

use super::assets::{serve_index, serve_static};
use super::sse::sse_stream;
use super::types::{
    ChatResponse, ConfigResponse, ErrorResponse, SessionResponse, SuccessResponse, TextRequest,
};
use super::AppState;
use crate::config::MISSING_CREDENTIAL_NOTICE;
use crate::runtime::{SessionError, SseEvent};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Root serves the SPA
        .route("/", get(serve_index))
        // Static assets
        .route("/assets/*path", get(serve_static))
        .route("/api/config", get(get_config))
        // Session lifecycle
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session))
        .route("/api/sessions/:id/close", post(close_session))
        // SSE streaming
        .route("/api/sessions/:id/stream", get(stream_session))
        // User actions
        .route("/api/sessions/:id/draft", post(update_draft))
        .route("/api/sessions/:id/chat", post(send_chat))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

async fn get_config(State(state): State<AppState>) -> Json<ConfigResponse> {
    let configured = state.sessions.submission_enabled();
    Json(ConfigResponse {
        model: state.sessions.model_id().to_string(),
        configured,
        notice: (!configured).then(|| MISSING_CREDENTIAL_NOTICE.to_string()),
    })
}

// ============================================================
// Session Lifecycle
// ============================================================

async fn create_session(State(state): State<AppState>) -> Json<SessionResponse> {
    let handle = state.sessions.create().await;
    Json(SessionResponse {
        session: handle.view(),
    })
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, AppError> {
    let handle = state.sessions.get(&id).await?;
    Ok(Json(SessionResponse {
        session: handle.view(),
    }))
}

async fn close_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.sessions.close(&id).await?;
    Ok(Json(SuccessResponse { success: true }))
}

async fn stream_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let handle = state.sessions.get(&id).await?;
    tracing::debug!(session_id = %handle.id(), "Event stream opened");

    // Subscribe before rendering so no change falls between the two
    let broadcast_rx = handle.subscribe();
    let init_event = SseEvent::Init {
        session: handle.view(),
    };

    Ok(sse_stream(init_event, broadcast_rx))
}

// ============================================================
// User Actions
// ============================================================

async fn update_draft(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<TextRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    let handle = state.sessions.get(&id).await?;
    handle.set_draft(req.text).await?;
    Ok(Json(SuccessResponse { success: true }))
}

/// Queue a submission. Blank, busy and unconfigured submissions are
/// accepted here and ignored by the session.
async fn send_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<TextRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let handle = state.sessions.get(&id).await?;
    handle.submit(req.text).await?;
    Ok(Json(ChatResponse { queued: true }))
}

async fn get_version() -> &'static str {
    concat!("gemini_chat ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    NotFound(String),
    Internal(String),
}

impl From<SessionError> for AppError {
    fn from(error: SessionError) -> Self {
        match error {
            SessionError::NotFound(_) => AppError::NotFound(error.to_string()),
            SessionError::Closed => AppError::Internal(error.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
