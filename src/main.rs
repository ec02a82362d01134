//! Gemini Chat - a minimal single-page chat client
//!
//! A Rust backend implementing a conversation session state machine for
//! chatting with a Gemini model.

mod api;
mod config;
mod llm;
mod runtime;
mod state_machine;
mod system_prompt;
mod transcript;
mod view;

use api::{create_router, AppState};
use config::ChatConfig;
use llm::{GeminiService, LlmService, LoggingService};
use runtime::SessionManager;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gemini_chat=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = ChatConfig::from_env();
    tracing::info!(
        configured = config.is_configured(),
        model = %config.model,
        "Loaded configuration"
    );
    tracing::debug!(?config, "Configuration details");

    // Generation service, only when a credential is present
    let llm: Option<Arc<dyn LlmService>> = match &config.api_key {
        Some(api_key) => {
            let gemini = GeminiService::new(api_key.clone(), &config.model, &config.api_base)?;
            tracing::info!(
                model = %config.model,
                api_base = %config.api_base,
                "Gemini service initialized"
            );
            Some(Arc::new(LoggingService::new(Arc::new(gemini))))
        }
        None => {
            tracing::warn!("No API key configured. Set GEMINI_API_KEY; chat input is disabled.");
            None
        }
    };

    // Create application state
    let state = AppState::new(SessionManager::new(llm, config.model.clone()));
    let sessions = state.sessions.clone();

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(cors)
        .layer(compression)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = config.listen_addr();
    tracing::info!("Gemini Chat server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(sessions))
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolve on Ctrl-C, then drop every session so open event streams end
async fn shutdown_signal(sessions: Arc<SessionManager>) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
    }
    sessions.close_all().await;
}
