//! The docintel web UI: upload a PDF, page through its text, and run
//! signing-rule extraction against a hosted LLM.
//!
//! A deliberately small axum app. State is one document session (the tool is
//! single-operator); the LLM API key never touches disk — it arrives with
//! each extraction request and lives only for that call.

pub mod error;
pub mod handlers;
pub mod state;
pub mod ui;

use crate::error::DocIntelError;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use state::AppState;

/// Uploads above this size are rejected before they hit pdfium.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Build the application router.
///
/// Exposed separately from [`serve`] so tests can drive handlers without
/// binding a socket.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/api/upload", post(handlers::upload))
        .route("/api/document", get(handlers::document_info))
        .route("/api/page", get(handlers::current_page))
        .route("/api/page/next", post(handlers::next_page))
        .route("/api/page/prev", post(handlers::prev_page))
        .route("/api/extract", post(handlers::extract))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve the web UI on the given address until the process is stopped.
pub async fn serve(addr: SocketAddr) -> Result<(), DocIntelError> {
    let state = Arc::new(AppState::new());
    let app = router(state);

    info!("docintel UI listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| DocIntelError::Internal(format!("Failed to bind {addr}: {e}")))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| DocIntelError::Internal(format!("Server error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn router_builds() {
        let _ = router(Arc::new(AppState::new()));
    }
}
