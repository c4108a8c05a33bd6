pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::analysis::handlers;
use crate::catalog;
use crate::state::AppState;

/// Headroom above the configured document cap so multipart framing does not
/// trip the transport-level limit before the extractor's own size guard.
const BODY_LIMIT_HEADROOM: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes + BODY_LIMIT_HEADROOM;

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/models", get(catalog::handle_list_models))
        .route("/analyze", post(handlers::handle_analyze))
        .route("/analyze/file", post(handlers::handle_analyze_file))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
