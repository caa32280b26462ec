pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::state::ImportState;

/// Multipart framing on top of the largest accepted file.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn router(state: Arc<ImportState>) -> Router {
    let body_limit = state.builder.max_file_bytes().saturating_add(FORM_OVERHEAD_BYTES);
    Router::new()
        .route("/api/import", post(routes::import_csv))
        .route("/api/import/status", get(routes::import_status))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
