// =============================================================================
// GET /status — read-only mirror of orchestrator_status.json
// (SPEC_FULL §A.6: ambient convenience, not a dashboard)
// =============================================================================

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};

use crate::state::{status, StateDir};

pub fn router(state_dir: Arc<StateDir>) -> Router {
    Router::new()
        .route("/status", get(get_status))
        .with_state(state_dir)
}

async fn get_status(State(state_dir): State<Arc<StateDir>>) -> impl IntoResponse {
    match status::load(&state_dir) {
        Some(snapshot) => Json(snapshot).into_response(),
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}
