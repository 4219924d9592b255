//! Health check endpoint

use axum::{extract::State, Json};
use serde::Serialize;

use crate::server::state::SharedState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
}

/// GET /health
pub async fn health_check(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        model: state.context.model_id().to_string(),
    })
}
