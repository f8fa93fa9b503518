//! Health check handlers

use super::types::HealthResponse;
use crate::AppState;
use axum::{extract::State, response::Json};
use tracing::warn;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    summary = "Health check",
    description = "Check the server and post store health",
    responses(
        (status = 200, description = "Server is up", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let storage_ok = match state.posts.health_check().await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Post store health check failed");
            false
        }
    };

    Json(HealthResponse {
        status: if storage_ok { "healthy" } else { "degraded" }.to_string(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        storage_ok,
    })
}
