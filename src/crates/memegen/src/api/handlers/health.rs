//! Health check endpoint handlers

use axum::{extract::State, http::StatusCode, Json};

use crate::api::{models::HealthResponse, response, routes::AppState};

/// Handler for GET /health
///
/// Liveness only; does not touch the database.
pub async fn health(State(app_state): State<AppState>) -> impl axum::response::IntoResponse {
    response::ok(HealthResponse::new(&*app_state.name, "ok", "unknown"))
}

/// Handler for GET /api/v1/system/health
pub async fn health_detailed(
    State(app_state): State<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    match app_state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse::new(&*app_state.name, "ok", "connected")),
        ),
        Err(err) => {
            tracing::warn!(error = %err, "Database health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse::new(&*app_state.name, "error", "error")),
            )
        }
    }
}
