//! Rate limit and gallery endpoint handlers

use axum::{extract::State, response::IntoResponse};

use crate::api::{
    error::{ApiError, ApiResult},
    identity::RequestIdentity,
    models::GenerationResponse,
    response::{self, ListResponse},
    routes::AppState,
};

/// Most gallery entries returned at once
const GALLERY_LIMIT: u32 = 100;

/// Handler for GET /api/v1/rate-limit
pub async fn rate_limit(
    State(app_state): State<AppState>,
    RequestIdentity(identity): RequestIdentity,
) -> ApiResult<impl IntoResponse> {
    let identity = identity.ok_or_else(login_required)?;
    let info = app_state.pipeline.tracker().admit(&identity).await;
    Ok(response::ok(info))
}

/// Handler for GET /api/v1/generations
///
/// The caller's generations, newest first.
pub async fn list_generations(
    State(app_state): State<AppState>,
    RequestIdentity(identity): RequestIdentity,
) -> ApiResult<impl IntoResponse> {
    let identity = identity.ok_or_else(login_required)?;
    let records = app_state.store.list_for_user(&identity, GALLERY_LIMIT).await?;
    let items: Vec<GenerationResponse> = records.into_iter().map(Into::into).collect();
    Ok(response::ok(ListResponse::new(items)))
}

fn login_required() -> ApiError {
    ApiError::Unauthorized("You must be logged in.".to_string())
}
