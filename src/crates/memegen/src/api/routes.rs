//! API route definitions

use axum::{
    routing::{get, post},
    Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::ServeDir;

use crate::api::{handlers, identity::IdentityResolver, middleware};
use crate::db::GenerationStore;
use crate::execution::GenerationPipeline;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub name: Arc<str>,
    pub pipeline: Arc<GenerationPipeline>,
    pub store: Arc<dyn GenerationStore>,
    pub identity: Arc<IdentityResolver>,
}

/// Router options that do not live in [`AppState`]
#[derive(Debug, Clone, Default)]
pub struct RouterOptions {
    /// Directory served under `/media` (local image storage)
    pub media_dir: Option<PathBuf>,
    /// Allowed CORS origins; empty allows any
    pub cors_origins: Vec<String>,
}

/// Build the complete API router
pub fn create_router(app_state: AppState, options: RouterOptions) -> Router {
    let mut router = Router::new()
        // Health check endpoints
        .route("/health", get(handlers::health))
        .route("/api/v1/system/health", get(handlers::health_detailed))
        // Generation streams
        .route("/api/meme-generator-stream", get(handlers::generate_stream))
        .route("/api/regenerate-image", post(handlers::regenerate_stream))
        // Caller data
        .route("/api/v1/rate-limit", get(handlers::rate_limit))
        .route("/api/v1/generations", get(handlers::list_generations));

    if let Some(media_dir) = options.media_dir {
        router = router.nest_service("/media", ServeDir::new(media_dir));
    }

    router
        .layer(middleware::cors_layer(&options.cors_origins))
        .layer(middleware::logging_layer())
        .with_state(app_state)
}
