//! HTTP API
//!
//! - `GET /api/meme-generator-stream` and `POST /api/regenerate-image` stream
//!   a run's progress as Server-Sent Events
//! - `GET /api/v1/rate-limit` and `GET /api/v1/generations` serve the caller's
//!   quota and gallery
//! - `GET /health` and `GET /api/v1/system/health` report liveness

pub mod error;
pub mod handlers;
pub mod identity;
pub mod middleware;
pub mod models;
pub mod response;
pub mod routes;

pub use error::{ApiError, ApiErrorResponse, ApiResult};
pub use identity::{IdentityResolver, RequestIdentity};
pub use response::SuccessResponse;
pub use routes::{create_router, AppState, RouterOptions};
