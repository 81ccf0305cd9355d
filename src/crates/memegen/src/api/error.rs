//! JSON error responses
//!
//! Used by the JSON endpoints. The streaming endpoints report failures as a
//! terminal progress event instead.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::DatabaseError;

/// Body of every non-2xx JSON response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub error: String,
    pub message: String,
    /// Stable code for clients to branch on
    pub code: String,
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// No identity could be resolved and login is required
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Gallery unavailable: {0}")]
    Store(#[from] DatabaseError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        self.classify().0
    }

    pub fn code(&self) -> &'static str {
        self.classify().1
    }

    pub fn error_type(&self) -> &'static str {
        self.classify().2
    }

    fn classify(&self) -> (StatusCode, &'static str, &'static str) {
        match self {
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "Unauthorized"),
            ApiError::Store(err) if err.is_not_found() => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", "StoreError")
            }
            ApiError::Store(_) => (StatusCode::SERVICE_UNAVAILABLE, "STORE_UNAVAILABLE", "StoreError"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, error_type) = self.classify();
        if status.is_server_error() {
            tracing::error!(code, error = %self, "Request failed");
        } else {
            tracing::debug!(code, error = %self, "Request rejected");
        }

        let body = ApiErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
            code: code.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
