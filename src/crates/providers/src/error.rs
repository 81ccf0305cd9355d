//! Error types for the remote service adapters.

use thiserror::Error;

/// Result type for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors returned by the news, text, image, storage and identity adapters.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP request failed before a response arrived. The request URL is
    /// stripped so query-string credentials never reach the message.
    #[error("HTTP request failed: {0}")]
    HttpError(reqwest::Error),

    /// The image service rejected the prompt as unsafe.
    #[error("Content filter triggered: {0}")]
    ContentPolicy(String),

    /// The service answered with a non-success status.
    #[error("{service} responded with status {status}: {body}")]
    Status {
        /// Which remote service answered
        service: &'static str,
        /// HTTP status code
        status: u16,
        /// Response body, possibly empty
        body: String,
    },

    /// API authentication failed.
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// The response did not have the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Required configuration is missing.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Local filesystem failure (local object store).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to serialize/deserialize data.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl ProviderError {
    /// Check if this error is the image service's content-policy signal.
    pub fn is_content_policy(&self) -> bool {
        matches!(self, ProviderError::ContentPolicy(_))
    }

    pub(crate) fn status(service: &'static str, status: reqwest::StatusCode, body: String) -> Self {
        ProviderError::Status {
            service,
            status: status.as_u16(),
            body,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        let err = err.without_url();
        if err.is_decode() {
            ProviderError::InvalidResponse(err.to_string())
        } else {
            ProviderError::HttpError(err)
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::SerializationError(err.to_string())
    }
}
