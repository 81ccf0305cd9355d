//! Generation failure taxonomy

use super::stage::Stage;
use crate::rate::RateInfo;
use std::time::Duration;
use thiserror::Error;

/// Why a generation run ended without a meme
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("Rate limit exceeded. You can only generate {} memes per day.", .0.limit)]
    AdmissionDenied(RateInfo),

    #[error("You must be logged in to generate a meme.")]
    Unauthenticated,

    #[error("{0}")]
    InvalidRequest(String),

    #[error("No news articles found")]
    NoContentFound,

    #[error("Failed to fetch news: {0}")]
    NewsUnavailable(String),

    #[error("Failed to generate meme concept: {0}")]
    PromptSynthesisFailed(String),

    #[error("The image was rejected by the content filter, even after revising the prompt: {0}")]
    ContentPolicyViolation(String),

    #[error("Failed to generate images: {0}")]
    RenderFailed(String),

    #[error("Your meme was created but could not be saved: {0}")]
    ArchiveFailed(String),

    #[error("Failed to record usage: {0}")]
    UsageRecordingFailed(String),

    #[error("{stage} timed out after {}s", .after.as_secs())]
    TimedOut { stage: Stage, after: Duration },

    #[error("Client disconnected")]
    Cancelled,

    #[error("An unknown error occurred: {0}")]
    Unknown(String),
}

impl GenerationError {
    /// Stable wire code for the failure
    pub fn code(&self) -> &'static str {
        match self {
            GenerationError::AdmissionDenied(_) => "ADMISSION_DENIED",
            GenerationError::Unauthenticated => "UNAUTHENTICATED",
            GenerationError::InvalidRequest(_) => "INVALID_REQUEST",
            GenerationError::NoContentFound => "NO_CONTENT_FOUND",
            GenerationError::NewsUnavailable(_) => "NEWS_UNAVAILABLE",
            GenerationError::PromptSynthesisFailed(_) => "PROMPT_SYNTHESIS_FAILED",
            GenerationError::ContentPolicyViolation(_) => "CONTENT_POLICY_VIOLATION",
            GenerationError::RenderFailed(_) => "RENDER_FAILED",
            GenerationError::ArchiveFailed(_) => "ARCHIVE_FAILED",
            GenerationError::UsageRecordingFailed(_) => "USAGE_RECORDING_FAILED",
            GenerationError::TimedOut { .. } => "TIMED_OUT",
            GenerationError::Cancelled => "CANCELLED",
            GenerationError::Unknown(_) => "UNKNOWN",
        }
    }

    /// Rate info to attach to the terminal event, if any
    pub fn rate_limit(&self) -> Option<&RateInfo> {
        match self {
            GenerationError::AdmissionDenied(info) => Some(info),
            _ => None,
        }
    }

    /// Failures caused by the caller rather than a collaborator
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            GenerationError::AdmissionDenied(_)
                | GenerationError::Unauthenticated
                | GenerationError::InvalidRequest(_)
        )
    }
}
