//! Capability traits implemented by the adapters.
//!
//! The generation pipeline only sees these traits, so any collaborator can be
//! swapped for a stub in tests or for another vendor in production.

use crate::error::Result;
use crate::types::{Article, ImageSize, NewsCategory};
use async_trait::async_trait;

/// Source of current news articles.
#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Fetch the latest articles, optionally filtered by a safe category.
    async fn fetch_latest(
        &self,
        category: Option<NewsCategory>,
        language: &str,
    ) -> Result<Vec<Article>>;
}

/// Turns a headline into an image-generation instruction.
#[async_trait]
pub trait PromptSynthesizer: Send + Sync {
    /// Produce an image prompt. May return an empty string; the caller decides
    /// whether that is an error.
    async fn synthesize(&self, headline: &str, description: &str) -> Result<String>;
}

/// Renders an instruction into hosted image URLs.
#[async_trait]
pub trait ImageRenderer: Send + Sync {
    /// Render the prompt. Returns `ProviderError::ContentPolicy` when the
    /// service judged the prompt unsafe.
    async fn render(&self, prompt: &str, size: ImageSize) -> Result<Vec<String>>;
}

/// Durable object storage for archived images.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `path`.
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;

    /// Public URL under which `path` can be fetched.
    fn public_url(&self, path: &str) -> String;
}

/// Resolves an access token to a stable user id.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Returns `Ok(None)` when the token is not accepted.
    async fn user_id(&self, access_token: &str) -> Result<Option<String>>;
}
