//! Durable copies of rendered images
//!
//! Renderer URLs expire, so the pipeline downloads the first image and stores
//! it under the requesting identity before handing out a URL.

use crate::rate::{Clock, SystemClock};
use async_trait::async_trait;
use providers::{ObjectStore, ProviderError};
use std::sync::Arc;
use uuid::Uuid;

/// Where an archived image ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedImage {
    pub path: String,
    pub public_url: String,
}

/// Persists a rendered image and resolves its public URL
#[async_trait]
pub trait Archiver: Send + Sync {
    async fn archive(&self, identity: &str, source_url: &str) -> providers::Result<ArchivedImage>;
}

/// Downloads over HTTP and uploads to an [`ObjectStore`]
pub struct StorageArchiver {
    http: reqwest::Client,
    store: Arc<dyn ObjectStore>,
    clock: Arc<dyn Clock>,
}

impl StorageArchiver {
    pub fn new(http: reqwest::Client, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            http,
            store,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Object path for an image archived now
    ///
    /// `{identity}/{millis}-{suffix}.png`; the random suffix keeps two runs
    /// in the same millisecond from sharing a path.
    pub fn object_path(&self, identity: &str) -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!(
            "{}/{}-{}.png",
            sanitize_segment(identity),
            self.clock.now().timestamp_millis(),
            &suffix[..8]
        )
    }

    async fn download(&self, source_url: &str) -> providers::Result<Vec<u8>> {
        let response = self.http.get(source_url).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                service: "image download",
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl Archiver for StorageArchiver {
    async fn archive(&self, identity: &str, source_url: &str) -> providers::Result<ArchivedImage> {
        let bytes = self.download(source_url).await?;
        if bytes.is_empty() {
            return Err(ProviderError::InvalidResponse(
                "Downloaded image is empty".to_string(),
            ));
        }

        let path = self.object_path(identity);
        let size = bytes.len();
        self.store.upload(&path, bytes, "image/png").await?;
        tracing::info!(identity, path = %path, size, "Archived generated image");

        Ok(ArchivedImage {
            public_url: self.store.public_url(&path),
            path,
        })
    }
}

// Identities can be IP addresses or provider ids; keep them to one path segment.
fn sanitize_segment(identity: &str) -> String {
    let cleaned: String = identity
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    match cleaned.trim_matches('.') {
        "" => "anonymous".to_string(),
        trimmed => trimmed.to_string(),
    }
}
