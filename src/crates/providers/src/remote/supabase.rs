//! Supabase storage and auth adapters.
//!
//! Storage uploads go to `/storage/v1/object/{bucket}/{path}` and are served
//! from the bucket's public URL. Auth resolves an access token through
//! `/auth/v1/user`.

use crate::config::RemoteServiceConfig;
use crate::error::{ProviderError, Result};
use crate::traits::{IdentityProvider, ObjectStore};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

/// Bucket used when none is configured.
pub const DEFAULT_BUCKET: &str = "meme_images";

/// Supabase Storage bucket client.
#[derive(Clone)]
pub struct SupabaseStorage {
    config: RemoteServiceConfig,
    bucket: String,
    client: Client,
}

impl SupabaseStorage {
    /// Create a storage client for `bucket`.
    pub fn new(config: RemoteServiceConfig, bucket: impl Into<String>) -> Result<Self> {
        let client = config.http_client()?;
        Ok(Self {
            config,
            bucket: bucket.into(),
            client,
        })
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.config.trimmed_base_url(),
            self.bucket,
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl ObjectStore for SupabaseStorage {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        let response = self
            .client
            .post(self.object_url(path))
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::status("object storage", status, error_text));
        }

        tracing::debug!(bucket = %self.bucket, path, "Uploaded object");
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.config.trimmed_base_url(),
            self.bucket,
            path.trim_start_matches('/')
        )
    }
}

/// Supabase Auth token resolver.
#[derive(Clone)]
pub struct SupabaseAuth {
    config: RemoteServiceConfig,
    client: Client,
}

impl SupabaseAuth {
    /// Create an auth client.
    pub fn new(config: RemoteServiceConfig) -> Result<Self> {
        let client = config.http_client()?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl IdentityProvider for SupabaseAuth {
    async fn user_id(&self, access_token: &str) -> Result<Option<String>> {
        let response = self
            .client
            .get(format!("{}/auth/v1/user", self.config.trimmed_base_url()))
            .header("apikey", &self.config.api_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            status if !status.is_success() => {
                let error_text = response.text().await.unwrap_or_default();
                Err(ProviderError::status("identity provider", status, error_text))
            }
            _ => {
                let user: AuthUser = response
                    .json().await?;
                Ok(Some(user.id).filter(|id| !id.is_empty()))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    #[serde(default)]
    id: String,
}
