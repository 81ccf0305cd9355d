//! Azure OpenAI image generation (DALL-E 3).
//!
//! The service answers HTTP 400 when its content filter rejects a prompt; that
//! status is surfaced as [`ProviderError::ContentPolicy`] so the pipeline can
//! decide whether to retry with a safer prompt.

use crate::config::RemoteServiceConfig;
use crate::error::{ProviderError, Result};
use crate::traits::ImageRenderer;
use crate::types::ImageSize;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_VERSION: &str = "2024-02-01";

/// Azure OpenAI images client.
#[derive(Clone)]
pub struct AzureImageClient {
    config: RemoteServiceConfig,
    client: Client,
}

impl AzureImageClient {
    /// Create a new client for a DALL-E deployment.
    pub fn new(config: RemoteServiceConfig) -> Result<Self> {
        let client = config.http_client()?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        let version = self
            .config
            .api_version
            .as_deref()
            .unwrap_or(DEFAULT_API_VERSION);
        format!("{}?api-version={}", self.config.trimmed_base_url(), version)
    }
}

#[async_trait]
impl ImageRenderer for AzureImageClient {
    async fn render(&self, prompt: &str, size: ImageSize) -> Result<Vec<String>> {
        let req_body = ImageRequest {
            model: "dall-e-3",
            prompt,
            n: 1,
            size: size.as_dimensions(),
            quality: "standard",
            style: "vivid",
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&req_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!(
                status = status.as_u16(),
                body = %error_text,
                "Image generation rejected"
            );

            return Err(match status.as_u16() {
                400 => ProviderError::ContentPolicy(
                    "the prompt may contain inappropriate or offensive content".to_string(),
                ),
                401 | 403 => ProviderError::AuthenticationError(error_text),
                _ => ProviderError::status("image model", status, error_text),
            });
        }

        let result: ImageResponse = response
            .json().await?;

        let urls: Vec<String> = result.data.into_iter().filter_map(|d| d.url).collect();
        if urls.is_empty() {
            return Err(ProviderError::InvalidResponse("No image was generated".to_string()));
        }

        Ok(urls)
    }
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'static str,
    prompt: &'a str,
    n: u32,
    size: &'static str,
    quality: &'static str,
    style: &'static str,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: Option<String>,
}
