//! Google Gemini prompt synthesizer.
//!
//! Asks a Gemini model to turn a headline into a single image-generation
//! prompt suitable for a meme.
//!
//! # Example
//!
//! ```rust,ignore
//! use providers::remote::GeminiClient;
//! use providers::{PromptSynthesizer, RemoteServiceConfig};
//!
//! let config = RemoteServiceConfig::from_env("GEMINI_API_KEY", "GEMINI_API_URL")?;
//! let client = GeminiClient::new(config)?;
//! let prompt = client.synthesize("X raises funding", "Startup X closes a round").await?;
//! ```

use crate::config::RemoteServiceConfig;
use crate::error::{ProviderError, Result};
use crate::traits::PromptSynthesizer;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Google Gemini `generateContent` client.
#[derive(Clone)]
pub struct GeminiClient {
    config: RemoteServiceConfig,
    client: Client,
}

impl GeminiClient {
    /// Create a new Gemini client with the given configuration.
    pub fn new(config: RemoteServiceConfig) -> Result<Self> {
        let client = config.http_client()?;
        Ok(Self { config, client })
    }

    /// Build the instruction sent to the model.
    pub fn instruction(headline: &str, description: &str) -> String {
        format!(
            "Write a creative, funny, Gen-Z style meme prompt for an image generator \
based on this news. Stay well within image content filters.\n\n\
Headline: \"{headline}\"\n\
Description: \"{description}\"\n\n\
Guidelines:\n\
- Do not trigger content filters\n\
- Keep any text inside the image to a minimum; image models render text poorly\n\
- Do not write a caption, only the image prompt\n\
- Use a humorous, relatable tone for social media\n\
Return only the image generation prompt with no extra text or formatting.\n"
        )
    }

    fn endpoint(&self) -> &str {
        self.config.trimmed_base_url()
    }
}

/// Strip one pair of wrapping quotes and surrounding whitespace.
pub fn clean_generated_prompt(text: &str) -> String {
    let text = text.trim();
    let text = text.strip_prefix(['"', '\'']).unwrap_or(text);
    let text = text.strip_suffix(['"', '\'']).unwrap_or(text);
    text.trim().to_string()
}

#[async_trait]
impl PromptSynthesizer for GeminiClient {
    async fn synthesize(&self, headline: &str, description: &str) -> Result<String> {
        let req_body = GeminiRequest {
            contents: vec![GeminiMessage {
                parts: vec![GeminiPart {
                    text: Self::instruction(headline, description),
                }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&req_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Gemini request rejected");

            return Err(if status.as_u16() == 401 || status.as_u16() == 403 {
                ProviderError::AuthenticationError(error_text)
            } else {
                ProviderError::status("text model", status, error_text)
            });
        }

        let gemini_resp: GeminiResponse = response
            .json().await?;

        let text = gemini_resp
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.as_str())
            .unwrap_or_default();

        Ok(clean_generated_prompt(text))
    }
}

// Gemini API types
#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiMessage {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let config = RemoteServiceConfig::new(
            "test-key",
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent",
        );
        let client = GeminiClient::new(config).unwrap();
        assert!(client.endpoint().ends_with(":generateContent"));
        assert!(!client.endpoint().contains("test-key"));
    }

    #[test]
    fn test_instruction_embeds_article() {
        let text = GeminiClient::instruction("X raises funding", "Startup X closes a round");
        assert!(text.contains("Headline: \"X raises funding\""));
        assert!(text.contains("Description: \"Startup X closes a round\""));
    }

    #[test]
    fn test_clean_generated_prompt() {
        assert_eq!(clean_generated_prompt("  \"A robot dancing\"\n"), "A robot dancing");
        assert_eq!(clean_generated_prompt("'A cat in a suit'"), "A cat in a suit");
        assert_eq!(clean_generated_prompt("Plain prompt"), "Plain prompt");
        assert_eq!(clean_generated_prompt("   "), "");
    }

    #[test]
    fn test_response_without_candidates_parses() {
        let resp: GeminiResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.candidates.is_empty());
    }
}
