//! Requests and results of a generation run

use crate::rate::RateInfo;
use providers::{Article, ImageSize, NewsCategory};
use serde::{Deserialize, Serialize};

/// Identity used when nothing better can be resolved
pub const ANONYMOUS_IDENTITY: &str = "anonymous";

/// A request to turn the latest headline into a meme
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub identity: String,
    pub category: Option<NewsCategory>,
    pub size: ImageSize,
}

impl GenerationRequest {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            category: None,
            size: ImageSize::default(),
        }
    }

    pub fn with_category(mut self, category: Option<NewsCategory>) -> Self {
        self.category = category;
        self
    }

    pub fn with_size(mut self, size: ImageSize) -> Self {
        self.size = size;
        self
    }
}

/// A request to re-render an existing prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegenerationRequest {
    pub identity: String,
    pub prompt: String,
    pub size: ImageSize,
    pub article: Option<Article>,
}

impl RegenerationRequest {
    pub fn new(identity: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            prompt: prompt.into(),
            size: ImageSize::default(),
            article: None,
        }
    }

    pub fn with_size(mut self, size: ImageSize) -> Self {
        self.size = size;
        self
    }

    pub fn with_article(mut self, article: Option<Article>) -> Self {
        self.article = article;
        self
    }
}

/// Payload of a successful run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_article: Option<Article>,
    pub prompt: String,
    pub image_urls: Vec<String>,
    pub used_revised_prompt: bool,
    pub rate_limit: RateInfo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request = GenerationRequest::new("u1");
        assert_eq!(request.size, ImageSize::Square);
        assert!(request.category.is_none());
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let result = GenerationResult {
            original_article: None,
            prompt: "p".to_string(),
            image_urls: vec!["https://cdn/1.png".to_string()],
            used_revised_prompt: true,
            rate_limit: RateInfo::from_usage(1, 6),
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["usedRevisedPrompt"], true);
        assert_eq!(json["imageUrls"][0], "https://cdn/1.png");
        assert_eq!(json["rateLimit"]["remaining"], 5);
        assert!(json.get("originalArticle").is_none());
    }
}
