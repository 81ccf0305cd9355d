//! API request and response models

use providers::{Article, ImageSize};
use serde::{Deserialize, Serialize};

use crate::db::GenerationRecord;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status
    pub status: String,

    /// Database connection status
    pub database: String,

    /// Server name
    pub name: String,

    /// API version
    pub version: String,

    /// Current timestamp
    pub timestamp: String,
}

impl HealthResponse {
    pub fn new(name: impl Into<String>, status: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            database: database.into(),
            name: name.into(),
            version: crate::version::VERSION.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Query string of `GET /api/meme-generator-stream`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateQuery {
    pub category: Option<String>,
    pub size: Option<String>,
}

/// Body of `POST /api/regenerate-image`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegenerateBody {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub size: Option<ImageSize>,
    #[serde(default)]
    pub article: Option<Article>,
}

/// One gallery entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub id: String,
    pub user_id: String,
    pub created_at: String,
    pub prompt: String,
    pub image_url: String,
    pub used_revised_prompt: bool,
    pub article_title: Option<String>,
    pub article_link: Option<String>,
    pub article_description: Option<String>,
    pub article_category: Vec<String>,
    pub article_pub_date: Option<String>,
}

impl From<GenerationRecord> for GenerationResponse {
    fn from(record: GenerationRecord) -> Self {
        let article_category = record.categories();
        Self {
            id: record.id,
            user_id: record.user_id,
            created_at: record.created_at,
            prompt: record.prompt,
            image_url: record.image_url,
            used_revised_prompt: record.used_revised_prompt,
            article_title: record.article_title,
            article_link: record.article_link,
            article_description: record.article_description,
            article_category,
            article_pub_date: record.article_pub_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response() {
        let health = HealthResponse::new("memegen", "ok", "connected");
        assert_eq!(health.status, "ok");
        assert_eq!(health.database, "connected");
        assert!(!health.version.is_empty());
        assert!(!health.timestamp.is_empty());
    }

    #[test]
    fn test_regenerate_body_accepts_size_names() {
        let body: RegenerateBody =
            serde_json::from_str(r#"{"prompt":"a cat","size":"landscape"}"#).unwrap();
        assert_eq!(body.size, Some(ImageSize::Landscape));

        let body: RegenerateBody = serde_json::from_str("{}").unwrap();
        assert!(body.prompt.is_empty());
        assert!(body.article.is_none());
    }

    #[test]
    fn test_generation_response_decodes_categories() {
        let record = GenerationRecord {
            id: "g".to_string(),
            user_id: "u".to_string(),
            created_at: "2024-06-01T00:00:00.000Z".to_string(),
            prompt: "p".to_string(),
            image_url: "https://cdn/x.png".to_string(),
            used_revised_prompt: false,
            article_title: None,
            article_link: None,
            article_description: None,
            article_category: r#"["food"]"#.to_string(),
            article_pub_date: None,
        };
        let response = GenerationResponse::from(record);
        assert_eq!(response.article_category, vec!["food"]);
    }
}
