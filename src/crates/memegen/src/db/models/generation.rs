//! Generation model for database persistence

use chrono::{DateTime, SecondsFormat, Utc};
use providers::Article;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Format a timestamp the way the `generations` table stores it.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A completed generation as stored in the gallery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct GenerationRecord {
    /// Unique record identifier (UUID string)
    pub id: String,

    /// Identity the generation is attributed to
    pub user_id: String,

    /// Creation timestamp (RFC 3339 string)
    pub created_at: String,

    /// Prompt the image was rendered from
    pub prompt: String,

    /// Durable public URL of the archived image
    pub image_url: String,

    /// Whether the safety-revised prompt produced the image
    pub used_revised_prompt: bool,

    pub article_title: Option<String>,
    pub article_link: Option<String>,
    pub article_description: Option<String>,

    /// Article categories as a JSON array string
    pub article_category: String,

    pub article_pub_date: Option<String>,
}

impl GenerationRecord {
    /// Categories decoded from the stored JSON array.
    pub fn categories(&self) -> Vec<String> {
        serde_json::from_str(&self.article_category).unwrap_or_default()
    }

}

/// Insert payload for a generation record
#[derive(Debug, Clone)]
pub struct NewGeneration {
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub prompt: String,
    pub image_url: String,
    pub used_revised_prompt: bool,
    pub article: Option<Article>,
}

impl NewGeneration {
    /// Create a record payload stamped with the current time
    pub fn new(
        user_id: impl Into<String>,
        prompt: impl Into<String>,
        image_url: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            created_at: Utc::now(),
            prompt: prompt.into(),
            image_url: image_url.into(),
            used_revised_prompt: false,
            article: None,
        }
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn with_revised_prompt(mut self, used_revised_prompt: bool) -> Self {
        self.used_revised_prompt = used_revised_prompt;
        self
    }

    pub fn with_article(mut self, article: Option<Article>) -> Self {
        self.article = article;
        self
    }
}
