//! Value types exchanged with the remote services.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// A news article as returned by the news source.
///
/// Read-only: the pipeline snapshots it into the generation record but never
/// mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    /// Headline
    pub title: String,
    /// Link to the original article
    #[serde(default, deserialize_with = "null_as_default")]
    pub link: String,
    /// Short description or lead paragraph
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// Categories assigned by the news source
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: Vec<String>,
    /// Publication date as reported by the source
    #[serde(default, alias = "pub_date", deserialize_with = "null_as_default")]
    pub pub_date: String,
}

impl Article {
    /// Create an article with just a title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: String::new(),
            description: String::new(),
            category: Vec::new(),
            pub_date: String::new(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the link.
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = link.into();
        self
    }

    /// Add a category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category.push(category.into());
        self
    }

    /// Set the publication date.
    pub fn with_pub_date(mut self, pub_date: impl Into<String>) -> Self {
        self.pub_date = pub_date.into();
        self
    }
}

// News APIs send `null` for absent text fields.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// News categories considered safe to turn into memes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NewsCategory {
    Business,
    Education,
    Entertainment,
    Environment,
    Food,
    Lifestyle,
    Science,
    Sports,
    Technology,
    Tourism,
}

impl NewsCategory {
    /// Every safe category, in display order.
    pub const ALL: [NewsCategory; 10] = [
        NewsCategory::Business,
        NewsCategory::Education,
        NewsCategory::Entertainment,
        NewsCategory::Environment,
        NewsCategory::Food,
        NewsCategory::Lifestyle,
        NewsCategory::Science,
        NewsCategory::Sports,
        NewsCategory::Technology,
        NewsCategory::Tourism,
    ];

    /// Query-string value understood by the news source.
    pub fn as_str(&self) -> &'static str {
        match self {
            NewsCategory::Business => "business",
            NewsCategory::Education => "education",
            NewsCategory::Entertainment => "entertainment",
            NewsCategory::Environment => "environment",
            NewsCategory::Food => "food",
            NewsCategory::Lifestyle => "lifestyle",
            NewsCategory::Science => "science",
            NewsCategory::Sports => "sports",
            NewsCategory::Technology => "technology",
            NewsCategory::Tourism => "tourism",
        }
    }

    /// Parse a requested category.
    ///
    /// Returns `None` for anything outside the safe list, so callers fall back
    /// to an unfiltered fetch instead of forwarding arbitrary input.
    pub fn parse_safe(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(value))
    }
}

impl fmt::Display for NewsCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aspect presets supported by the image renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ImageSize {
    /// 1024x1024
    #[default]
    Square,
    /// 1024x1792
    Portrait,
    /// 1792x1024
    Landscape,
}

impl ImageSize {
    /// Pixel dimensions in the form the renderer expects.
    pub fn as_dimensions(&self) -> &'static str {
        match self {
            ImageSize::Square => "1024x1024",
            ImageSize::Portrait => "1024x1792",
            ImageSize::Landscape => "1792x1024",
        }
    }

    /// Parse a preset name or pixel string; unknown values become `Square`.
    pub fn parse_or_default(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "1024x1792" | "portrait" => ImageSize::Portrait,
            "1792x1024" | "landscape" => ImageSize::Landscape,
            _ => ImageSize::Square,
        }
    }
}

impl From<String> for ImageSize {
    fn from(value: String) -> Self {
        ImageSize::parse_or_default(&value)
    }
}

impl From<ImageSize> for String {
    fn from(size: ImageSize) -> Self {
        size.as_dimensions().to_string()
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_dimensions())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse_accepts_safe_values() {
        assert_eq!(NewsCategory::parse_safe("technology"), Some(NewsCategory::Technology));
        assert_eq!(NewsCategory::parse_safe(" Sports "), Some(NewsCategory::Sports));
    }

    #[test]
    fn test_category_parse_rejects_unlisted_values() {
        assert_eq!(NewsCategory::parse_safe("politics"), None);
        assert_eq!(NewsCategory::parse_safe("crime"), None);
        assert_eq!(NewsCategory::parse_safe(""), None);
    }

    #[test]
    fn test_image_size_parsing() {
        assert_eq!(ImageSize::parse_or_default("1024x1024"), ImageSize::Square);
        assert_eq!(ImageSize::parse_or_default("1024x1792"), ImageSize::Portrait);
        assert_eq!(ImageSize::parse_or_default("landscape"), ImageSize::Landscape);
        assert_eq!(ImageSize::parse_or_default("640x480"), ImageSize::Square);
    }

    #[test]
    fn test_image_size_serde_falls_back_to_square() {
        let size: ImageSize = serde_json::from_str("\"1792x1024\"").unwrap();
        assert_eq!(size, ImageSize::Landscape);

        let size: ImageSize = serde_json::from_str("\"huge\"").unwrap();
        assert_eq!(size, ImageSize::Square);

        assert_eq!(serde_json::to_string(&ImageSize::Portrait).unwrap(), "\"1024x1792\"");
    }

    #[test]
    fn test_article_deserializes_news_payload() {
        let json = r#"{
            "title": "X raises funding",
            "link": "https://example.com/x",
            "description": "Startup X closes a round",
            "pubDate": "2024-05-01 10:00:00",
            "category": ["technology"],
            "source_id": "example"
        }"#;
        let article: Article = serde_json::from_str(json).unwrap();
        assert_eq!(article.title, "X raises funding");
        assert_eq!(article.pub_date, "2024-05-01 10:00:00");
        assert_eq!(article.category, vec!["technology".to_string()]);
    }

    #[test]
    fn test_article_tolerates_missing_fields() {
        let article: Article = serde_json::from_str(r#"{"title": "Only a title"}"#).unwrap();
        assert!(article.description.is_empty());
        assert!(article.category.is_empty());

        let article: Article =
            serde_json::from_str(r#"{"title": "t", "description": null, "category": null}"#).unwrap();
        assert!(article.description.is_empty());
        assert!(article.category.is_empty());
    }
}
