//! NewsData.io latest-news client.

use crate::config::RemoteServiceConfig;
use crate::error::{ProviderError, Result};
use crate::traits::NewsSource;
use crate::types::{Article, NewsCategory};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

/// Client for the NewsData `latest` endpoint.
#[derive(Clone)]
pub struct NewsDataClient {
    config: RemoteServiceConfig,
    client: Client,
}

impl NewsDataClient {
    /// Create a new news client.
    pub fn new(config: RemoteServiceConfig) -> Result<Self> {
        let client = config.http_client()?;
        Ok(Self { config, client })
    }

    fn query(&self, category: Option<NewsCategory>, language: &str) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("apikey", self.config.api_key.clone()),
            ("language", language.to_string()),
        ];
        if let Some(category) = category {
            query.push(("category", category.as_str().to_string()));
        }
        query
    }
}

#[async_trait]
impl NewsSource for NewsDataClient {
    async fn fetch_latest(
        &self,
        category: Option<NewsCategory>,
        language: &str,
    ) -> Result<Vec<Article>> {
        let response = self
            .client
            .get(self.config.trimmed_base_url())
            .query(&self.query(category, language))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::status("news source", status, error_text));
        }

        let news: NewsResponse = response
            .json().await?;

        tracing::debug!(
            status = %news.status,
            results = news.results.len(),
            "Fetched latest news"
        );
        Ok(news.results)
    }
}

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    results: Vec<Article>,
}
