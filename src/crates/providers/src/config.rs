//! Common configuration for remote service clients.

use crate::error::{ProviderError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection settings for one remote service.
///
/// Every adapter in this crate takes one of these; the meaning of
/// `base_url` depends on the service:
/// - news: the `latest` endpoint, e.g. "https://newsdata.io/api/1/latest"
/// - text: the full `generateContent` URL of the model
/// - image: the deployment's `images/generations` URL
/// - storage/identity: the project URL, e.g. "https://xyz.supabase.co"
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteServiceConfig {
    /// API key for authentication.
    pub api_key: String,

    /// Base URL for the API.
    pub base_url: String,

    /// API version query parameter, for services that require one.
    #[serde(default)]
    pub api_version: Option<String>,

    /// Request timeout duration.
    #[serde(default = "default_timeout")]
    pub timeout: Duration,
}

impl RemoteServiceConfig {
    /// Create a new remote service configuration.
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            api_version: None,
            timeout: default_timeout(),
        }
    }

    /// Create configuration from a pair of environment variables.
    pub fn from_env(key_var: &str, url_var: &str) -> Result<Self> {
        let api_key = std::env::var(key_var)
            .map_err(|_| ProviderError::ConfigError(format!("Environment variable: {}", key_var)))?;
        let base_url = std::env::var(url_var)
            .map_err(|_| ProviderError::ConfigError(format!("Environment variable: {}", url_var)))?;

        Ok(Self::new(api_key, base_url))
    }

    /// Set the API version.
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Base URL without a trailing slash.
    pub fn trimmed_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub(crate) fn http_client(&self) -> Result<reqwest::Client> {
        Ok(reqwest::Client::builder().timeout(self.timeout).build()?)
    }
}

fn default_timeout() -> Duration {
    Duration::from_secs(60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_config_builder() {
        let config = RemoteServiceConfig::new("key", "https://example.com/")
            .with_api_version("2024-02-01")
            .with_timeout(Duration::from_secs(5));

        assert_eq!(config.api_version.as_deref(), Some("2024-02-01"));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.trimmed_base_url(), "https://example.com");
    }

    #[test]
    fn test_from_env_missing_key() {
        let result = RemoteServiceConfig::from_env(
            "PROVIDERS_TEST_MISSING_KEY",
            "PROVIDERS_TEST_MISSING_URL",
        );
        assert!(matches!(result, Err(ProviderError::ConfigError(_))));
    }

    #[test]
    fn test_from_env_present() {
        std::env::set_var("PROVIDERS_TEST_PRESENT_KEY", "secret");
        std::env::set_var("PROVIDERS_TEST_PRESENT_URL", "https://news.example.com");
        let config = RemoteServiceConfig::from_env(
            "PROVIDERS_TEST_PRESENT_KEY",
            "PROVIDERS_TEST_PRESENT_URL",
        )
        .unwrap();
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.base_url, "https://news.example.com");
    }
}
