//! Server configuration for memegen-server
//!
//! Loads `memegen.toml`. Every section is optional; missing values fall back
//! to the defaults below. Provider credentials are normally supplied through
//! the environment rather than the file.

use super::env::{expand_env, override_from_env};
use crate::rate::RatePolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Server identification and binding
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerInfoConfig {
    /// Server name reported by the health endpoint
    pub name: String,
    pub host: String,
    pub port: u16,
    /// Externally reachable base URL, used for locally stored images
    pub public_url: String,
    /// Browser origins allowed to call the API; empty allows any
    pub cors_origins: Vec<String>,
}

impl Default for ServerInfoConfig {
    fn default() -> Self {
        Self {
            name: "memegen".to_string(),
            host: "127.0.0.1".to_string(),
            port: 8080,
            public_url: "http://127.0.0.1:8080".to_string(),
            cors_origins: Vec::new(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database file path
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "memegen.db".to_string(),
        }
    }
}

/// Where rate usage is counted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateBackendKind {
    /// In-process table, reset on restart
    #[default]
    Memory,
    /// Count stored generation records
    Database,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Generations allowed per window
    pub limit: u32,
    pub window_secs: u64,
    pub backend: RateBackendKind,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: crate::rate::backend::DEFAULT_LIMIT,
            window_secs: 24 * 60 * 60,
            backend: RateBackendKind::Memory,
        }
    }
}

impl RateLimitConfig {
    pub fn policy(&self) -> RatePolicy {
        RatePolicy::from_secs(self.limit, self.window_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Timeout for each collaborator call
    pub call_timeout_secs: u64,
    /// Language requested from the news source
    pub language: String,
    /// Progress channel capacity per run
    pub buffer: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            call_timeout_secs: 60,
            language: "en".to_string(),
            buffer: crate::execution::progress::DEFAULT_BUFFER,
        }
    }
}

impl PipelineConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

/// Endpoint and credentials of a remote service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub base_url: String,
    pub api_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

impl ServiceConfig {
    fn with_base_url(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            ..Self::default()
        }
    }

    fn is_configured(&self) -> bool {
        !self.base_url.trim().is_empty() && !self.api_key.trim().is_empty()
    }
}

/// Where archived images are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    /// Local directory served under `/media`
    #[default]
    Local,
    /// Supabase Storage bucket
    Supabase,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackendKind,
    pub bucket: String,
    pub local_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackendKind::Local,
            bucket: "meme_images".to_string(),
            local_dir: "media".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Refuse generations from callers without a verified token
    pub require_login: bool,
    /// Identify anonymous callers by `X-Forwarded-For`; only behind a proxy
    /// that overwrites the header
    pub trust_forwarded_for: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            require_login: true,
            trust_forwarded_for: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
}

impl SupabaseConfig {
    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty() && !self.anon_key.trim().is_empty()
    }
}

/// Complete server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerInfoConfig,
    pub database: DatabaseConfig,
    pub rate_limit: RateLimitConfig,
    pub pipeline: PipelineConfig,
    /// News source (NewsData)
    pub news: ServiceConfig,
    /// Text generation (Gemini)
    pub text: ServiceConfig,
    /// Image generation (Azure OpenAI)
    pub image: ServiceConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub supabase: SupabaseConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerInfoConfig::default(),
            database: DatabaseConfig::default(),
            rate_limit: RateLimitConfig::default(),
            pipeline: PipelineConfig::default(),
            news: ServiceConfig::with_base_url("https://newsdata.io/api/1/latest"),
            text: ServiceConfig::with_base_url(
                "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent",
            ),
            image: ServiceConfig {
                api_version: Some(providers::remote::azure_image::DEFAULT_API_VERSION.to_string()),
                ..ServiceConfig::default()
            },
            storage: StorageConfig::default(),
            auth: AuthConfig::default(),
            supabase: SupabaseConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string, expanding `${VAR:default}`
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(&expand_env(content))?)
    }

    /// Load configuration from the first location that exists
    ///
    /// Searches, in order:
    /// 1. `explicit` (from `--config`)
    /// 2. CONFIG_PATH environment variable
    /// 3. ./config/memegen.toml
    /// 4. ./memegen.toml
    ///
    /// Falls back to defaults when no file is found. Environment overrides
    /// are applied in every case.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match Self::locate(explicit) {
            Some(path) => {
                tracing::info!(path = %path.display(), "Loading configuration");
                Self::from_file(&path)?
            }
            None => {
                tracing::info!("No configuration file found, using defaults");
                Self::default()
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        if let Ok(config_path) = std::env::var("CONFIG_PATH") {
            return Some(PathBuf::from(config_path));
        }
        [
            PathBuf::from("config/memegen.toml"),
            PathBuf::from("./memegen.toml"),
        ]
        .into_iter()
        .find(|path| path.exists())
    }

    /// Apply provider credentials from the environment
    pub fn apply_env_overrides(&mut self) {
        override_from_env(&mut self.image.api_key, "AZURE_API_KEY");
        override_from_env(&mut self.image.base_url, "AZURE_ENDPOINT");
        let mut version = self.image.api_version.clone().unwrap_or_default();
        if override_from_env(&mut version, "AZURE_API_VERSION") {
            self.image.api_version = Some(version);
        }
        override_from_env(&mut self.text.api_key, "GEMINI_API_KEY");
        override_from_env(&mut self.text.base_url, "GEMINI_API_URL");
        override_from_env(&mut self.news.api_key, "NEWSDATA_API_KEY");
        override_from_env(&mut self.news.base_url, "NEWSDATA_BASE_URL");
        override_from_env(&mut self.supabase.url, "SUPABASE_URL");
        override_from_env(&mut self.supabase.anon_key, "SUPABASE_ANON_KEY");
    }

    /// Check that every collaborator the configuration selects is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut missing = Vec::new();
        if !self.news.is_configured() {
            missing.push("news (NEWSDATA_API_KEY / NEWSDATA_BASE_URL)");
        }
        if !self.text.is_configured() {
            missing.push("text (GEMINI_API_KEY / GEMINI_API_URL)");
        }
        if !self.image.is_configured() {
            missing.push("image (AZURE_API_KEY / AZURE_ENDPOINT)");
        }
        let needs_supabase =
            self.storage.backend == StorageBackendKind::Supabase || self.auth.require_login;
        if needs_supabase && !self.supabase.is_configured() {
            missing.push("supabase (SUPABASE_URL / SUPABASE_ANON_KEY)");
        }
        if !missing.is_empty() {
            return Err(ConfigError::InvalidConfig(format!(
                "missing settings for {}",
                missing.join(", ")
            )));
        }

        if self.rate_limit.limit == 0 {
            return Err(ConfigError::InvalidConfig(
                "rate_limit.limit must be at least 1".to_string(),
            ));
        }
        if self.pipeline.call_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "pipeline.call_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Get database URL from configuration
    pub fn database_url(&self) -> String {
        format!("sqlite://{}", self.database.path)
    }

    /// Address the HTTP server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Public base URL of locally stored images
    pub fn media_base_url(&self) -> String {
        format!("{}/media", self.server.public_url.trim_end_matches('/'))
    }
}
