//! Service configuration
//!
//! TOML configuration with `${VAR:default}` expansion and explicit
//! environment overrides for provider credentials.

pub mod env;
pub mod server;

pub use env::expand_env;
pub use server::{
    AppConfig, AuthConfig, ConfigError, DatabaseConfig, PipelineConfig, RateBackendKind,
    RateLimitConfig, ServerInfoConfig, ServiceConfig, StorageBackendKind, StorageConfig,
    SupabaseConfig,
};
