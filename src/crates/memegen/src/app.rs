//! Application assembly
//!
//! Turns an [`AppConfig`] into a ready-to-serve router: opens the database,
//! builds the provider clients, and wires the pipeline.

use anyhow::Context;
use axum::Router;
use providers::local::LocalObjectStore;
use providers::remote::{AzureImageClient, GeminiClient, NewsDataClient, SupabaseAuth, SupabaseStorage};
use providers::{IdentityProvider, ObjectStore, RemoteServiceConfig};
use std::path::PathBuf;
use std::sync::Arc;

use crate::api::{create_router, AppState, IdentityResolver, RouterOptions};
use crate::config::{AppConfig, RateBackendKind, ServiceConfig, StorageBackendKind};
use crate::db::{GenerationStore, SqliteGenerationStore};
use crate::execution::{GenerationPipeline, PipelineDeps, PipelineSettings, StorageArchiver};
use crate::rate::{InMemoryRateBackend, RateBackend, RateTracker, StoreRateBackend};

/// Build the HTTP application described by `config`
pub async fn build_app(config: &AppConfig) -> anyhow::Result<Router> {
    config.validate()?;

    let database_url = config.database_url();
    tracing::info!("Connecting to database: {}", database_url);
    let store: Arc<dyn GenerationStore> = Arc::new(
        SqliteGenerationStore::connect(&database_url)
            .await
            .with_context(|| format!("failed to open {}", database_url))?,
    );

    let backend: Arc<dyn RateBackend> = match config.rate_limit.backend {
        RateBackendKind::Memory => Arc::new(InMemoryRateBackend::new()),
        RateBackendKind::Database => Arc::new(StoreRateBackend::new(Arc::clone(&store))),
    };
    tracing::info!(
        backend = backend.name(),
        limit = config.rate_limit.limit,
        window_secs = config.rate_limit.window_secs,
        "Rate limiting configured"
    );
    let tracker = Arc::new(RateTracker::new(backend, config.rate_limit.policy()));

    let (object_store, media_dir) = object_store(config)?;
    let http = reqwest::Client::builder()
        .timeout(config.pipeline.call_timeout())
        .build()
        .context("failed to build download client")?;

    let deps = PipelineDeps {
        news: Arc::new(NewsDataClient::new(remote_config(config, &config.news))?),
        synthesizer: Arc::new(GeminiClient::new(remote_config(config, &config.text))?),
        renderer: Arc::new(AzureImageClient::new(remote_config(config, &config.image))?),
        archiver: Arc::new(StorageArchiver::new(http, object_store)),
        store: Arc::clone(&store),
        tracker,
    };
    let settings = PipelineSettings {
        call_timeout: config.pipeline.call_timeout(),
        language: config.pipeline.language.clone(),
        buffer: config.pipeline.buffer,
    };

    let identity_provider: Option<Arc<dyn IdentityProvider>> = if config.supabase.is_configured() {
        Some(Arc::new(SupabaseAuth::new(supabase_config(config))?))
    } else {
        None
    };
    tracing::info!(
        verified_tokens = identity_provider.is_some(),
        require_login = config.auth.require_login,
        trust_forwarded_for = config.auth.trust_forwarded_for,
        "Identity resolution configured"
    );

    let state = AppState {
        name: Arc::from(config.server.name.as_str()),
        pipeline: Arc::new(GenerationPipeline::new(deps, settings)),
        store,
        identity: Arc::new(
            IdentityResolver::new(identity_provider, config.auth.require_login)
                .with_trusted_forwarded_for(config.auth.trust_forwarded_for),
        ),
    };
    let options = RouterOptions {
        media_dir,
        cors_origins: config.server.cors_origins.clone(),
    };
    Ok(create_router(state, options))
}

fn remote_config(config: &AppConfig, service: &ServiceConfig) -> RemoteServiceConfig {
    let remote = RemoteServiceConfig::new(service.api_key.clone(), service.base_url.clone())
        .with_timeout(config.pipeline.call_timeout());
    match &service.api_version {
        Some(version) => remote.with_api_version(version.clone()),
        None => remote,
    }
}

fn supabase_config(config: &AppConfig) -> RemoteServiceConfig {
    RemoteServiceConfig::new(config.supabase.anon_key.clone(), config.supabase.url.clone())
        .with_timeout(config.pipeline.call_timeout())
}

fn object_store(config: &AppConfig) -> anyhow::Result<(Arc<dyn ObjectStore>, Option<PathBuf>)> {
    match config.storage.backend {
        StorageBackendKind::Local => {
            let dir = PathBuf::from(&config.storage.local_dir);
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create media directory {}", dir.display()))?;
            tracing::info!(dir = %dir.display(), "Archiving images locally");
            let store = LocalObjectStore::new(dir.clone(), config.media_base_url());
            Ok((Arc::new(store), Some(dir)))
        }
        StorageBackendKind::Supabase => {
            tracing::info!(bucket = %config.storage.bucket, "Archiving images to Supabase Storage");
            let store = SupabaseStorage::new(supabase_config(config), config.storage.bucket.clone())?;
            Ok((Arc::new(store), None))
        }
    }
}
