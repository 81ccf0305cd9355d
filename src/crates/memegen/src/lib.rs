//! Headline-to-meme generation service
//!
//! Turns the latest news headline into an AI-generated meme and streams the
//! run's progress to the caller:
//!
//! ```text
//! admission -> fetch article -> synthesize prompt -> render (with fallback)
//!           -> archive image -> store record -> record usage -> done
//! ```
//!
//! - [`rate`] - per-identity quota over a rolling window
//! - [`execution`] - the pipeline, its state machine and progress channel
//! - [`db`] - SQLite persistence of completed generations
//! - [`api`] - axum routes, SSE streams and JSON endpoints
//! - [`config`] - TOML configuration with environment overrides
//!
//! Remote collaborators (news, text, image, storage, identity) come from the
//! `providers` crate.

pub mod api;
pub mod app;
pub mod config;
pub mod db;
pub mod domain;
pub mod execution;
pub mod rate;
pub mod version;

pub use app::build_app;
pub use config::AppConfig;
pub use domain::{GenerationRequest, GenerationResult, RegenerationRequest};
pub use execution::{
    GenerationError, GenerationPipeline, PipelineDeps, PipelineSettings, ProgressEvent,
    ProgressStream,
};
pub use rate::{RateInfo, RateTracker};

// Re-export provider types used in the public API
pub use providers::{Article, ImageSize, NewsCategory};
