//! Remote service adapters for memegen.
//!
//! This crate wraps every hosted capability the generation pipeline depends on
//! behind a small trait, together with a concrete HTTP client for it:
//!
//! | capability | trait | client |
//! |---|---|---|
//! | latest news | [`NewsSource`] | [`remote::NewsDataClient`] |
//! | headline → prompt | [`PromptSynthesizer`] | [`remote::GeminiClient`] |
//! | prompt → image | [`ImageRenderer`] | [`remote::AzureImageClient`] |
//! | durable image storage | [`ObjectStore`] | [`remote::SupabaseStorage`], [`local::LocalObjectStore`] |
//! | access token → user id | [`IdentityProvider`] | [`remote::SupabaseAuth`] |
//!
//! Adapters never retry: one request in, one result or one [`ProviderError`]
//! out. Retry policy belongs to the caller.
//!
//! # Example
//!
//! ```rust,ignore
//! use providers::remote::AzureImageClient;
//! use providers::{ImageRenderer, ImageSize, RemoteServiceConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RemoteServiceConfig::from_env("AZURE_API_KEY", "AZURE_ENDPOINT")?
//!         .with_api_version("2024-02-01");
//!     let renderer = AzureImageClient::new(config)?;
//!
//!     let urls = renderer.render("A robot celebrating with confetti", ImageSize::Square).await?;
//!     println!("Rendered: {}", urls[0]);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod local;
pub mod remote;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use config::RemoteServiceConfig;
pub use error::{ProviderError, Result};
pub use traits::{IdentityProvider, ImageRenderer, NewsSource, ObjectStore, PromptSynthesizer};
pub use types::{Article, ImageSize, NewsCategory};
