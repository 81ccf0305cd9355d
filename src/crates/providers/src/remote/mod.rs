//! Remote service implementations.
//!
//! Each client wraps one hosted API behind a capability trait:
//!
//! - **NewsData** - latest headlines ([`NewsSource`](crate::NewsSource))
//! - **Gemini** - headline to image prompt ([`PromptSynthesizer`](crate::PromptSynthesizer))
//! - **Azure OpenAI** - DALL-E 3 rendering ([`ImageRenderer`](crate::ImageRenderer))
//! - **Supabase** - object storage and auth ([`ObjectStore`](crate::ObjectStore),
//!   [`IdentityProvider`](crate::IdentityProvider))

pub mod azure_image;
pub mod gemini;
pub mod newsdata;
pub mod supabase;

pub use azure_image::AzureImageClient;
pub use gemini::GeminiClient;
pub use newsdata::NewsDataClient;
pub use supabase::{SupabaseAuth, SupabaseStorage};
