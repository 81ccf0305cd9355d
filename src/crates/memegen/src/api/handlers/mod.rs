//! API endpoint handlers

pub mod gallery;
pub mod generate;
pub mod health;

pub use gallery::{list_generations, rate_limit};
pub use generate::{generate_stream, regenerate_stream};
pub use health::{health, health_detailed};
