//! Persistence for completed generations
//!
//! SQLite pool management, the `generations` table model and repository,
//! and the [`GenerationStore`] seam the pipeline and rate tracker depend on.

pub mod connection;
pub mod error;
pub mod models;
pub mod repositories;
pub mod store;

pub use connection::{DatabaseConnection, DatabasePool};
pub use error::{DatabaseError, DbResult};
pub use models::{format_timestamp, GenerationRecord, NewGeneration};
pub use store::{GenerationStore, SqliteGenerationStore};
