//! Generation store abstraction
//!
//! The pipeline persists records and the database-backed rate backend counts
//! them through this trait, so both can run against test doubles.

use crate::db::connection::DatabaseConnection;
use crate::db::error::DbResult;
use crate::db::models::{GenerationRecord, NewGeneration};
use crate::db::repositories::GenerationRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Durable store of completed generations
#[async_trait]
pub trait GenerationStore: Send + Sync {
    /// Persist a completed generation
    async fn insert(&self, generation: NewGeneration) -> DbResult<GenerationRecord>;

    /// Number of records for `user_id` created at or after `since`
    async fn count_since(&self, user_id: &str, since: DateTime<Utc>) -> DbResult<u32>;

    /// A user's records, newest first
    async fn list_for_user(&self, user_id: &str, limit: u32) -> DbResult<Vec<GenerationRecord>>;

    /// Verify the store is reachable
    async fn health_check(&self) -> DbResult<()>;
}

/// SQLite-backed [`GenerationStore`]
#[derive(Clone)]
pub struct SqliteGenerationStore {
    db: DatabaseConnection,
}

impl SqliteGenerationStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Open `database_url` and apply pending migrations
    pub async fn connect(database_url: &str) -> DbResult<Self> {
        let db = DatabaseConnection::new(database_url).await?;
        db.run_migrations().await?;
        Ok(Self::new(db))
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl GenerationStore for SqliteGenerationStore {
    async fn insert(&self, generation: NewGeneration) -> DbResult<GenerationRecord> {
        let record = GenerationRepository::create(self.db.pool(), &generation).await?;
        tracing::debug!(id = %record.id, user_id = %record.user_id, "Stored generation record");
        Ok(record)
    }

    async fn count_since(&self, user_id: &str, since: DateTime<Utc>) -> DbResult<u32> {
        let count = GenerationRepository::count_since(self.db.pool(), user_id, since).await?;
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn list_for_user(&self, user_id: &str, limit: u32) -> DbResult<Vec<GenerationRecord>> {
        Ok(GenerationRepository::list_by_user(self.db.pool(), user_id, limit).await?)
    }

    async fn health_check(&self) -> DbResult<()> {
        Ok(self.db.health_check().await?)
    }
}
