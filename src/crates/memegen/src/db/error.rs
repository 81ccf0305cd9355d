//! Persistence errors

use thiserror::Error;

/// Failure talking to the generation store
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// The database could not be reached (pool exhausted or closed, I/O, bad URL)
    #[error("Database unavailable: {0}")]
    Unavailable(String),

    /// Requested row does not exist
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A unique or check constraint rejected the write
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// A stored value could not be decoded into its Rust type
    #[error("Failed to decode stored value: {0}")]
    Decode(String),

    /// Schema migration failed at startup
    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),
}

impl DatabaseError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DatabaseError::NotFound(_))
    }
}

/// Result type for store operations
pub type DbResult<T> = std::result::Result<T, DatabaseError>;

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DatabaseError::NotFound("no matching generation".to_string()),
            sqlx::Error::ColumnDecode { index, source } => {
                DatabaseError::Decode(format!("column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DatabaseError::Decode(source.to_string()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() || db_err.is_check_violation() => {
                DatabaseError::ConstraintViolation(db_err.message().to_string())
            }
            sqlx::Error::Configuration(_)
            | sqlx::Error::Io(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed => DatabaseError::Unavailable(err.to_string()),
            err => DatabaseError::Query(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DatabaseError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DatabaseError::Migration(err.to_string())
    }
}
