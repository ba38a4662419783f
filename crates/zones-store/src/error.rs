//! # Store Errors
//!
//! Failures of the storage collaborator. Only [`StoreError::GeometryRejected`]
//! is caller-fixable; every other variant is a system failure that callers
//! must report opaquely.

use thiserror::Error;

/// SQLSTATE PostGIS uses when its geometry parser rejects input.
pub const INTERNAL_ERROR_SQLSTATE: &str = "XX000";

/// Error raised by a store operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A connection could not be established or acquired from the pool.
    #[error("connection error: {0}")]
    Connection(String),

    /// The spatial engine rejected a geometry, e.g. a ring with fewer than
    /// four points. The message is the engine's own and is safe to forward.
    #[error("{message}")]
    GeometryRejected { message: String },

    /// Any other query failure.
    #[error("query error: {0}")]
    Query(String),

    /// Schema migration failed.
    #[error("migration error: {0}")]
    Migration(String),
}

impl StoreError {
    /// Whether the caller can fix this by changing their input.
    pub fn is_caller_fixable(&self) -> bool {
        matches!(self, Self::GeometryRejected { .. })
    }
}

/// Classify a database-reported error by its SQLSTATE.
pub(crate) fn classify_database_error(code: Option<&str>, message: &str) -> StoreError {
    match code {
        Some(INTERNAL_ERROR_SQLSTATE) => StoreError::GeometryRejected {
            message: message.to_string(),
        },
        _ => StoreError::Query(message.to_string()),
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) => classify_database_error(db.code().as_deref(), db.message()),
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Configuration(_) => Self::Connection(err.to_string()),
            _ => Self::Query(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::Migration(err.to_string())
    }
}
