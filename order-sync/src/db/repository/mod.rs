//! Repository Module
//!
//! Free functions over `&SqlitePool`, one file per table.

pub mod order;
pub mod sync_run;

use crate::utils::{AppError, ErrorCode};
use thiserror::Error;

/// Repository error types
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    /// Datastore unreachable (pool closed or timed out, I/O failure)
    #[error("Datastore unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Whether a sync run must stop when this error is seen
    pub fn is_fatal(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            StoreError::NotFound(_) => ErrorCode::OrderNotFound,
            StoreError::Duplicate(_) => ErrorCode::OrderExternalIdExists,
            StoreError::Unavailable(_) => ErrorCode::StorageUnavailable,
            StoreError::Database(_) => ErrorCode::DatabaseError,
            StoreError::Serialization(_) => ErrorCode::InvalidFormat,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound("row not found".into()),
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                StoreError::Duplicate(db_err.message().to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StoreError::Serialization(err.to_string())
            }
            other => StoreError::Database(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::with_message(err.code(), err.to_string())
    }
}

/// Result type for repository operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_errors_are_fatal() {
        let err = StoreError::from(sqlx::Error::PoolClosed);
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(err.is_fatal());
        assert_eq!(err.code(), ErrorCode::StorageUnavailable);
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::NotFound(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_into_app_error_keeps_code() {
        let app: AppError = StoreError::Duplicate("external_id 501".into()).into();
        assert_eq!(app.code, ErrorCode::OrderExternalIdExists);
        assert!(app.message.contains("501"));
    }
}
