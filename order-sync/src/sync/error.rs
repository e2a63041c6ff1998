//! Sync error taxonomy

use crate::db::StoreError;
use crate::remote::GatewayError;
use crate::utils::{AppError, ErrorCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by sync runs and outbound pushes
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    /// Network failure or timeout; retried on the next scheduled run
    #[error("transport error: {0}")]
    Transport(String),

    /// Credentials rejected; aborts the whole run
    #[error("authentication rejected: {0}")]
    Auth(String),

    /// Remote rejected a payload
    #[error("validation error: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("a sync run is already in progress")]
    AlreadyRunning,

    #[error("sync run cancelled")]
    Cancelled,
}

impl SyncError {
    /// Errors that end the current run
    pub fn is_fatal(&self) -> bool {
        match self {
            SyncError::Auth(_) | SyncError::Cancelled => true,
            SyncError::Storage(e) => e.is_fatal(),
            _ => false,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            SyncError::Transport(_) => ErrorCode::RemoteUnavailable,
            SyncError::Auth(_) => ErrorCode::RemoteAuthRejected,
            SyncError::Validation(_) => ErrorCode::RemoteRejectedPayload,
            SyncError::Storage(e) => e.code(),
            SyncError::AlreadyRunning => ErrorCode::SyncAlreadyRunning,
            SyncError::Cancelled => ErrorCode::SyncCancelled,
        }
    }
}

impl From<GatewayError> for SyncError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Transport(msg) => SyncError::Transport(msg),
            GatewayError::Auth(msg) => SyncError::Auth(msg),
            GatewayError::Validation(msg) => SyncError::Validation(msg),
        }
    }
}

impl From<SyncError> for AppError {
    fn from(err: SyncError) -> Self {
        AppError::with_message(err.code(), err.to_string())
    }
}

/// Category of a per-record failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordErrorKind {
    Transport,
    Validation,
    Storage,
    /// Remote object failed boundary validation
    InvalidPayload,
}

/// Failure confined to one record (or one page of a status bucket)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordError {
    pub external_id: Option<i64>,
    pub local_id: Option<i64>,
    pub kind: RecordErrorKind,
    pub message: String,
}

impl RecordError {
    pub fn new(
        kind: RecordErrorKind,
        external_id: Option<i64>,
        local_id: Option<i64>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            external_id,
            local_id,
            kind,
            message: message.into(),
        }
    }

    pub fn from_sync_error(err: &SyncError, external_id: Option<i64>, local_id: Option<i64>) -> Self {
        let kind = match err {
            SyncError::Validation(_) => RecordErrorKind::Validation,
            SyncError::Storage(_) => RecordErrorKind::Storage,
            _ => RecordErrorKind::Transport,
        };
        Self::new(kind, external_id, local_id, err.to_string())
    }
}
