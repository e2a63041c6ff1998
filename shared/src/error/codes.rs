//! Unified error codes for the order sync engine
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 4xxx: Order errors
//! - 5xxx: Remote platform errors
//! - 6xxx: Sync run errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values so they can be persisted
/// alongside run history and compared across processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid format
    InvalidFormat = 5,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Another local order already carries this external ID
    OrderExternalIdExists = 4002,

    // ==================== 5xxx: Remote ====================
    /// Remote platform unreachable or timed out
    RemoteUnavailable = 5001,
    /// Remote platform rejected our credentials
    RemoteAuthRejected = 5002,
    /// Remote platform rejected the payload
    RemoteRejectedPayload = 5003,

    // ==================== 6xxx: Sync ====================
    /// A sync run is already in progress
    SyncAlreadyRunning = 6001,
    /// The sync run was cancelled
    SyncCancelled = 6002,

    // ==================== 9xxx: System ====================
    /// Internal error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Configuration error
    ConfigError = 9005,
    /// Local datastore unreachable
    StorageUnavailable = 9006,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidFormat => "Invalid format",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderExternalIdExists => "An order with this external ID already exists",

            // Remote
            ErrorCode::RemoteUnavailable => "Remote platform is unavailable",
            ErrorCode::RemoteAuthRejected => "Remote platform rejected the credentials",
            ErrorCode::RemoteRejectedPayload => "Remote platform rejected the payload",

            // Sync
            ErrorCode::SyncAlreadyRunning => "A sync run is already in progress",
            ErrorCode::SyncCancelled => "Sync run was cancelled",

            // System
            ErrorCode::InternalError => "Internal error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::ConfigError => "Configuration error",
            ErrorCode::StorageUnavailable => "Local datastore is unavailable",
        }
    }

    /// Whether the failure is expected to clear up on a later run
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::RemoteUnavailable
                | ErrorCode::DatabaseError
                | ErrorCode::StorageUnavailable
                | ErrorCode::SyncAlreadyRunning
        )
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidFormat),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4002 => Ok(ErrorCode::OrderExternalIdExists),

            // Remote
            5001 => Ok(ErrorCode::RemoteUnavailable),
            5002 => Ok(ErrorCode::RemoteAuthRejected),
            5003 => Ok(ErrorCode::RemoteRejectedPayload),

            // Sync
            6001 => Ok(ErrorCode::SyncAlreadyRunning),
            6002 => Ok(ErrorCode::SyncCancelled),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9005 => Ok(ErrorCode::ConfigError),
            9006 => Ok(ErrorCode::StorageUnavailable),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
