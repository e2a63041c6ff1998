//! Shared types for the order sync engine
//!
//! Types used by the engine and by the rest of the dashboard: the order
//! model, the unified error system, and small time/ID utilities.

pub mod error;
pub mod order;
pub mod util;

// Re-exports
pub use error::{AppError, AppResult, ErrorCategory, ErrorCode};
pub use order::{CanonicalStatus, OrderRecord, RemoteOrder};
pub use serde::{Deserialize, Serialize};
