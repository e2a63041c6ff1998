//! Remote Order Gateway seam

use crate::utils::{AppError, ErrorCode};
use async_trait::async_trait;
use shared::order::{NewRemoteOrder, OrderUpdatePatch, RemoteOrder};
use thiserror::Error;

/// Remote call failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Network failure, timeout, unexpected status or undecodable body
    #[error("transport error: {0}")]
    Transport(String),

    /// Credentials rejected (HTTP 401/403)
    #[error("authentication rejected: {0}")]
    Auth(String),

    /// Remote rejected the payload (HTTP 400/404/409/422)
    #[error("remote rejected payload: {0}")]
    Validation(String),
}

impl GatewayError {
    /// Classify a non-success HTTP status
    pub fn from_status(status: u16, message: &str) -> Self {
        let detail = if message.is_empty() {
            format!("HTTP {status}")
        } else {
            format!("HTTP {status}: {message}")
        };
        match status {
            401 | 403 => GatewayError::Auth(detail),
            400 | 404 | 409 | 422 => GatewayError::Validation(detail),
            _ => GatewayError::Transport(detail),
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, GatewayError::Auth(_))
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            GatewayError::Transport(_) => ErrorCode::RemoteUnavailable,
            GatewayError::Auth(_) => ErrorCode::RemoteAuthRejected,
            GatewayError::Validation(_) => ErrorCode::RemoteRejectedPayload,
        }
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        AppError::with_message(err.code(), err.to_string())
    }
}

/// One page request against the status-filtered list endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOrdersQuery {
    /// Platform status token, passed through untouched
    pub status: String,
    /// Inclusive lower bound on creation time (Unix millis)
    pub date_from: Option<i64>,
    /// Exclusive upper bound on creation time (Unix millis)
    pub date_to: Option<i64>,
    /// 1-based
    pub page: u32,
    pub per_page: u32,
}

/// Remote object that failed boundary validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedOrder {
    pub external_id: Option<i64>,
    pub reason: String,
}

/// One page of remote orders
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderPage {
    pub orders: Vec<RemoteOrder>,
    pub rejected: Vec<RejectedOrder>,
    pub has_more: bool,
    pub total_pages: Option<u32>,
}

impl OrderPage {
    /// Pagination flag from the total-pages header, or from a full page when absent
    pub fn has_more_after(page: u32, per_page: u32, total_pages: Option<u32>, received: usize) -> bool {
        match total_pages {
            Some(total) => page < total,
            None => per_page > 0 && received >= per_page as usize,
        }
    }
}

/// Access to the commerce platform's order API
///
/// The gateway never interprets status tokens; normalization happens in the
/// sync layer.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    async fn list_orders(&self, query: &ListOrdersQuery) -> Result<OrderPage, GatewayError>;

    async fn push_order_update(
        &self,
        external_id: i64,
        patch: &OrderUpdatePatch,
    ) -> Result<(), GatewayError>;

    /// Create a locally-originated order remotely, returning the remote copy
    async fn create_order(&self, order: &NewRemoteOrder) -> Result<RemoteOrder, GatewayError>;
}
