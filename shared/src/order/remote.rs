//! Remote platform order shapes
//!
//! These are already validated: the gateway turns raw JSON into these types
//! and rejects anything it cannot map.

use super::record::{BillingAddress, Customer, LineItem};
use super::status::CanonicalStatus;
use serde::{Deserialize, Serialize};

/// Order as reported by the remote platform (never persisted as-is)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteOrder {
    pub external_id: i64,
    pub number: String,
    /// Raw platform status token, normalized before comparison
    pub status: String,
    pub customer: Customer,
    pub billing_address: BillingAddress,
    pub line_items: Vec<LineItem>,
    pub total: f64,
    pub shipping_total: f64,
    pub discount_total: f64,
    pub total_tax: f64,
    pub payment_method: String,
    /// Unix millis
    pub date_created: i64,
    /// Unix millis
    pub date_modified: i64,
}

/// Outbound patch for an order that already exists remotely
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderUpdatePatch {
    pub status: CanonicalStatus,
    pub total: f64,
    pub customer: Customer,
    pub billing_address: BillingAddress,
}

/// Payload for creating a locally-originated order on the remote platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRemoteOrder {
    pub status: CanonicalStatus,
    pub customer: Customer,
    pub billing_address: BillingAddress,
    pub line_items: Vec<LineItem>,
    pub shipping_total: f64,
    pub payment_method: String,
}
