//! Local order record (the durable side of reconciliation)

use super::status::CanonicalStatus;
use serde::{Deserialize, Serialize};

/// Customer contact on an order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    /// May be missing or malformed; repaired before any outbound push
    pub email: Option<String>,
}

/// Billing address
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingAddress {
    pub address_1: String,
    pub address_2: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub postcode: String,
}

/// One order line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: i64,
    pub name: String,
    pub quantity: i32,
    pub unit_price: f64,
    #[serde(default)]
    pub sku: String,
}

/// Order amounts
///
/// Expected to satisfy `total ≈ subtotal + shipping + tax - discount`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Amounts {
    pub subtotal: f64,
    pub shipping: f64,
    pub discount: f64,
    #[serde(default)]
    pub tax: f64,
    pub total: f64,
}

/// Durable local order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    /// Local primary key (snowflake, immutable)
    pub id: i64,
    /// Remote platform ID, absent until the order exists remotely
    pub external_id: Option<i64>,
    pub order_number: String,
    pub customer: Customer,
    pub billing_address: BillingAddress,
    pub line_items: Vec<LineItem>,
    pub amounts: Amounts,
    pub status: CanonicalStatus,
    pub payment_method: String,
    pub created_at: i64,
    /// Last known modification, used for conflict comparison
    pub updated_at: i64,
    pub is_synced_to_remote: bool,
    pub last_sync_attempt: Option<i64>,
    pub sync_error: Option<String>,
}

impl OrderRecord {
    /// Local edits that the outbound pusher has not delivered yet
    pub fn has_pending_push(&self) -> bool {
        !self.is_synced_to_remote || self.sync_error.is_some()
    }
}

/// Order about to be inserted; the store assigns `id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrderRecord {
    pub external_id: Option<i64>,
    pub order_number: String,
    pub customer: Customer,
    pub billing_address: BillingAddress,
    pub line_items: Vec<LineItem>,
    pub amounts: Amounts,
    pub status: CanonicalStatus,
    pub payment_method: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub is_synced_to_remote: bool,
}

impl NewOrderRecord {
    pub fn into_record(self, id: i64) -> OrderRecord {
        OrderRecord {
            id,
            external_id: self.external_id,
            order_number: self.order_number,
            customer: self.customer,
            billing_address: self.billing_address,
            line_items: self.line_items,
            amounts: self.amounts,
            status: self.status,
            payment_method: self.payment_method,
            created_at: self.created_at,
            updated_at: self.updated_at,
            is_synced_to_remote: self.is_synced_to_remote,
            last_sync_attempt: None,
            sync_error: None,
        }
    }
}

/// Partial update of an order
///
/// `None` leaves a column untouched. `sync_error` is doubly optional so a
/// patch can clear the error (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderPatch {
    pub external_id: Option<i64>,
    pub status: Option<CanonicalStatus>,
    pub subtotal: Option<f64>,
    pub shipping: Option<f64>,
    pub discount: Option<f64>,
    pub tax: Option<f64>,
    pub total: Option<f64>,
    pub payment_method: Option<String>,
    pub customer_email: Option<String>,
    pub updated_at: Option<i64>,
    pub is_synced_to_remote: Option<bool>,
    pub last_sync_attempt: Option<i64>,
    pub sync_error: Option<Option<String>>,
}

impl OrderPatch {
    /// True when the patch changes no order content (sync metadata aside)
    pub fn is_content_empty(&self) -> bool {
        self.external_id.is_none()
            && self.status.is_none()
            && self.subtotal.is_none()
            && self.shipping.is_none()
            && self.discount.is_none()
            && self.tax.is_none()
            && self.total.is_none()
            && self.payment_method.is_none()
            && self.customer_email.is_none()
    }

    /// Apply the patch to an in-memory record
    pub fn apply_to(&self, record: &mut OrderRecord) {
        if let Some(external_id) = self.external_id {
            record.external_id = Some(external_id);
        }
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(v) = self.subtotal {
            record.amounts.subtotal = v;
        }
        if let Some(v) = self.shipping {
            record.amounts.shipping = v;
        }
        if let Some(v) = self.discount {
            record.amounts.discount = v;
        }
        if let Some(v) = self.tax {
            record.amounts.tax = v;
        }
        if let Some(v) = self.total {
            record.amounts.total = v;
        }
        if let Some(method) = &self.payment_method {
            record.payment_method = method.clone();
        }
        if let Some(email) = &self.customer_email {
            record.customer.email = Some(email.clone());
        }
        if let Some(ts) = self.updated_at {
            record.updated_at = ts;
        }
        if let Some(synced) = self.is_synced_to_remote {
            record.is_synced_to_remote = synced;
        }
        if let Some(ts) = self.last_sync_attempt {
            record.last_sync_attempt = Some(ts);
        }
        if let Some(err) = &self.sync_error {
            record.sync_error = err.clone();
        }
    }
}
