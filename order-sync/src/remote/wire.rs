//! Remote JSON shapes and boundary validation
//!
//! The platform sends money as decimal strings (`"120.00"`), sometimes as
//! numbers, and timestamps with or without a zone. Everything is mapped
//! onto fixed types here; objects that cannot be mapped are reported as
//! [`RejectedOrder`] instead of failing the page.

use super::gateway::RejectedOrder;
use crate::utils::money;
use serde::{Deserialize, Serialize};
use shared::order::{
    BillingAddress, Customer, LineItem, NewRemoteOrder, OrderUpdatePatch, RemoteOrder,
};
use shared::util::parse_timestamp_millis;

/// Amount as either a JSON number or a decimal string
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum WireAmount {
    Number(f64),
    Text(String),
}

impl WireAmount {
    fn value(&self) -> Option<f64> {
        let value = match self {
            WireAmount::Number(n) => *n,
            WireAmount::Text(s) if s.trim().is_empty() => 0.0,
            WireAmount::Text(s) => s.trim().parse().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

/// Optional amount field: absent means zero, unparseable is an error
fn amount(field: &str, raw: &Option<WireAmount>) -> Result<f64, String> {
    match raw {
        None => Ok(0.0),
        Some(a) => a.value().ok_or_else(|| format!("{field} is not a number: {a:?}")),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WireBilling {
    pub first_name: String,
    pub last_name: String,
    pub address_1: String,
    pub address_2: String,
    pub city: String,
    pub state: String,
    pub postcode: String,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub phone: String,
}

impl WireBilling {
    fn from_parts(customer: &Customer, address: &BillingAddress) -> Self {
        Self {
            first_name: customer.first_name.clone(),
            last_name: customer.last_name.clone(),
            address_1: address.address_1.clone(),
            address_2: address.address_2.clone(),
            city: address.city.clone(),
            state: address.state.clone(),
            postcode: address.postcode.clone(),
            country: address.country.clone(),
            email: customer.email.clone(),
            phone: customer.phone.clone(),
        }
    }

    fn customer(&self) -> Customer {
        Customer {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            phone: self.phone.trim().to_string(),
            email: self
                .email
                .as_deref()
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(String::from),
        }
    }

    fn address(&self) -> BillingAddress {
        BillingAddress {
            address_1: self.address_1.clone(),
            address_2: self.address_2.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            country: self.country.clone(),
            postcode: self.postcode.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireLineItem {
    #[serde(default)]
    pub product_id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub quantity: i32,
    /// Unit price
    pub price: Option<WireAmount>,
    /// Line subtotal, used when `price` is missing
    pub subtotal: Option<WireAmount>,
    #[serde(default)]
    pub sku: Option<String>,
}

impl WireLineItem {
    fn into_line_item(self) -> Result<LineItem, String> {
        if self.quantity < 0 {
            return Err(format!("line item '{}' has negative quantity", self.name));
        }
        let unit_price = match (&self.price, &self.subtotal) {
            (Some(price), _) => price
                .value()
                .ok_or_else(|| format!("line item price is not a number: {price:?}"))?,
            (None, Some(_)) if self.quantity > 0 => {
                amount("line item subtotal", &self.subtotal)? / f64::from(self.quantity)
            }
            _ => 0.0,
        };
        Ok(LineItem {
            product_id: self.product_id,
            name: self.name,
            quantity: self.quantity,
            unit_price: money::to_f64(money::to_decimal(unit_price)),
            sku: self.sku.unwrap_or_default(),
        })
    }
}

/// Order object as returned by the list and create endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct WireOrder {
    pub id: Option<i64>,
    #[serde(default)]
    pub number: Option<serde_json::Value>,
    pub status: Option<String>,
    #[serde(default)]
    pub billing: WireBilling,
    #[serde(default)]
    pub line_items: Vec<WireLineItem>,
    pub total: Option<WireAmount>,
    pub shipping_total: Option<WireAmount>,
    pub discount_total: Option<WireAmount>,
    pub total_tax: Option<WireAmount>,
    #[serde(default)]
    pub payment_method_title: String,
    #[serde(default)]
    pub payment_method: String,
    pub date_created_gmt: Option<String>,
    pub date_created: Option<String>,
    pub date_modified_gmt: Option<String>,
    pub date_modified: Option<String>,
}

/// First parseable timestamp among the candidates
fn timestamp(candidates: &[&Option<String>]) -> Option<i64> {
    candidates
        .iter()
        .filter_map(|c| c.as_deref())
        .find_map(parse_timestamp_millis)
}

impl WireOrder {
    pub fn into_remote(self) -> Result<RemoteOrder, String> {
        let external_id = match self.id {
            Some(id) if id > 0 => id,
            Some(id) => return Err(format!("invalid order id {id}")),
            None => return Err("missing order id".into()),
        };

        let status = self
            .status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or("missing status")?
            .to_string();

        let total = match &self.total {
            Some(raw) => raw
                .value()
                .ok_or_else(|| format!("total is not a number: {raw:?}"))?,
            None => return Err("missing total".into()),
        };
        if total < 0.0 {
            return Err(format!("negative total {total}"));
        }

        // Prefer the GMT fields; the local ones carry no zone
        let date_modified = timestamp(&[
            &self.date_modified_gmt,
            &self.date_modified,
            &self.date_created_gmt,
            &self.date_created,
        ])
        .ok_or("missing or unparseable modification date")?;
        let date_created = timestamp(&[&self.date_created_gmt, &self.date_created])
            .unwrap_or(date_modified);

        let number = match &self.number {
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => external_id.to_string(),
        };

        let payment_method = if self.payment_method_title.trim().is_empty() {
            self.payment_method.trim().to_string()
        } else {
            self.payment_method_title.trim().to_string()
        };

        let line_items = self
            .line_items
            .into_iter()
            .map(WireLineItem::into_line_item)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RemoteOrder {
            external_id,
            number,
            status,
            customer: self.billing.customer(),
            billing_address: self.billing.address(),
            line_items,
            total: money::to_f64(money::to_decimal(total)),
            shipping_total: amount("shipping_total", &self.shipping_total)?,
            discount_total: amount("discount_total", &self.discount_total)?,
            total_tax: amount("total_tax", &self.total_tax)?,
            payment_method,
            date_created,
            date_modified,
        })
    }
}

/// Validate one raw JSON object from a list page
pub fn parse_order(value: serde_json::Value) -> Result<RemoteOrder, RejectedOrder> {
    let external_id = value.get("id").and_then(serde_json::Value::as_i64);
    serde_json::from_value::<WireOrder>(value)
        .map_err(|e| e.to_string())
        .and_then(WireOrder::into_remote)
        .map_err(|reason| RejectedOrder {
            external_id,
            reason,
        })
}

/// Split a page body into valid orders and rejections
pub fn parse_page(values: Vec<serde_json::Value>) -> (Vec<RemoteOrder>, Vec<RejectedOrder>) {
    let mut orders = Vec::with_capacity(values.len());
    let mut rejected = Vec::new();
    for value in values {
        match parse_order(value) {
            Ok(order) => orders.push(order),
            Err(rejection) => rejected.push(rejection),
        }
    }
    (orders, rejected)
}

/// Money as the platform expects it on write
fn format_amount(value: f64) -> String {
    format!("{:.2}", money::to_f64(money::to_decimal(value)))
}

/// `PUT /orders/{id}` body
#[derive(Debug, Clone, Serialize)]
pub struct WireOrderUpdate {
    pub status: &'static str,
    pub total: String,
    pub billing: WireBilling,
}

impl From<&OrderUpdatePatch> for WireOrderUpdate {
    fn from(patch: &OrderUpdatePatch) -> Self {
        Self {
            status: patch.status.as_str(),
            total: format_amount(patch.total),
            billing: WireBilling::from_parts(&patch.customer, &patch.billing_address),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WireNewLineItem {
    pub product_id: i64,
    pub quantity: i32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sku: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WireShippingLine {
    pub method_id: &'static str,
    pub method_title: &'static str,
    pub total: String,
}

/// `POST /orders` body
#[derive(Debug, Clone, Serialize)]
pub struct WireNewOrder {
    pub status: &'static str,
    pub set_paid: bool,
    pub payment_method_title: String,
    pub billing: WireBilling,
    pub line_items: Vec<WireNewLineItem>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub shipping_lines: Vec<WireShippingLine>,
}

impl From<&NewRemoteOrder> for WireNewOrder {
    fn from(order: &NewRemoteOrder) -> Self {
        let shipping_lines = if money::differs(order.shipping_total, 0.0) {
            vec![WireShippingLine {
                method_id: "flat_rate",
                method_title: "Shipping",
                total: format_amount(order.shipping_total),
            }]
        } else {
            Vec::new()
        };
        Self {
            status: order.status.as_str(),
            set_paid: false,
            payment_method_title: order.payment_method.clone(),
            billing: WireBilling::from_parts(&order.customer, &order.billing_address),
            line_items: order
                .line_items
                .iter()
                .map(|item| WireNewLineItem {
                    product_id: item.product_id,
                    quantity: item.quantity,
                    sku: item.sku.clone(),
                })
                .collect(),
            shipping_lines,
        }
    }
}

/// Error body: `{"code": "...", "message": "..."}`
#[derive(Debug, Deserialize)]
pub struct WireErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Human-readable message from an error response body
pub fn error_message(body: &str) -> String {
    match serde_json::from_str::<WireErrorBody>(body) {
        Ok(err) if !err.message.is_empty() => {
            if err.code.is_empty() {
                err.message
            } else {
                format!("{} ({})", err.message, err.code)
            }
        }
        _ => body.chars().take(200).collect(),
    }
}
