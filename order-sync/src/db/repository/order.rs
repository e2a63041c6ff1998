//! Order Repository

use super::{StoreError, StoreResult};
use shared::order::{
    Amounts, BillingAddress, CanonicalStatus, Customer, LineItem, NewOrderRecord, OrderPatch,
    OrderRecord,
};
use sqlx::SqlitePool;

const ORDER_SELECT: &str = "SELECT id, external_id, order_number, customer_first_name, customer_last_name, customer_phone, customer_email, billing_address_1, billing_address_2, billing_city, billing_state, billing_country, billing_postcode, line_items, subtotal, shipping, discount, tax, total, status, payment_method, created_at, updated_at, is_synced_to_remote, last_sync_attempt, sync_error FROM orders";

/// Flat row as stored in `orders`
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i64,
    external_id: Option<i64>,
    order_number: String,
    customer_first_name: String,
    customer_last_name: String,
    customer_phone: String,
    customer_email: Option<String>,
    billing_address_1: String,
    billing_address_2: String,
    billing_city: String,
    billing_state: String,
    billing_country: String,
    billing_postcode: String,
    line_items: String,
    subtotal: f64,
    shipping: f64,
    discount: f64,
    tax: f64,
    total: f64,
    status: String,
    payment_method: String,
    created_at: i64,
    updated_at: i64,
    is_synced_to_remote: bool,
    last_sync_attempt: Option<i64>,
    sync_error: Option<String>,
}

impl OrderRow {
    fn into_record(self) -> StoreResult<OrderRecord> {
        let status: CanonicalStatus = self
            .status
            .parse()
            .map_err(|e| StoreError::Serialization(format!("order {}: {e}", self.id)))?;
        let line_items: Vec<LineItem> = serde_json::from_str(&self.line_items)?;

        Ok(OrderRecord {
            id: self.id,
            external_id: self.external_id,
            order_number: self.order_number,
            customer: Customer {
                first_name: self.customer_first_name,
                last_name: self.customer_last_name,
                phone: self.customer_phone,
                email: self.customer_email,
            },
            billing_address: BillingAddress {
                address_1: self.billing_address_1,
                address_2: self.billing_address_2,
                city: self.billing_city,
                state: self.billing_state,
                country: self.billing_country,
                postcode: self.billing_postcode,
            },
            line_items,
            amounts: Amounts {
                subtotal: self.subtotal,
                shipping: self.shipping,
                discount: self.discount,
                tax: self.tax,
                total: self.total,
            },
            status,
            payment_method: self.payment_method,
            created_at: self.created_at,
            updated_at: self.updated_at,
            is_synced_to_remote: self.is_synced_to_remote,
            last_sync_attempt: self.last_sync_attempt,
            sync_error: self.sync_error,
        })
    }
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> StoreResult<Option<OrderRecord>> {
    let row = sqlx::query_as::<_, OrderRow>(&format!("{ORDER_SELECT} WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.map(OrderRow::into_record).transpose()
}

pub async fn find_by_external_id(
    pool: &SqlitePool,
    external_id: i64,
) -> StoreResult<Option<OrderRecord>> {
    let row = sqlx::query_as::<_, OrderRow>(&format!("{ORDER_SELECT} WHERE external_id = ?"))
        .bind(external_id)
        .fetch_optional(pool)
        .await?;
    row.map(OrderRow::into_record).transpose()
}

/// Orders the outbound pusher still has to deliver, oldest edit first
pub async fn list_pending_outbound_sync(pool: &SqlitePool) -> StoreResult<Vec<OrderRecord>> {
    let rows = sqlx::query_as::<_, OrderRow>(&format!(
        "{ORDER_SELECT} WHERE is_synced_to_remote = 0 OR sync_error IS NOT NULL ORDER BY updated_at ASC, id ASC"
    ))
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(OrderRow::into_record).collect()
}

/// Insert a new order with a fresh snowflake ID
///
/// A second order with the same `external_id` fails with [`StoreError::Duplicate`].
pub async fn insert(pool: &SqlitePool, data: NewOrderRecord) -> StoreResult<OrderRecord> {
    let id = shared::util::snowflake_id();
    let line_items = serde_json::to_string(&data.line_items)?;

    sqlx::query(
        "INSERT INTO orders (id, external_id, order_number, customer_first_name, customer_last_name, customer_phone, customer_email, billing_address_1, billing_address_2, billing_city, billing_state, billing_country, billing_postcode, line_items, subtotal, shipping, discount, tax, total, status, payment_method, created_at, updated_at, is_synced_to_remote) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24)",
    )
    .bind(id)
    .bind(data.external_id)
    .bind(&data.order_number)
    .bind(&data.customer.first_name)
    .bind(&data.customer.last_name)
    .bind(&data.customer.phone)
    .bind(data.customer.email.as_deref())
    .bind(&data.billing_address.address_1)
    .bind(&data.billing_address.address_2)
    .bind(&data.billing_address.city)
    .bind(&data.billing_address.state)
    .bind(&data.billing_address.country)
    .bind(&data.billing_address.postcode)
    .bind(&line_items)
    .bind(data.amounts.subtotal)
    .bind(data.amounts.shipping)
    .bind(data.amounts.discount)
    .bind(data.amounts.tax)
    .bind(data.amounts.total)
    .bind(data.status.as_str())
    .bind(&data.payment_method)
    .bind(data.created_at)
    .bind(data.updated_at)
    .bind(data.is_synced_to_remote)
    .execute(pool)
    .await
    .map_err(|e| match StoreError::from(e) {
        StoreError::Duplicate(_) => StoreError::Duplicate(format!(
            "order with external_id {:?} already exists",
            data.external_id
        )),
        other => other,
    })?;

    Ok(data.into_record(id))
}

/// Apply a partial update; unset fields keep their stored value
pub async fn update_fields(
    pool: &SqlitePool,
    id: i64,
    patch: &OrderPatch,
) -> StoreResult<OrderRecord> {
    let rows = sqlx::query(
        "UPDATE orders SET external_id = COALESCE(?1, external_id), status = COALESCE(?2, status), subtotal = COALESCE(?3, subtotal), shipping = COALESCE(?4, shipping), discount = COALESCE(?5, discount), tax = COALESCE(?6, tax), total = COALESCE(?7, total), payment_method = COALESCE(?8, payment_method), customer_email = COALESCE(?9, customer_email), updated_at = COALESCE(?10, updated_at), is_synced_to_remote = COALESCE(?11, is_synced_to_remote), last_sync_attempt = COALESCE(?12, last_sync_attempt), sync_error = CASE WHEN ?13 THEN ?14 ELSE sync_error END WHERE id = ?15",
    )
    .bind(patch.external_id)
    .bind(patch.status.map(|s| s.as_str()))
    .bind(patch.subtotal)
    .bind(patch.shipping)
    .bind(patch.discount)
    .bind(patch.tax)
    .bind(patch.total)
    .bind(patch.payment_method.as_deref())
    .bind(patch.customer_email.as_deref())
    .bind(patch.updated_at)
    .bind(patch.is_synced_to_remote)
    .bind(patch.last_sync_attempt)
    .bind(patch.sync_error.is_some())
    .bind(patch.sync_error.clone().flatten())
    .bind(id)
    .execute(pool)
    .await?;

    if rows.rows_affected() == 0 {
        return Err(StoreError::NotFound(format!("Order {id} not found")));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("Order {id} not found")))
}

pub async fn delete(pool: &SqlitePool, id: i64) -> StoreResult<()> {
    let rows = sqlx::query("DELETE FROM orders WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    if rows.rows_affected() == 0 {
        return Err(StoreError::NotFound(format!("Order {id} not found")));
    }
    Ok(())
}
