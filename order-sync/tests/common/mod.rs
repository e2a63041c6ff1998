//! Shared fixtures: in-memory gateway, failure-injecting store, order builders

#![allow(dead_code)]

use async_trait::async_trait;
use order_sync::db::{DbService, OrderStore, SqliteOrderStore, StoreError, StoreResult};
use order_sync::remote::{GatewayError, ListOrdersQuery, OrderGateway, OrderPage, RejectedOrder};
use order_sync::sync::{RunSummary, SyncOptions};
use parking_lot::Mutex;
use shared::order::{
    Amounts, BillingAddress, CanonicalStatus, Customer, LineItem, NewOrderRecord, NewRemoteOrder,
    OrderPatch, OrderRecord, OrderUpdatePatch, RemoteOrder,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::time::Duration;

pub fn customer(email: Option<&str>) -> Customer {
    Customer {
        first_name: "Ana".into(),
        last_name: "Ruiz".into(),
        phone: "600000000".into(),
        email: email.map(String::from),
    }
}

/// Remote order with shipping 10.00 and no tax or discount
pub fn remote_order(external_id: i64, status: &str, total: f64, modified: i64) -> RemoteOrder {
    RemoteOrder {
        external_id,
        number: external_id.to_string(),
        status: status.into(),
        customer: customer(Some("ana@example.com")),
        billing_address: BillingAddress {
            address_1: "Calle Mayor 1".into(),
            city: "Valencia".into(),
            country: "ES".into(),
            postcode: "46001".into(),
            ..Default::default()
        },
        line_items: vec![LineItem {
            product_id: 1,
            name: "Mug".into(),
            quantity: 1,
            unit_price: total - 10.0,
            sku: "MUG".into(),
        }],
        total,
        shipping_total: 10.0,
        discount_total: 0.0,
        total_tax: 0.0,
        payment_method: "Credit card".into(),
        date_created: 1_000,
        date_modified: modified,
    }
}

/// Locally entered order, not yet pushed
pub fn local_order(external_id: Option<i64>, email: Option<&str>) -> NewOrderRecord {
    NewOrderRecord {
        external_id,
        order_number: "L-1".into(),
        customer: customer(email),
        billing_address: BillingAddress {
            city: "Madrid".into(),
            ..Default::default()
        },
        line_items: vec![LineItem {
            product_id: 3,
            name: "Teapot".into(),
            quantity: 2,
            unit_price: 25.0,
            sku: "TEA".into(),
        }],
        amounts: Amounts {
            subtotal: 50.0,
            shipping: 5.0,
            discount: 0.0,
            tax: 0.0,
            total: 55.0,
        },
        status: CanonicalStatus::Processing,
        payment_method: "Cash".into(),
        created_at: 1_000,
        updated_at: 2_000,
        is_synced_to_remote: false,
    }
}

/// Options with no delays and no date windows
pub fn test_options(statuses: &[&str]) -> SyncOptions {
    SyncOptions {
        tracked_statuses: statuses.iter().map(|s| s.to_string()).collect(),
        page_size: 10,
        page_delay: Duration::ZERO,
        request_timeout: Duration::from_secs(5),
        worker_concurrency: 4,
        lookback: None,
        fallback_contact_email: "orders@shop.test".into(),
        ..Default::default()
    }
}

pub async fn sqlite_store() -> (DbService, Arc<SqliteOrderStore>) {
    let db = DbService::in_memory().await.expect("in-memory database");
    let store = Arc::new(db.order_store());
    (db, store)
}

/// Scriptable in-memory [`OrderGateway`]
pub struct FakeGateway {
    pages: Mutex<HashMap<String, Vec<Vec<RemoteOrder>>>>,
    rejected: Mutex<HashMap<String, Vec<RejectedOrder>>>,
    list_errors: Mutex<HashMap<String, GatewayError>>,
    push_errors: Mutex<HashMap<i64, GatewayError>>,
    create_error: Mutex<Option<GatewayError>>,
    list_delay: Mutex<Option<Duration>>,
    push_delay: Mutex<Option<Duration>>,
    next_external_id: AtomicI64,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    pub list_calls: Mutex<Vec<ListOrdersQuery>>,
    pub pushed: Mutex<Vec<(i64, OrderUpdatePatch)>>,
    pub created: Mutex<Vec<NewRemoteOrder>>,
}

impl Default for FakeGateway {
    fn default() -> Self {
        Self {
            pages: Mutex::new(HashMap::new()),
            rejected: Mutex::new(HashMap::new()),
            list_errors: Mutex::new(HashMap::new()),
            push_errors: Mutex::new(HashMap::new()),
            create_error: Mutex::new(None),
            list_delay: Mutex::new(None),
            push_delay: Mutex::new(None),
            next_external_id: AtomicI64::new(9_000),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            list_calls: Mutex::new(Vec::new()),
            pushed: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
        }
    }
}

impl FakeGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Replace the pages served for a status
    pub fn set_pages(&self, status: &str, pages: Vec<Vec<RemoteOrder>>) {
        self.pages.lock().insert(status.to_string(), pages);
    }

    pub fn set_orders(&self, status: &str, orders: Vec<RemoteOrder>) {
        self.set_pages(status, vec![orders]);
    }

    /// Rejections reported on page 1 of a status
    pub fn set_rejected(&self, status: &str, rejected: Vec<RejectedOrder>) {
        self.rejected.lock().insert(status.to_string(), rejected);
    }

    pub fn fail_list(&self, status: &str, err: GatewayError) {
        self.list_errors.lock().insert(status.to_string(), err);
    }

    pub fn fail_push(&self, external_id: i64, err: GatewayError) {
        self.push_errors.lock().insert(external_id, err);
    }

    pub fn clear_push_failures(&self) {
        self.push_errors.lock().clear();
    }

    pub fn fail_create(&self, err: GatewayError) {
        *self.create_error.lock() = Some(err);
    }

    pub fn set_list_delay(&self, delay: Duration) {
        *self.list_delay.lock() = Some(delay);
    }

    pub fn set_push_delay(&self, delay: Option<Duration>) {
        *self.push_delay.lock() = delay;
    }

    pub fn list_call_count(&self) -> usize {
        self.list_calls.lock().len()
    }

    /// Highest number of overlapping `list_orders` calls seen
    pub fn max_concurrent_lists(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OrderGateway for FakeGateway {
    async fn list_orders(&self, query: &ListOrdersQuery) -> Result<OrderPage, GatewayError> {
        self.list_calls.lock().push(query.clone());
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        let delay = *self.list_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if let Some(err) = self.list_errors.lock().get(&query.status) {
            return Err(err.clone());
        }

        let pages = self
            .pages
            .lock()
            .get(&query.status)
            .cloned()
            .unwrap_or_default();
        let index = query.page.saturating_sub(1) as usize;
        let orders = pages.get(index).cloned().unwrap_or_default();
        let rejected = if query.page == 1 {
            self.rejected
                .lock()
                .get(&query.status)
                .cloned()
                .unwrap_or_default()
        } else {
            Vec::new()
        };

        Ok(OrderPage {
            orders,
            rejected,
            has_more: (query.page as usize) < pages.len(),
            total_pages: Some(pages.len() as u32),
        })
    }

    async fn push_order_update(
        &self,
        external_id: i64,
        patch: &OrderUpdatePatch,
    ) -> Result<(), GatewayError> {
        let delay = *self.push_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.push_errors.lock().get(&external_id) {
            return Err(err.clone());
        }
        self.pushed.lock().push((external_id, patch.clone()));
        Ok(())
    }

    async fn create_order(&self, order: &NewRemoteOrder) -> Result<RemoteOrder, GatewayError> {
        if let Some(err) = self.create_error.lock().clone() {
            return Err(err);
        }
        self.created.lock().push(order.clone());
        let external_id = self.next_external_id.fetch_add(1, Ordering::SeqCst);
        let mut remote = remote_order(external_id, order.status.as_str(), 0.0, 5_000);
        remote.customer = order.customer.clone();
        Ok(remote)
    }
}

/// SQLite store that can be told to fail
pub struct FlakyStore {
    inner: SqliteOrderStore,
    failing_inserts: Mutex<HashSet<i64>>,
    /// external_id → inserts left that fail with a row-id collision
    colliding_inserts: Mutex<HashMap<i64, u32>>,
    failing_updates: Mutex<HashSet<i64>>,
    unavailable: AtomicBool,
}

impl FlakyStore {
    pub fn new(inner: SqliteOrderStore) -> Arc<Self> {
        Arc::new(Self {
            inner,
            failing_inserts: Mutex::new(HashSet::new()),
            colliding_inserts: Mutex::new(HashMap::new()),
            failing_updates: Mutex::new(HashSet::new()),
            unavailable: AtomicBool::new(false),
        })
    }

    pub fn fail_insert_for(&self, external_id: i64) {
        self.failing_inserts.lock().insert(external_id);
    }

    /// Next `times` inserts for this order hit a primary-key collision
    pub fn collide_inserts_for(&self, external_id: i64, times: u32) {
        self.colliding_inserts.lock().insert(external_id, times);
    }

    pub fn fail_update_for(&self, id: i64) {
        self.failing_updates.lock().insert(id);
    }

    pub fn clear_update_failures(&self) {
        self.failing_updates.lock().clear();
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("pool closed".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for FlakyStore {
    async fn find_by_external_id(&self, external_id: i64) -> StoreResult<Option<OrderRecord>> {
        self.check()?;
        self.inner.find_by_external_id(external_id).await
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<OrderRecord>> {
        self.check()?;
        self.inner.find_by_id(id).await
    }

    async fn insert(&self, order: NewOrderRecord) -> StoreResult<OrderRecord> {
        self.check()?;
        if let Some(external_id) = order.external_id
            && self.failing_inserts.lock().contains(&external_id)
        {
            return Err(StoreError::Database("disk I/O error".into()));
        }
        if let Some(external_id) = order.external_id {
            let mut colliding = self.colliding_inserts.lock();
            if let Some(left) = colliding.get_mut(&external_id)
                && *left > 0
            {
                *left -= 1;
                return Err(StoreError::Duplicate("UNIQUE constraint failed: orders.id".into()));
            }
        }
        self.inner.insert(order).await
    }

    async fn update_fields(&self, id: i64, patch: OrderPatch) -> StoreResult<OrderRecord> {
        self.check()?;
        if self.failing_updates.lock().contains(&id) {
            return Err(StoreError::Database("database is locked".into()));
        }
        self.inner.update_fields(id, patch).await
    }

    async fn delete(&self, id: i64) -> StoreResult<()> {
        self.check()?;
        self.inner.delete(id).await
    }

    async fn list_pending_outbound_sync(&self) -> StoreResult<Vec<OrderRecord>> {
        self.check()?;
        self.inner.list_pending_outbound_sync().await
    }

    async fn save_run_summary(&self, summary: &RunSummary) -> StoreResult<()> {
        self.check()?;
        self.inner.save_run_summary(summary).await
    }

    async fn last_run_summary(&self) -> StoreResult<Option<RunSummary>> {
        self.check()?;
        self.inner.last_run_summary().await
    }
}
