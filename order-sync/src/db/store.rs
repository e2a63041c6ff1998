//! Local Order Store
//!
//! [`OrderStore`] is the seam the sync engine writes through. The SQLite
//! implementation delegates to the repository functions; tests substitute
//! their own implementations to inject failures.

use super::repository::{self, StoreResult};
use crate::sync::RunSummary;
use async_trait::async_trait;
use shared::order::{NewOrderRecord, OrderPatch, OrderRecord};
use sqlx::SqlitePool;

/// Durable order storage used by the reconciler and the outbound pusher
///
/// Every write touches exactly one record.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn find_by_external_id(&self, external_id: i64) -> StoreResult<Option<OrderRecord>>;

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<OrderRecord>>;

    /// Insert a new order; fails with `Duplicate` when `external_id` is taken
    async fn insert(&self, order: NewOrderRecord) -> StoreResult<OrderRecord>;

    async fn update_fields(&self, id: i64, patch: OrderPatch) -> StoreResult<OrderRecord>;

    /// Remove a record; fails with `NotFound` when the id is unknown
    async fn delete(&self, id: i64) -> StoreResult<()>;

    /// `is_synced_to_remote = false OR sync_error IS NOT NULL`
    async fn list_pending_outbound_sync(&self) -> StoreResult<Vec<OrderRecord>>;

    async fn save_run_summary(&self, summary: &RunSummary) -> StoreResult<()>;

    async fn last_run_summary(&self) -> StoreResult<Option<RunSummary>>;
}

/// SQLite-backed [`OrderStore`]
#[derive(Clone)]
pub struct SqliteOrderStore {
    pool: SqlitePool,
}

impl SqliteOrderStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl OrderStore for SqliteOrderStore {
    async fn find_by_external_id(&self, external_id: i64) -> StoreResult<Option<OrderRecord>> {
        repository::order::find_by_external_id(&self.pool, external_id).await
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<OrderRecord>> {
        repository::order::find_by_id(&self.pool, id).await
    }

    async fn insert(&self, order: NewOrderRecord) -> StoreResult<OrderRecord> {
        repository::order::insert(&self.pool, order).await
    }

    async fn update_fields(&self, id: i64, patch: OrderPatch) -> StoreResult<OrderRecord> {
        repository::order::update_fields(&self.pool, id, &patch).await
    }

    async fn delete(&self, id: i64) -> StoreResult<()> {
        repository::order::delete(&self.pool, id).await
    }

    async fn list_pending_outbound_sync(&self) -> StoreResult<Vec<OrderRecord>> {
        repository::order::list_pending_outbound_sync(&self.pool).await
    }

    async fn save_run_summary(&self, summary: &RunSummary) -> StoreResult<()> {
        repository::sync_run::insert(&self.pool, summary).await
    }

    async fn last_run_summary(&self) -> StoreResult<Option<RunSummary>> {
        repository::sync_run::find_latest(&self.pool).await
    }
}
