//! Outbound Pusher
//!
//! Sends local edits back to the remote platform. Each pending record is
//! pushed independently; a failure is stored on the record (`sync_error`)
//! and retried on the next pass. Credential rejection stops the pass.
//!
//! A local-only order is created remotely at most once per process: the id
//! returned by the remote is remembered until the local row records it.

use super::error::{RecordError, SyncError};
use super::guard::RunGuard;
use super::options::SyncOptions;
use crate::db::{OrderStore, StoreError};
use crate::remote::{GatewayError, OrderGateway};
use crate::utils::contact::repair_customer_email;
use crate::utils::logger::AUDIT_TARGET;
use parking_lot::Mutex;
use serde::Serialize;
use shared::order::{NewRemoteOrder, OrderPatch, OrderRecord, OrderUpdatePatch};
use shared::util::now_millis;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// Outcome of one push pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PushReport {
    /// Existing remote orders updated
    pub pushed: u32,
    /// Local-only orders created remotely
    pub exported: u32,
    /// Local-only orders left alone (export disabled)
    pub skipped: u32,
    pub failed: u32,
    pub errors: Vec<RecordError>,
    /// Set when the pass stopped early
    pub aborted: Option<String>,
}

/// What happened to one record
enum PushOutcome {
    Pushed,
    Exported(i64),
    Skipped,
}

pub struct OutboundPusher {
    gateway: Arc<dyn OrderGateway>,
    store: Arc<dyn OrderStore>,
    options: SyncOptions,
    running: AtomicBool,
    /// local id → external id created remotely but not yet stored locally
    exported: Mutex<HashMap<i64, i64>>,
}

impl OutboundPusher {
    pub fn new(
        gateway: Arc<dyn OrderGateway>,
        store: Arc<dyn OrderStore>,
        options: SyncOptions,
    ) -> Self {
        Self {
            gateway,
            store,
            options,
            running: AtomicBool::new(false),
            exported: Mutex::new(HashMap::new()),
        }
    }

    /// Push every record awaiting outbound sync
    ///
    /// Fails with `AlreadyRunning` when another pass is active and with
    /// `Storage` when the pending list cannot be read or the datastore
    /// becomes unavailable mid-pass.
    pub async fn push_pending(&self) -> Result<PushReport, SyncError> {
        let Some(_guard) = RunGuard::acquire(&self.running) else {
            return Err(SyncError::AlreadyRunning);
        };
        self.push_all().await
    }

    async fn push_all(&self) -> Result<PushReport, SyncError> {
        let pending = self.store.list_pending_outbound_sync().await?;
        let mut report = PushReport::default();
        if pending.is_empty() {
            return Ok(report);
        }
        tracing::info!(count = pending.len(), "Pushing pending local orders");

        for record in pending {
            match self.push_one(&record).await {
                Ok(PushOutcome::Pushed) => report.pushed += 1,
                Ok(PushOutcome::Exported(external_id)) => {
                    tracing::info!(
                        local_id = record.id,
                        external_id,
                        "Local order exported to remote"
                    );
                    report.exported += 1;
                }
                Ok(PushOutcome::Skipped) => report.skipped += 1,
                Err(e) => {
                    self.mark_failed(&record, &e).await?;
                    report.failed += 1;
                    report
                        .errors
                        .push(RecordError::from_sync_error(&e, record.external_id, Some(record.id)));

                    if e.is_fatal() {
                        tracing::error!(error = %e, "Outbound push aborted");
                        report.aborted = Some(e.to_string());
                        break;
                    }
                }
            }
        }

        tracing::info!(
            pushed = report.pushed,
            exported = report.exported,
            skipped = report.skipped,
            failed = report.failed,
            "Outbound push finished"
        );
        Ok(report)
    }

    async fn push_one(&self, record: &OrderRecord) -> Result<PushOutcome, SyncError> {
        let (customer, substituted) =
            repair_customer_email(&record.customer, &self.options.fallback_contact_email);
        if substituted {
            tracing::info!(
                local_id = record.id,
                external_id = ?record.external_id,
                "Customer email missing or malformed, using fallback contact"
            );
        }

        let Some(external_id) = record.external_id else {
            if !self.options.export_new_orders {
                return Ok(PushOutcome::Skipped);
            }
            let known = self.exported.lock().get(&record.id).copied();
            let external_id = match known {
                Some(external_id) => external_id,
                None => {
                    let order = NewRemoteOrder {
                        status: record.status,
                        customer,
                        billing_address: record.billing_address.clone(),
                        line_items: record.line_items.clone(),
                        shipping_total: record.amounts.shipping,
                        payment_method: record.payment_method.clone(),
                    };
                    let created = self.call(self.gateway.create_order(&order)).await?;
                    self.exported.lock().insert(record.id, created.external_id);
                    created.external_id
                }
            };
            self.link_export(record, external_id).await?;
            self.exported.lock().remove(&record.id);
            audit_push(record, external_id, "exported");
            return Ok(PushOutcome::Exported(external_id));
        };

        let patch = OrderUpdatePatch {
            status: record.status,
            total: record.amounts.total,
            customer,
            billing_address: record.billing_address.clone(),
        };
        self.call(self.gateway.push_order_update(external_id, &patch))
            .await?;
        self.mark_synced(record, None).await?;
        audit_push(record, external_id, "pushed");
        Ok(PushOutcome::Pushed)
    }

    /// Store the remote id on the exported record
    ///
    /// When an inbound run already imported the new remote order, that row
    /// represents it and the local-only copy is removed.
    async fn link_export(&self, record: &OrderRecord, external_id: i64) -> Result<(), StoreError> {
        match self.mark_synced(record, Some(external_id)).await {
            Err(StoreError::Duplicate(reason)) => {
                let Some(imported) = self.store.find_by_external_id(external_id).await? else {
                    return Err(StoreError::Duplicate(reason));
                };
                self.store.delete(record.id).await?;
                tracing::info!(
                    target: AUDIT_TARGET,
                    event = "outbound_push",
                    result = "merged",
                    local_id = record.id,
                    imported_id = imported.id,
                    external_id,
                    "Exported order already imported, local copy removed"
                );
                Ok(())
            }
            other => other,
        }
    }

    async fn mark_synced(&self, record: &OrderRecord, external_id: Option<i64>) -> Result<(), StoreError> {
        self.store
            .update_fields(
                record.id,
                OrderPatch {
                    external_id,
                    is_synced_to_remote: Some(true),
                    last_sync_attempt: Some(now_millis()),
                    sync_error: Some(None),
                    ..Default::default()
                },
            )
            .await
            .map(|_| ())
    }

    /// Store the failure on the record; only a fatal storage error propagates
    async fn mark_failed(&self, record: &OrderRecord, err: &SyncError) -> Result<(), SyncError> {
        tracing::warn!(
            target: AUDIT_TARGET,
            event = "outbound_push",
            result = "failed",
            local_id = record.id,
            external_id = ?record.external_id,
            error = %err,
            "Outbound push failed"
        );
        if let SyncError::Storage(store_err) = err
            && store_err.is_fatal()
        {
            return Err(err.clone());
        }

        let patch = OrderPatch {
            last_sync_attempt: Some(now_millis()),
            sync_error: Some(Some(err.to_string())),
            ..Default::default()
        };
        match self.store.update_fields(record.id, patch).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_fatal() => Err(SyncError::Storage(e)),
            Err(e) => {
                tracing::warn!(local_id = record.id, error = %e, "Failed to record push error");
                Ok(())
            }
        }
    }

    async fn call<T, F>(&self, fut: F) -> Result<T, SyncError>
    where
        F: Future<Output = Result<T, GatewayError>>,
    {
        match tokio::time::timeout(self.options.request_timeout, fut).await {
            Ok(result) => result.map_err(SyncError::from),
            Err(_) => Err(SyncError::Transport(format!(
                "remote call timed out after {}ms",
                self.options.request_timeout.as_millis()
            ))),
        }
    }
}

fn audit_push(record: &OrderRecord, external_id: i64, result: &str) {
    tracing::info!(
        target: AUDIT_TARGET,
        event = "outbound_push",
        result,
        local_id = record.id,
        external_id,
        status = %record.status,
        total = record.amounts.total,
        "Outbound push succeeded"
    );
}
