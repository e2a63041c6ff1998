//! Sync Orchestrator
//!
//! Drives one reconciliation pass:
//!
//! ```text
//! for status in tracked_statuses          (sequential)
//!   for window in date_windows            (sequential)
//!     page 1..n until has_more == false   (sleep page_delay between pages)
//!       records of the page               (buffer_unordered(worker_concurrency))
//!         find_by_external_id → reconcile → insert | update_fields | skip
//! ```
//!
//! A single bad record never aborts the run. Credential rejection, an
//! unreachable datastore and cancellation do, ending the run as `Failed`
//! with the counters gathered so far.

use super::error::{RecordError, RecordErrorKind, SyncError};
use super::guard::RunGuard;
use super::options::SyncOptions;
use super::reconciler::{self, Action};
use super::summary::{RunOutcome, RunResult, RunSummary, RunTally};
use crate::db::{OrderStore, StoreError};
use crate::remote::{GatewayError, ListOrdersQuery, OrderGateway};
use crate::utils::money;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::StreamExt;
use parking_lot::{Mutex, RwLock};
use shared::order::{OrderRecord, RemoteOrder};
use shared::util::now_millis;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Summaries kept for slow subscribers
const SUMMARY_CHANNEL_CAPACITY: usize = 16;

/// Orchestrator lifecycle: `Idle → Running → (Completed | Failed)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RunState {
    Idle = 0,
    Running = 1,
    Completed = 2,
    Failed = 3,
}

impl RunState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => RunState::Running,
            2 => RunState::Completed,
            3 => RunState::Failed,
            _ => RunState::Idle,
        }
    }
}

/// Publishes the run as active; on drop (normal end or a dropped future)
/// clears the cancel token and never leaves the state at `Running`
struct ActiveRun<'a> {
    orchestrator: &'a SyncOrchestrator,
}

impl<'a> ActiveRun<'a> {
    fn begin(orchestrator: &'a SyncOrchestrator, cancel: CancellationToken) -> Self {
        *orchestrator.current_cancel.lock() = Some(cancel);
        orchestrator
            .state
            .store(RunState::Running as u8, Ordering::Release);
        Self { orchestrator }
    }
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        *self.orchestrator.current_cancel.lock() = None;
        // Still Running here means the run was abandoned before finishing
        if self
            .orchestrator
            .state
            .compare_exchange(
                RunState::Running as u8,
                RunState::Failed as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
        {
            tracing::warn!("Sync run dropped before completion");
        }
    }
}

/// State of one run shared by its workers
struct RunContext {
    tally: RunTally,
    errors: Mutex<Vec<RecordError>>,
    /// external_id → newest date_modified handled in this run
    seen: DashMap<i64, i64>,
    cancel: CancellationToken,
}

impl RunContext {
    fn record_error(&self, error: RecordError) {
        tracing::warn!(
            external_id = ?error.external_id,
            local_id = ?error.local_id,
            kind = ?error.kind,
            error = %error.message,
            "Record failed during sync"
        );
        self.tally.error();
        self.errors.lock().push(error);
    }
}

pub struct SyncOrchestrator {
    gateway: Arc<dyn OrderGateway>,
    store: Arc<dyn OrderStore>,
    options: SyncOptions,
    running: AtomicBool,
    state: AtomicU8,
    /// Cancellation token of the run in progress
    current_cancel: Mutex<Option<CancellationToken>>,
    last_summary: RwLock<Option<RunSummary>>,
    summary_tx: broadcast::Sender<RunSummary>,
}

impl SyncOrchestrator {
    pub fn new(
        gateway: Arc<dyn OrderGateway>,
        store: Arc<dyn OrderStore>,
        options: SyncOptions,
    ) -> Self {
        let (summary_tx, _) = broadcast::channel(SUMMARY_CHANNEL_CAPACITY);
        Self {
            gateway,
            store,
            options,
            running: AtomicBool::new(false),
            state: AtomicU8::new(RunState::Idle as u8),
            current_cancel: Mutex::new(None),
            last_summary: RwLock::new(None),
            summary_tx,
        }
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    pub fn state(&self) -> RunState {
        RunState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn last_summary(&self) -> Option<RunSummary> {
        self.last_summary.read().clone()
    }

    /// Seed the last summary (loaded from storage at startup)
    pub fn restore_last_summary(&self, summary: RunSummary) {
        let mut last = self.last_summary.write();
        if last.is_none() {
            *last = Some(summary);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunSummary> {
        self.summary_tx.subscribe()
    }

    /// Request cancellation of the run in progress
    ///
    /// Returns `false` when no run is active.
    pub fn cancel_current_run(&self) -> bool {
        match self.current_cancel.lock().as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Run one reconciliation pass
    ///
    /// Fails only with [`SyncError::AlreadyRunning`]; every other failure is
    /// reported through [`RunResult::outcome`].
    pub async fn run(&self) -> Result<RunResult, SyncError> {
        self.run_with_cancel(CancellationToken::new()).await
    }

    /// Run with an external cancellation token (e.g. process shutdown)
    pub async fn run_with_cancel(&self, cancel: CancellationToken) -> Result<RunResult, SyncError> {
        let Some(_guard) = RunGuard::acquire(&self.running) else {
            tracing::debug!("Sync run requested while another is in progress");
            return Err(SyncError::AlreadyRunning);
        };

        // Dropped before `_guard`, so the state settles before the flag is released
        let _active = ActiveRun::begin(self, cancel.clone());
        let run_id = uuid::Uuid::new_v4().to_string();
        let started_at = now_millis();

        let span = tracing::info_span!("sync_run", run_id = %run_id);
        span.in_scope(|| {
            tracing::info!(
                statuses = ?self.options.tracked_statuses,
                "Sync run started"
            )
        });

        let ctx = RunContext {
            tally: RunTally::default(),
            errors: Mutex::new(Vec::new()),
            seen: DashMap::new(),
            cancel,
        };

        let fatal = self.run_buckets(&ctx).instrument(span).await.err();

        *self.current_cancel.lock() = None;
        let counters = ctx.tally.snapshot();
        let outcome = match &fatal {
            None => RunOutcome::Completed,
            Some(e) => RunOutcome::Failed {
                reason: e.to_string(),
            },
        };
        let result = RunResult {
            run_id,
            started_at,
            finished_at: now_millis(),
            outcome,
            counters,
            errors: ctx.errors.into_inner(),
            fatal_error: fatal,
        };

        let summary = result.summary();
        match &result.fatal_error {
            None => tracing::info!(run_id = %result.run_id, summary = %summary, "Sync run completed"),
            Some(e) => tracing::error!(
                run_id = %result.run_id,
                summary = %summary,
                error = %e,
                "Sync run failed"
            ),
        }

        if let Err(e) = self.store.save_run_summary(&summary).await {
            tracing::warn!(error = %e, "Failed to persist sync run summary");
        }
        *self.last_summary.write() = Some(summary.clone());
        // No subscribers is fine
        let _ = self.summary_tx.send(summary);

        let state = if result.outcome.is_completed() {
            RunState::Completed
        } else {
            RunState::Failed
        };
        self.state.store(state as u8, Ordering::Release);

        Ok(result)
    }

    /// Walk every status bucket and date window; `Err` ends the run
    async fn run_buckets(&self, ctx: &RunContext) -> Result<(), SyncError> {
        let windows = self.options.date_windows(now_millis());

        for status in &self.options.tracked_statuses {
            for &(date_from, date_to) in &windows {
                self.drain_bucket(ctx, status, date_from, date_to).await?;
            }
        }
        Ok(())
    }

    /// Page through one (status, window) bucket until the remote reports no more
    async fn drain_bucket(
        &self,
        ctx: &RunContext,
        status: &str,
        date_from: Option<i64>,
        date_to: Option<i64>,
    ) -> Result<(), SyncError> {
        let mut page = 1;
        loop {
            if ctx.cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }

            let query = ListOrdersQuery {
                status: status.to_string(),
                date_from,
                date_to,
                page,
                per_page: self.options.page_size,
            };
            let result = match self.call(self.gateway.list_orders(&query)).await {
                Ok(result) => result,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    // Transport failure: abandon this bucket, keep the run going
                    ctx.record_error(RecordError::new(
                        RecordErrorKind::Transport,
                        None,
                        None,
                        format!("listing '{status}' page {page} failed: {e}"),
                    ));
                    return Ok(());
                }
            };

            tracing::debug!(
                status = %status,
                page,
                orders = result.orders.len(),
                rejected = result.rejected.len(),
                has_more = result.has_more,
                "Fetched order page"
            );

            for rejected in result.rejected {
                ctx.record_error(RecordError::new(
                    RecordErrorKind::InvalidPayload,
                    rejected.external_id,
                    None,
                    rejected.reason,
                ));
            }

            self.process_page(ctx, result.orders).await?;

            if !result.has_more {
                return Ok(());
            }
            page += 1;

            tokio::select! {
                _ = ctx.cancel.cancelled() => return Err(SyncError::Cancelled),
                _ = tokio::time::sleep(self.options.page_delay) => {}
            }
        }
    }

    /// Reconcile one page with bounded concurrency
    async fn process_page(&self, ctx: &RunContext, orders: Vec<RemoteOrder>) -> Result<(), SyncError> {
        // Duplicates within a page collapse to the newest copy
        let mut newest: HashMap<i64, usize> = HashMap::with_capacity(orders.len());
        let mut keep = vec![true; orders.len()];
        for (idx, order) in orders.iter().enumerate() {
            match newest.get(&order.external_id).copied() {
                Some(prev) if orders[prev].date_modified >= order.date_modified => {
                    keep[idx] = false;
                }
                Some(prev) => {
                    keep[prev] = false;
                    newest.insert(order.external_id, idx);
                }
                None => {
                    newest.insert(order.external_id, idx);
                }
            }
        }

        let mut unique = Vec::with_capacity(newest.len());
        for (order, kept) in orders.into_iter().zip(keep) {
            if kept {
                unique.push(order);
            } else {
                ctx.tally.skipped();
            }
        }

        let results: Vec<Result<(), SyncError>> = futures::stream::iter(unique)
            .map(|order| self.process_record(ctx, order))
            .buffer_unordered(self.options.worker_concurrency.max(1))
            .collect()
            .await;

        results.into_iter().collect()
    }

    /// Handle one remote order; `Err` only for run-fatal errors
    async fn process_record(&self, ctx: &RunContext, remote: RemoteOrder) -> Result<(), SyncError> {
        // Cancellation is checked between records, never mid-write
        if ctx.cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        // Same order seen earlier in this run (e.g. it moved between buckets)
        match ctx.seen.entry(remote.external_id) {
            Entry::Occupied(seen) if *seen.get() >= remote.date_modified => {
                ctx.tally.skipped();
                return Ok(());
            }
            Entry::Occupied(mut seen) => {
                seen.insert(remote.date_modified);
            }
            Entry::Vacant(slot) => {
                slot.insert(remote.date_modified);
            }
        }

        let local = match self.store.find_by_external_id(remote.external_id).await {
            Ok(local) => local,
            Err(e) => return self.store_failure(ctx, e, Some(remote.external_id), None),
        };

        let action = reconciler::reconcile(&remote, local.as_ref(), now_millis());
        match self.apply(ctx, &remote, action).await {
            Err(StoreError::Duplicate(_)) => {
                // Unique key taken: retry once against whatever holds the external_id now
                let existing = match self.store.find_by_external_id(remote.external_id).await {
                    Ok(existing) => existing,
                    Err(e) => return self.store_failure(ctx, e, Some(remote.external_id), None),
                };
                // None: the collision was on another key (row id), so this inserts again
                let retry = reconciler::reconcile(&remote, existing.as_ref(), now_millis());
                match self.apply(ctx, &remote, retry).await {
                    Ok(()) => Ok(()),
                    Err(e) => self.store_failure(
                        ctx,
                        e,
                        Some(remote.external_id),
                        existing.map(|r| r.id),
                    ),
                }
            }
            Err(e) => self.store_failure(ctx, e, Some(remote.external_id), local.map(|r| r.id)),
            Ok(()) => Ok(()),
        }
    }

    /// Write the reconciliation decision and count it
    async fn apply(&self, ctx: &RunContext, remote: &RemoteOrder, action: Action) -> Result<(), StoreError> {
        match action {
            Action::Create(new_order) => {
                let record = self.store.insert(new_order).await?;
                warn_if_inconsistent(&record);
                tracing::debug!(
                    external_id = remote.external_id,
                    local_id = record.id,
                    status = %record.status,
                    "Imported remote order"
                );
                ctx.tally.created();
            }
            Action::Update { id, patch } => {
                let record = self.store.update_fields(id, patch).await?;
                warn_if_inconsistent(&record);
                tracing::debug!(
                    external_id = remote.external_id,
                    local_id = id,
                    status = %record.status,
                    "Updated local order from remote"
                );
                ctx.tally.updated();
            }
            Action::Skip(_) => ctx.tally.skipped(),
        }
        Ok(())
    }

    /// Fatal storage errors end the run; anything else is recorded per record
    fn store_failure(
        &self,
        ctx: &RunContext,
        err: StoreError,
        external_id: Option<i64>,
        local_id: Option<i64>,
    ) -> Result<(), SyncError> {
        if err.is_fatal() {
            return Err(SyncError::Storage(err));
        }
        ctx.record_error(RecordError::from_sync_error(
            &SyncError::Storage(err),
            external_id,
            local_id,
        ));
        Ok(())
    }

    /// Bound a gateway call by the request timeout
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

fn warn_if_inconsistent(record: &OrderRecord) {
    if !money::amounts_consistent(&record.amounts) {
        tracing::warn!(
            local_id = record.id,
            external_id = ?record.external_id,
            subtotal = record.amounts.subtotal,
            shipping = record.amounts.shipping,
            tax = record.amounts.tax,
            discount = record.amounts.discount,
            total = record.amounts.total,
            "Order amounts do not add up"
        );
    }
}
