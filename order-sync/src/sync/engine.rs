//! SyncEngine - trigger surface for the rest of the application
//!
//! Wraps the orchestrator, the outbound pusher and the auto-sync scheduler
//! behind one handle. Cheap to share through `Arc`.

use super::error::SyncError;
use super::options::SyncOptions;
use super::orchestrator::{RunState, SyncOrchestrator};
use super::pusher::{OutboundPusher, PushReport};
use super::scheduler::{AutoSyncHandle, spawn_auto_sync};
use super::summary::{RunResult, RunSummary};
use crate::db::OrderStore;
use crate::remote::OrderGateway;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct SyncEngine {
    orchestrator: Arc<SyncOrchestrator>,
    pusher: Arc<OutboundPusher>,
    auto_sync: Mutex<Option<AutoSyncHandle>>,
    shutdown: CancellationToken,
}

impl SyncEngine {
    /// Build the engine and reload the last persisted run summary
    pub async fn new(
        gateway: Arc<dyn OrderGateway>,
        store: Arc<dyn OrderStore>,
        options: SyncOptions,
    ) -> Self {
        let orchestrator = Arc::new(SyncOrchestrator::new(
            gateway.clone(),
            store.clone(),
            options.clone(),
        ));
        match store.last_run_summary().await {
            Ok(Some(summary)) => {
                tracing::info!(summary = %summary, "Restored last sync run summary");
                orchestrator.restore_last_summary(summary);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Failed to load last sync run summary"),
        }

        Self {
            orchestrator,
            pusher: Arc::new(OutboundPusher::new(gateway, store, options)),
            auto_sync: Mutex::new(None),
            shutdown: CancellationToken::new(),
        }
    }

    /// Run a sync pass now; `AlreadyRunning` if one is in progress
    pub async fn run_sync_now(&self) -> Result<RunResult, SyncError> {
        self.orchestrator
            .run_with_cancel(self.shutdown.child_token())
            .await
    }

    /// Start (or restart with a new interval) periodic sync runs
    pub fn enable_auto_sync(&self, interval: Duration) {
        let handle = spawn_auto_sync(self.orchestrator.clone(), interval, self.shutdown.clone());
        if let Some(previous) = self.auto_sync.lock().replace(handle) {
            previous.stop();
        }
    }

    /// Stop periodic runs; a run already in progress finishes normally
    pub fn disable_auto_sync(&self) {
        if let Some(handle) = self.auto_sync.lock().take() {
            handle.stop();
        }
    }

    pub fn auto_sync_interval(&self) -> Option<Duration> {
        self.auto_sync
            .lock()
            .as_ref()
            .filter(|h| !h.is_finished())
            .map(AutoSyncHandle::interval)
    }

    pub fn get_last_run_summary(&self) -> Option<RunSummary> {
        self.orchestrator.last_summary()
    }

    /// One summary per finished run
    pub fn subscribe(&self) -> broadcast::Receiver<RunSummary> {
        self.orchestrator.subscribe()
    }

    pub async fn push_pending(&self) -> Result<PushReport, SyncError> {
        self.pusher.push_pending().await
    }

    /// Spawn a loop that pushes pending local edits every `interval`
    pub fn spawn_periodic_push(&self, interval: Duration) -> JoinHandle<()> {
        let pusher = self.pusher.clone();
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            ticker.tick().await; // skip immediate tick
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                match pusher.push_pending().await {
                    Ok(report) if report.aborted.is_some() => {
                        tracing::warn!(reason = ?report.aborted, "Periodic push aborted");
                    }
                    Ok(_) => {}
                    Err(SyncError::AlreadyRunning) => {
                        tracing::debug!("Previous push pass still running, tick skipped");
                    }
                    Err(e) => tracing::error!(error = %e, "Periodic push failed"),
                }
            }
        })
    }

    /// Request cancellation of the run in progress
    pub fn cancel_current_run(&self) -> bool {
        self.orchestrator.cancel_current_run()
    }

    pub fn state(&self) -> RunState {
        self.orchestrator.state()
    }

    pub fn is_running(&self) -> bool {
        self.orchestrator.is_running()
    }

    /// Stop background loops and cancel any run in progress
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let handle = self.auto_sync.lock().take();
        if let Some(handle) = handle {
            handle.shutdown().await;
        }
    }
}
