//! Interval-driven sync runs
//!
//! Ticks that land while a run is in progress are skipped. Stopping the
//! scheduler never interrupts a run that already started.

use super::error::SyncError;
use super::orchestrator::SyncOrchestrator;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Handle of a running auto-sync loop
pub struct AutoSyncHandle {
    interval: Duration,
    stop: CancellationToken,
    task: JoinHandle<()>,
}

impl AutoSyncHandle {
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop future ticks
    pub fn stop(&self) {
        self.stop.cancel();
    }

    /// Stop and wait for the loop (and any run it started) to finish
    pub async fn shutdown(self) {
        self.stop.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Auto sync task ended abnormally");
        }
    }
}

/// Spawn the auto-sync loop
///
/// The first run happens one `interval` after spawning. `shutdown` is the
/// process-wide token; it also cancels a run in progress.
pub fn spawn_auto_sync(
    orchestrator: Arc<SyncOrchestrator>,
    interval: Duration,
    shutdown: CancellationToken,
) -> AutoSyncHandle {
    let stop = shutdown.child_token();
    let loop_stop = stop.clone();

    let task = tokio::spawn(async move {
        tracing::info!(interval_secs = interval.as_secs_f64(), "Auto sync enabled");
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await; // skip immediate tick

        loop {
            tokio::select! {
                _ = loop_stop.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if orchestrator.is_running() {
                tracing::debug!("Auto sync tick skipped, run in progress");
                continue;
            }

            match orchestrator.run_with_cancel(shutdown.child_token()).await {
                Ok(result) => {
                    tracing::debug!(run_id = %result.run_id, "Scheduled sync run finished");
                }
                Err(SyncError::AlreadyRunning) => {
                    tracing::debug!("Auto sync tick skipped, run in progress");
                }
                Err(e) => tracing::error!(error = %e, "Scheduled sync run failed"),
            }
        }

        tracing::info!("Auto sync disabled");
    });

    AutoSyncHandle {
        interval,
        stop,
        task,
    }
}
