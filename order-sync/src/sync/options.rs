//! Run parameters shared by the orchestrator and the pusher

use crate::core::config::DEFAULT_TRACKED_STATUSES;
use std::time::Duration;

const DAY_MILLIS: i64 = 86_400_000;

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Status buckets, fetched in this order
    pub tracked_statuses: Vec<String>,
    pub page_size: u32,
    /// Pause between page requests
    pub page_delay: Duration,
    /// Upper bound on every gateway call
    pub request_timeout: Duration,
    /// Records of one page processed concurrently
    pub worker_concurrency: usize,
    /// How far back to list orders; `None` lists without date bounds
    pub lookback: Option<Duration>,
    /// Width of one date window inside the lookback period
    pub window: Duration,
    pub fallback_contact_email: String,
    /// Create local-only orders on the remote platform when pushing
    pub export_new_orders: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            tracked_statuses: DEFAULT_TRACKED_STATUSES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            page_size: 100,
            page_delay: Duration::from_millis(500),
            request_timeout: Duration::from_secs(30),
            worker_concurrency: 4,
            lookback: None,
            window: Duration::from_millis(7 * DAY_MILLIS as u64),
            fallback_contact_email: "orders@localhost.localdomain".into(),
            export_new_orders: false,
        }
    }
}

/// Date window `[from, to)` in Unix millis; `None` is unbounded
pub type DateWindow = (Option<i64>, Option<i64>);

impl SyncOptions {
    /// Split the lookback period into consecutive windows, oldest first
    ///
    /// The last window is open-ended so orders created during the run are
    /// not missed.
    pub fn date_windows(&self, now: i64) -> Vec<DateWindow> {
        let Some(lookback) = self.lookback else {
            return vec![(None, None)];
        };
        let lookback_ms = i64::try_from(lookback.as_millis()).unwrap_or(i64::MAX);
        let step = i64::try_from(self.window.as_millis())
            .unwrap_or(i64::MAX)
            .max(1);

        let mut windows = Vec::new();
        let mut from = now.saturating_sub(lookback_ms);
        loop {
            let to = from.saturating_add(step);
            if to >= now {
                windows.push((Some(from), None));
                break;
            }
            windows.push((Some(from), Some(to)));
            from = to;
        }
        windows
    }
}
