//! Run results and summaries

use super::error::{RecordError, SyncError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    Failed { reason: String },
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed)
    }
}

/// Per-run counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounters {
    pub created: u32,
    pub updated: u32,
    pub skipped: u32,
    pub errors: u32,
}

/// Counters shared by the workers of one run
#[derive(Debug, Default)]
pub(crate) struct RunTally {
    created: AtomicU32,
    updated: AtomicU32,
    skipped: AtomicU32,
    errors: AtomicU32,
}

impl RunTally {
    pub(crate) fn created(&self) {
        self.created.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn updated(&self) {
        self.updated.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> RunCounters {
        RunCounters {
            created: self.created.load(Ordering::Relaxed),
            updated: self.updated.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Full result of one sync run
#[derive(Debug, Clone)]
pub struct RunResult {
    pub run_id: String,
    pub started_at: i64,
    pub finished_at: i64,
    pub outcome: RunOutcome,
    pub counters: RunCounters,
    /// Per-record failures, in the order they were observed
    pub errors: Vec<RecordError>,
    /// Error that ended the run early, if any
    pub fatal_error: Option<SyncError>,
}

impl RunResult {
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            run_id: self.run_id.clone(),
            started_at: self.started_at,
            timestamp: self.finished_at,
            created: self.counters.created,
            updated: self.counters.updated,
            skipped: self.counters.skipped,
            errors: self.counters.errors,
            outcome: self.outcome.clone(),
        }
    }
}

/// Compact run record kept for the dashboard and persisted in `sync_run`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub started_at: i64,
    /// Finish time (Unix millis)
    pub timestamp: i64,
    pub created: u32,
    pub updated: u32,
    pub skipped: u32,
    pub errors: u32,
    #[serde(flatten)]
    pub outcome: RunOutcome,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} imported, {} updated, {} skipped, {} errors",
            self.created, self.updated, self.skipped, self.errors
        )
    }
}
