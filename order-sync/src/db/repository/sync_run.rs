//! Sync Run Repository

use super::{StoreError, StoreResult};
use crate::sync::{RunOutcome, RunSummary};
use sqlx::SqlitePool;

#[derive(Debug, sqlx::FromRow)]
struct SyncRunRow {
    id: String,
    started_at: i64,
    finished_at: i64,
    outcome: String,
    failure_reason: Option<String>,
    created: i64,
    updated: i64,
    skipped: i64,
    errors: i64,
}

impl SyncRunRow {
    fn into_summary(self) -> StoreResult<RunSummary> {
        let outcome = match self.outcome.as_str() {
            "completed" => RunOutcome::Completed,
            "failed" => RunOutcome::Failed {
                reason: self.failure_reason.unwrap_or_default(),
            },
            other => {
                return Err(StoreError::Serialization(format!(
                    "sync run {}: unknown outcome '{other}'",
                    self.id
                )));
            }
        };
        let count = |v: i64| u32::try_from(v).unwrap_or_default();
        Ok(RunSummary {
            run_id: self.id,
            started_at: self.started_at,
            timestamp: self.finished_at,
            created: count(self.created),
            updated: count(self.updated),
            skipped: count(self.skipped),
            errors: count(self.errors),
            outcome,
        })
    }
}

pub async fn insert(pool: &SqlitePool, summary: &RunSummary) -> StoreResult<()> {
    let (outcome, reason) = match &summary.outcome {
        RunOutcome::Completed => ("completed", None),
        RunOutcome::Failed { reason } => ("failed", Some(reason.as_str())),
    };
    sqlx::query(
        "INSERT INTO sync_run (id, started_at, finished_at, outcome, failure_reason, created, updated, skipped, errors) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )
    .bind(&summary.run_id)
    .bind(summary.started_at)
    .bind(summary.timestamp)
    .bind(outcome)
    .bind(reason)
    .bind(i64::from(summary.created))
    .bind(i64::from(summary.updated))
    .bind(i64::from(summary.skipped))
    .bind(i64::from(summary.errors))
    .execute(pool)
    .await?;
    Ok(())
}

/// Most recently finished run
pub async fn find_latest(pool: &SqlitePool) -> StoreResult<Option<RunSummary>> {
    let row = sqlx::query_as::<_, SyncRunRow>(
        "SELECT id, started_at, finished_at, outcome, failure_reason, created, updated, skipped, errors FROM sync_run ORDER BY finished_at DESC, rowid DESC LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;
    row.map(SyncRunRow::into_summary).transpose()
}
