//! Single-flight runs, cancellation, timeouts and the auto-sync scheduler

mod common;

use common::*;
use order_sync::db::DbService;
use order_sync::sync::error::RecordErrorKind;
use order_sync::sync::{RunOutcome, RunState, SyncEngine, SyncError, SyncOrchestrator};
use std::sync::Arc;
use std::time::Duration;

async fn orchestrator_with(
    gateway: Arc<FakeGateway>,
    options: order_sync::SyncOptions,
) -> (DbService, Arc<SyncOrchestrator>) {
    let (db, store) = sqlite_store().await;
    (db, Arc::new(SyncOrchestrator::new(gateway, store, options)))
}

#[tokio::test]
async fn test_concurrent_run_is_rejected() {
    let gateway = FakeGateway::new();
    gateway.set_orders("completed", vec![remote_order(1, "completed", 10.0, 1_000)]);
    gateway.set_list_delay(Duration::from_millis(300));
    let (_db, orchestrator) = orchestrator_with(gateway.clone(), test_options(&["completed"])).await;

    let first = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move { orchestrator.run().await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(orchestrator.is_running());
    assert_eq!(orchestrator.state(), RunState::Running);

    let second = orchestrator.run().await;
    assert!(matches!(second, Err(SyncError::AlreadyRunning)));

    let first = first.await.unwrap().unwrap();
    assert_eq!(first.outcome, RunOutcome::Completed);
    assert_eq!(first.counters.created, 1);
    assert!(!orchestrator.is_running());

    // Guard released: a new run is accepted
    assert!(orchestrator.run().await.is_ok());
}

#[tokio::test]
async fn test_cancel_ends_run_as_failed() {
    let gateway = FakeGateway::new();
    gateway.set_pages(
        "completed",
        vec![
            vec![remote_order(1, "completed", 10.0, 1_000)],
            vec![remote_order(2, "completed", 10.0, 1_000)],
            vec![remote_order(3, "completed", 10.0, 1_000)],
        ],
    );
    gateway.set_list_delay(Duration::from_millis(200));
    let (_db, orchestrator) = orchestrator_with(gateway.clone(), test_options(&["completed"])).await;

    assert!(!orchestrator.cancel_current_run());
    let run = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move { orchestrator.run().await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(orchestrator.cancel_current_run());

    let result = run.await.unwrap().unwrap();
    assert!(matches!(result.outcome, RunOutcome::Failed { .. }));
    assert!(matches!(result.fatal_error, Some(SyncError::Cancelled)));
    assert!(gateway.list_call_count() < 3);
    assert_eq!(orchestrator.state(), RunState::Failed);
}

#[tokio::test]
async fn test_abandoned_run_does_not_stay_running() {
    let gateway = FakeGateway::new();
    gateway.set_orders("completed", vec![remote_order(1, "completed", 10.0, 1_000)]);
    gateway.set_list_delay(Duration::from_millis(500));
    let (_db, orchestrator) = orchestrator_with(gateway.clone(), test_options(&["completed"])).await;

    let abandoned = tokio::time::timeout(Duration::from_millis(50), orchestrator.run()).await;
    assert!(abandoned.is_err());
    assert!(!orchestrator.is_running());
    assert_eq!(orchestrator.state(), RunState::Failed);
    assert!(!orchestrator.cancel_current_run());

    gateway.set_list_delay(Duration::ZERO);
    let result = orchestrator.run().await.unwrap();
    assert_eq!(result.outcome, RunOutcome::Completed);
    assert_eq!(orchestrator.state(), RunState::Completed);
}

#[tokio::test]
async fn test_slow_remote_times_out_without_failing_run() {
    let gateway = FakeGateway::new();
    gateway.set_orders("completed", vec![remote_order(1, "completed", 10.0, 1_000)]);
    gateway.set_list_delay(Duration::from_millis(500));
    let mut options = test_options(&["completed"]);
    options.request_timeout = Duration::from_millis(100);
    let (_db, orchestrator) = orchestrator_with(gateway, options).await;

    let result = orchestrator.run().await.unwrap();
    assert_eq!(result.outcome, RunOutcome::Completed);
    assert_eq!(result.counters.errors, 1);
    assert_eq!(result.errors[0].kind, RecordErrorKind::Transport);
    assert!(result.errors[0].message.contains("timed out"));
}

#[tokio::test]
async fn test_scheduler_never_overlaps_manual_run() {
    let gateway = FakeGateway::new();
    gateway.set_orders("completed", vec![remote_order(1, "completed", 10.0, 1_000)]);
    gateway.set_list_delay(Duration::from_millis(300));
    let (_db, store) = sqlite_store().await;
    let engine = SyncEngine::new(gateway.clone(), store, test_options(&["completed"])).await;

    engine.enable_auto_sync(Duration::from_millis(50));
    let manual = engine.run_sync_now().await.unwrap();
    assert_eq!(manual.outcome, RunOutcome::Completed);

    // Let the scheduler run at least once after the manual run
    tokio::time::sleep(Duration::from_millis(500)).await;
    engine.shutdown().await;

    assert!(gateway.list_call_count() >= 2);
    assert_eq!(gateway.max_concurrent_lists(), 1);
}

#[tokio::test]
async fn test_disable_auto_sync_stops_runs() {
    let gateway = FakeGateway::new();
    gateway.set_orders("completed", vec![remote_order(1, "completed", 10.0, 1_000)]);
    let (_db, store) = sqlite_store().await;
    let engine = SyncEngine::new(gateway.clone(), store, test_options(&["completed"])).await;
    let mut rx = engine.subscribe();

    engine.enable_auto_sync(Duration::from_millis(30));
    assert_eq!(engine.auto_sync_interval(), Some(Duration::from_millis(30)));

    let summary = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("scheduled run within 2s")
        .unwrap();
    assert_eq!(summary.created, 1);

    engine.disable_auto_sync();
    assert_eq!(engine.auto_sync_interval(), None);
    tokio::time::sleep(Duration::from_millis(50)).await;
    let calls = gateway.list_call_count();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(gateway.list_call_count(), calls);
    assert!(engine.get_last_run_summary().is_some());
}

#[tokio::test]
async fn test_enable_twice_replaces_interval() {
    let gateway = FakeGateway::new();
    let (_db, store) = sqlite_store().await;
    let engine = SyncEngine::new(gateway, store, test_options(&["completed"])).await;

    engine.enable_auto_sync(Duration::from_secs(60));
    engine.enable_auto_sync(Duration::from_secs(120));
    assert_eq!(engine.auto_sync_interval(), Some(Duration::from_secs(120)));

    engine.shutdown().await;
    assert_eq!(engine.auto_sync_interval(), None);
    assert_eq!(engine.state(), RunState::Idle);
}
