use order_sync::{
    Config, DbService, HttpOrderGateway, OrderGateway, OrderStore, SyncEngine, print_banner,
    setup_environment,
};
use std::sync::Arc;
use std::time::Duration;

/// Outbound push cadence
const PUSH_INTERVAL_SECS: u64 = 60;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 设置环境 (dotenv, 日志)
    setup_environment()?;

    // 打印横幅
    print_banner();

    tracing::info!("Order sync starting...");

    // 2. 加载配置
    let config = Config::from_env();
    config.validate()?;

    // 3. 数据库
    let db = DbService::new(&config.database_path).await?;
    let store: Arc<dyn OrderStore> = Arc::new(db.order_store());

    // 4. 远程网关
    let gateway: Arc<dyn OrderGateway> = Arc::new(HttpOrderGateway::from_config(&config)?);

    // 5. 同步引擎
    let engine = SyncEngine::new(gateway, store, config.sync_options()).await;
    if let Some(summary) = engine.get_last_run_summary() {
        tracing::info!(last_run = %summary, "Previous sync run");
    }

    // 启动时先回推本地修改
    match engine.push_pending().await {
        Ok(report) => tracing::info!(
            pushed = report.pushed,
            exported = report.exported,
            failed = report.failed,
            "Startup push finished"
        ),
        Err(e) => tracing::error!(error = %e, "Startup push failed"),
    }

    match config.sync_interval() {
        Some(interval) => engine.enable_auto_sync(interval),
        None => tracing::info!("Auto sync disabled (SYNC_INTERVAL_SECS=0), running once"),
    }
    let push_task = engine.spawn_periodic_push(Duration::from_secs(PUSH_INTERVAL_SECS));

    if config.sync_interval().is_none() {
        match engine.run_sync_now().await {
            Ok(result) => tracing::info!(summary = %result.summary(), "Sync run finished"),
            Err(e) => tracing::error!(error = %e, "Sync run failed to start"),
        }
    }

    // 6. 等待退出信号
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    engine.shutdown().await;
    if let Err(e) = push_task.await {
        tracing::warn!(error = %e, "Push task ended abnormally");
    }
    db.close().await;

    tracing::info!("Order sync stopped");
    Ok(())
}
