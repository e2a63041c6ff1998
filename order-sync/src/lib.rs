//! Order Sync - 本地订单库与远程电商平台的对账引擎
//!
//! # 架构概述
//!
//! - **远程网关** (`remote`): 分页、按状态过滤的 REST 订单接口
//! - **数据库** (`db`): SQLite 本地订单库
//! - **同步** (`sync`): 状态归一化、对账、运行编排、回推
//!
//! # 模块结构
//!
//! ```text
//! order-sync/src/
//! ├── core/          # 配置
//! ├── db/            # SQLite 连接池、迁移、仓储
//! ├── remote/        # 远程订单网关
//! ├── sync/          # 对账引擎
//! └── utils/         # 日志、金额、联系方式
//! ```

pub mod core;
pub mod db;
pub mod remote;
pub mod sync;
pub mod utils;

// Re-export 公共类型
pub use crate::core::Config;
pub use db::{DbService, OrderStore, SqliteOrderStore, StoreError};
pub use remote::{GatewayError, HttpOrderGateway, OrderGateway};
pub use sync::{PushReport, RunResult, RunState, RunSummary, SyncEngine, SyncError, SyncOptions};
pub use utils::{AppError, AppResult, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{cleanup_old_logs, init_logger, init_logger_with_file};

/// 设置运行环境: 加载 .env, 初始化日志
///
/// 必须在 tokio runtime 内调用 (日志清理任务)
pub fn setup_environment() -> anyhow::Result<()> {
    if let Err(e) = dotenv::dotenv()
        && !e.not_found()
    {
        eprintln!("Failed to load .env: {e}");
    }

    let config = Config::from_env();
    init_logger_with_file(&config.log_level, config.log_json, config.log_dir.as_deref())
}

pub fn print_banner() {
    println!(
        r#"
  ____          _              ____
 / __ \_ __ __| | ___ _ __   / ___| _   _ _ __   ___
| |  | | '__/ _` |/ _ \ '__| \___ \| | | | '_ \ / __|
| |__| | | | (_| |  __/ |     ___) | |_| | | | | (__
 \____/|_|  \__,_|\___|_|    |____/ \__, |_| |_|\___|
                                    |___/
    "#
    );
}
