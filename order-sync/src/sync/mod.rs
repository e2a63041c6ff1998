//! 订单同步 - 拉取、对账、回推
//!
//! # 模块结构
//!
//! - [`status`] - 远程状态归一化
//! - [`reconciler`] - 纯函数: 创建 / 更新 / 跳过
//! - [`orchestrator`] - 单次同步运行 (状态桶 × 日期窗口 × 分页)
//! - [`scheduler`] - 定时自动同步
//! - [`pusher`] - 本地修改回推远程
//! - [`SyncEngine`] - 对外触发接口

pub mod engine;
pub mod error;
mod guard;
pub mod options;
pub mod orchestrator;
pub mod pusher;
pub mod reconciler;
pub mod scheduler;
pub mod status;
pub mod summary;

pub use engine::SyncEngine;
pub use error::{RecordError, RecordErrorKind, SyncError};
pub use options::SyncOptions;
pub use orchestrator::{RunState, SyncOrchestrator};
pub use pusher::{OutboundPusher, PushReport};
pub use reconciler::{Action, SkipReason, reconcile};
pub use status::normalize;
pub use summary::{RunCounters, RunOutcome, RunResult, RunSummary};
