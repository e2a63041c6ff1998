//! 工具模块 - 通用工具函数和类型
//!
//! # 内容
//!
//! - [`AppError`] - 应用错误类型 (from shared::error)
//! - [`money`] - rust_decimal 金额计算
//! - [`contact`] - 推送前的客户联系方式修复
//! - [`logger`] - 日志初始化

pub mod contact;
pub mod logger;
pub mod money;

pub use shared::error::{AppError, AppResult, ErrorCategory, ErrorCode};
