//! 核心模块 - 配置和启动环境
//!
//! - [`Config`] - 同步引擎配置

pub mod config;

pub use config::Config;
