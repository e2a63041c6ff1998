use crate::sync::SyncOptions;
use crate::utils::AppError;
use crate::utils::contact::is_valid_email;
use std::str::FromStr;
use std::time::Duration;

/// Default status buckets, in iteration order
pub const DEFAULT_TRACKED_STATUSES: &[&str] = &[
    "pending",
    "processing",
    "on-hold",
    "completed",
    "cancelled",
    "refunded",
    "failed",
];

/// Remote list endpoint refuses larger pages
pub const MAX_PAGE_SIZE: u32 = 100;

/// 同步引擎配置
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | DATABASE_PATH | ./work_dir/orders.db | SQLite 数据库路径 |
/// | REMOTE_BASE_URL | (必填) | 远程平台 API 地址, 例如 https://shop.test/wp-json/wc/v3 |
/// | REMOTE_CONSUMER_KEY | (必填) | Basic auth 用户名 |
/// | REMOTE_CONSUMER_SECRET | (必填) | Basic auth 密码 |
/// | FALLBACK_CONTACT_EMAIL | orders@localhost.localdomain | 邮箱无效时的替代地址 |
/// | TRACKED_STATUSES | pending,processing,on-hold,completed,cancelled,refunded,failed | 逐个拉取的状态 |
/// | SYNC_INTERVAL_SECS | 300 | 自动同步间隔 (0 = 关闭) |
/// | SYNC_PAGE_SIZE | 100 | 每页订单数 (1-100) |
/// | SYNC_PAGE_DELAY_MS | 500 | 翻页间隔(毫秒) |
/// | REQUEST_TIMEOUT_MS | 30000 | 单次远程调用超时(毫秒) |
/// | SYNC_WORKER_CONCURRENCY | 4 | 单页并发处理数 |
/// | SYNC_LOOKBACK_DAYS | 30 | 回溯天数 |
/// | SYNC_WINDOW_DAYS | 7 | 单个日期窗口天数 |
/// | EXPORT_NEW_ORDERS | false | 是否在远程创建本地新订单 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_JSON | false | JSON 日志输出 |
/// | LOG_DIR | (无) | 日志文件目录 |
///
/// # 示例
///
/// ```ignore
/// REMOTE_BASE_URL=https://shop.test/wp-json/wc/v3 SYNC_INTERVAL_SECS=60 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite 数据库文件路径
    pub database_path: String,
    /// 远程平台 API 基础地址 (不带末尾斜杠)
    pub remote_base_url: String,
    pub consumer_key: String,
    pub consumer_secret: String,
    /// 推送前替换无效邮箱的地址
    pub fallback_contact_email: String,
    /// 按顺序拉取的状态桶
    pub tracked_statuses: Vec<String>,
    /// 自动同步间隔 (秒), 0 表示关闭
    pub sync_interval_secs: u64,
    pub page_size: u32,
    pub page_delay_ms: u64,
    /// 单次远程调用超时 (毫秒)
    pub request_timeout_ms: u64,
    pub worker_concurrency: usize,
    pub lookback_days: u32,
    pub window_days: u32,
    /// 是否把本地新建订单导出到远程
    pub export_new_orders: bool,
    pub log_level: String,
    pub log_json: bool,
    pub log_dir: Option<String>,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置或无法解析，使用默认值
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意键值来源加载配置
    ///
    /// 常用于测试场景
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |key: &str| {
            lookup(key)
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false)
        };

        let tracked_statuses = lookup("TRACKED_STATUSES")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_else(|| {
                DEFAULT_TRACKED_STATUSES
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            });

        Self {
            database_path: lookup("DATABASE_PATH")
                .unwrap_or_else(|| "./work_dir/orders.db".into()),
            remote_base_url: lookup("REMOTE_BASE_URL")
                .map(|url| url.trim().trim_end_matches('/').to_string())
                .unwrap_or_default(),
            consumer_key: lookup("REMOTE_CONSUMER_KEY").unwrap_or_default(),
            consumer_secret: lookup("REMOTE_CONSUMER_SECRET").unwrap_or_default(),
            fallback_contact_email: lookup("FALLBACK_CONTACT_EMAIL")
                .unwrap_or_else(|| "orders@localhost.localdomain".into()),
            tracked_statuses,
            sync_interval_secs: parse_var(lookup("SYNC_INTERVAL_SECS")).unwrap_or(300),
            page_size: parse_var(lookup("SYNC_PAGE_SIZE")).unwrap_or(MAX_PAGE_SIZE),
            page_delay_ms: parse_var(lookup("SYNC_PAGE_DELAY_MS")).unwrap_or(500),
            request_timeout_ms: parse_var(lookup("REQUEST_TIMEOUT_MS")).unwrap_or(30_000),
            worker_concurrency: parse_var(lookup("SYNC_WORKER_CONCURRENCY")).unwrap_or(4),
            lookback_days: parse_var(lookup("SYNC_LOOKBACK_DAYS")).unwrap_or(30),
            window_days: parse_var(lookup("SYNC_WINDOW_DAYS")).unwrap_or(7),
            export_new_orders: flag("EXPORT_NEW_ORDERS"),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_json: flag("LOG_JSON"),
            log_dir: lookup("LOG_DIR").filter(|d| !d.trim().is_empty()),
        }
    }

    /// 检查配置是否可用
    pub fn validate(&self) -> Result<(), AppError> {
        if !(self.remote_base_url.starts_with("http://")
            || self.remote_base_url.starts_with("https://"))
        {
            return Err(AppError::config(format!(
                "REMOTE_BASE_URL must be an http(s) URL, got '{}'",
                self.remote_base_url
            )));
        }
        if self.consumer_key.is_empty() || self.consumer_secret.is_empty() {
            return Err(AppError::config(
                "REMOTE_CONSUMER_KEY and REMOTE_CONSUMER_SECRET are required",
            ));
        }
        if !is_valid_email(&self.fallback_contact_email) {
            return Err(AppError::config(format!(
                "FALLBACK_CONTACT_EMAIL is not a valid address: '{}'",
                self.fallback_contact_email
            )));
        }
        if self.tracked_statuses.is_empty() {
            return Err(AppError::config("TRACKED_STATUSES must not be empty"));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(AppError::config(format!(
                "SYNC_PAGE_SIZE must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        if self.worker_concurrency == 0 {
            return Err(AppError::config("SYNC_WORKER_CONCURRENCY must be at least 1"));
        }
        if self.request_timeout_ms == 0 {
            return Err(AppError::config("REQUEST_TIMEOUT_MS must be positive"));
        }
        if self.lookback_days == 0 || self.window_days == 0 {
            return Err(AppError::config(
                "SYNC_LOOKBACK_DAYS and SYNC_WINDOW_DAYS must be positive",
            ));
        }
        Ok(())
    }

    /// 自动同步间隔, `None` 表示关闭
    pub fn sync_interval(&self) -> Option<Duration> {
        (self.sync_interval_secs > 0).then(|| Duration::from_secs(self.sync_interval_secs))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// 同步运行参数
    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            tracked_statuses: self.tracked_statuses.clone(),
            page_size: self.page_size,
            page_delay: Duration::from_millis(self.page_delay_ms),
            request_timeout: self.request_timeout(),
            worker_concurrency: self.worker_concurrency,
            lookback: Some(Duration::from_secs(u64::from(self.lookback_days) * 86_400)),
            window: Duration::from_secs(u64::from(self.window_days) * 86_400),
            fallback_contact_email: self.fallback_contact_email.clone(),
            export_new_orders: self.export_new_orders,
        }
    }
}

/// Parse a variable, treating unparseable values as unset
fn parse_var<T: FromStr>(value: Option<String>) -> Option<T> {
    value.and_then(|v| v.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
