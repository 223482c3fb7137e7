// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::domain::models::fetch_request::FetchMode;
use crate::domain::services::human_pacer::DelayDistribution;
use crate::domain::services::identity_rotator::RotationStrategy;

/// 默认的 User-Agent 列表
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1",
];

/// 应用程序配置设置
///
/// 包含抓取、身份轮换、节奏模拟、退避、浏览器、分页、存储、日志和指标等所有配置项
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// 抓取配置
    pub scraping: ScrapingSettings,
    /// 身份池配置
    pub identity: IdentitySettings,
    /// 人类节奏模拟配置
    pub pacing: PacingSettings,
    /// 重试退避配置
    pub backoff: BackoffSettings,
    /// 浏览器配置（动态模式）
    pub browser: BrowserSettings,
    /// 分页配置
    pub pagination: PaginationSettings,
    /// 存储配置
    pub storage: StorageSettings,
    /// 日志配置
    pub logging: LoggingSettings,
    /// 指标配置
    pub metrics: MetricsSettings,
}

/// 浏览器类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BrowserType {
    #[default]
    Chrome,
    Chromium,
    Edge,
    Firefox,
}

/// 抓取配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ScrapingSettings {
    /// 是否使用代理
    pub use_proxies: bool,
    /// 是否模拟人类访问节奏
    pub simulate_human: bool,
    /// 抓取模式 (static, dynamic)
    pub mode: FetchMode,
    /// 浏览器类型
    pub browser_type: BrowserType,
    /// 最大分页数，0 表示不限制
    pub max_pages: u32,
    /// 每个URL的最大尝试次数
    pub retry_limit: u32,
    /// 去重冷却时间（秒），0 表示永不过期
    pub dedup_ttl_secs: u64,
    /// 并发工作者数量
    pub concurrency: usize,
    /// 单个请求超时时间（秒）
    pub timeout_secs: u64,
    /// 额外请求头
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl ScrapingSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// 去重冷却窗口，`None` 表示整个会话内有效
    pub fn dedup_ttl(&self) -> Option<Duration> {
        if self.dedup_ttl_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.dedup_ttl_secs))
        }
    }
}

/// 身份池配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct IdentitySettings {
    /// User-Agent 列表
    #[serde(default = "default_user_agents")]
    pub user_agents: Vec<String>,
    /// 代理列表 (URL)
    #[serde(default)]
    pub proxies: Vec<String>,
    /// 轮换策略
    pub strategy: RotationStrategy,
    /// 加权随机策略的权重，按身份池顺序对应，缺省的位置权重为 1
    #[serde(default)]
    pub weights: Vec<u32>,
    /// 复用窗口，默认为身份池大小
    pub reuse_window: Option<usize>,
    /// 连续失败多少次后停用身份
    pub max_failures: u32,
}

fn default_user_agents() -> Vec<String> {
    DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect()
}

/// 人类节奏模拟配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct PacingSettings {
    /// 最小延迟（毫秒）
    pub min_delay_ms: u64,
    /// 最大延迟（毫秒）
    pub max_delay_ms: u64,
    /// 延迟分布
    pub distribution: DelayDistribution,
}

/// 重试退避配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct BackoffSettings {
    /// 初始退避时间（毫秒）
    pub initial_backoff_ms: u64,
    /// 最大退避时间（毫秒）
    pub max_backoff_ms: u64,
    /// 退避乘数
    pub multiplier: f64,
    /// 抖动因子 (0.0-1.0)
    pub jitter_factor: f64,
}

/// 浏览器配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserSettings {
    /// 是否无头模式
    pub headless: bool,
    /// 浏览器可执行文件路径
    pub executable_path: Option<String>,
    /// 远程调试地址 (连接已有浏览器)
    pub remote_debugging_url: Option<String>,
    /// 页面就绪等待时间（秒）
    pub render_timeout_secs: u64,
    /// 是否滚动到底部以加载懒加载内容
    pub scroll_to_bottom: bool,
    /// 最大滚动次数
    pub max_scroll_attempts: u32,
    /// 每次滚动后的停顿（毫秒）
    pub scroll_pause_ms: u64,
}

/// 分页配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct PaginationSettings {
    /// "下一页"链接的CSS选择器
    pub next_selector: String,
}

/// 存储配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// 存储类型 (memory, json)
    pub storage_type: String,
    /// 记录文件路径 (当 type=json 时使用)
    pub path: Option<String>,
    /// 去重账本持久化路径，未设置时不跨会话保存
    pub ledger_path: Option<String>,
}

/// 日志配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// 默认过滤规则，RUST_LOG 优先
    pub filter: String,
    /// 是否输出JSON格式
    pub json: bool,
}

/// 指标配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSettings {
    /// 是否启用 Prometheus 导出
    pub enabled: bool,
    /// 监听地址
    pub listen_addr: String,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 从配置文件和环境变量加载配置，支持默认值
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        Self::builder()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("GALERA")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("identity.user_agents")
                    .with_list_parse_key("identity.proxies")
                    .with_list_parse_key("identity.weights")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// 仅使用默认值构建配置（不读取文件和环境变量）
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::builder()?.build()?.try_deserialize()
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            // Scraping
            .set_default("scraping.use_proxies", false)?
            .set_default("scraping.simulate_human", true)?
            .set_default("scraping.mode", "static")?
            .set_default("scraping.browser_type", "chrome")?
            .set_default("scraping.max_pages", 100)?
            .set_default("scraping.retry_limit", 3)?
            .set_default("scraping.dedup_ttl_secs", 86_400)?
            .set_default("scraping.concurrency", 10)?
            .set_default("scraping.timeout_secs", 30)?
            // Identity
            .set_default("identity.strategy", "round_robin")?
            .set_default("identity.max_failures", 3)?
            // Pacing: 1-5s between requests
            .set_default("pacing.min_delay_ms", 1_000)?
            .set_default("pacing.max_delay_ms", 5_000)?
            .set_default("pacing.distribution", "log_normal")?
            // Backoff
            .set_default("backoff.initial_backoff_ms", 1_000)?
            .set_default("backoff.max_backoff_ms", 60_000)?
            .set_default("backoff.multiplier", 2.0)?
            .set_default("backoff.jitter_factor", 0.1)?
            // Browser
            .set_default("browser.headless", true)?
            .set_default("browser.render_timeout_secs", 30)?
            .set_default("browser.scroll_to_bottom", true)?
            .set_default("browser.max_scroll_attempts", 10)?
            .set_default("browser.scroll_pause_ms", 1_000)?
            // Pagination
            .set_default("pagination.next_selector", "a[rel=\"next\"], link[rel=\"next\"]")?
            // Storage
            .set_default("storage.storage_type", "memory")?
            // Logging / metrics
            .set_default("logging.filter", "info,galera=debug")?
            .set_default("logging.json", false)?
            .set_default("metrics.enabled", false)?
            .set_default("metrics.listen_addr", "0.0.0.0:9000")
    }
}
