// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::site::{SiteKind, SiteProfile};
use crate::domain::models::tuning::CrawlTuning;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::time::Duration;

/// 应用程序配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// 浏览器配置
    pub browser: BrowserSettings,
    /// 爬取节奏配置
    pub crawl: CrawlSettings,
    /// 输出配置
    pub sink: SinkSettings,
    /// 指标配置
    pub metrics: MetricsSettings,
    /// 日志配置
    pub logging: LoggingSettings,
    /// 各站点配置
    pub sites: SitesSettings,
}

/// 浏览器配置
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserSettings {
    /// 远程调试地址，设置后连接已有浏览器而不是启动新进程
    pub remote_debugging_url: Option<String>,
    pub headless: bool,
    pub chrome_executable: Option<String>,
    /// CDP请求超时（秒）
    pub request_timeout_secs: u64,
    /// 页面导航超时（秒）
    pub navigation_timeout_secs: u64,
}

/// 爬取节奏配置，时间单位均为毫秒
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlSettings {
    pub page_load_timeout_ms: u64,
    pub page_count_timeout_ms: u64,
    pub next_control_timeout_ms: u64,
    pub obstruction_wait_ms: u64,
    pub poll_interval_ms: u64,
    pub pre_advance_delay_ms: u64,
    pub scroll_settle_ms: u64,
    pub post_advance_settle_ms: u64,
    pub inter_target_delay_ms: u64,
    pub max_pages_per_target: u32,
}

impl CrawlSettings {
    /// 转换为引擎使用的参数
    pub fn tuning(&self) -> CrawlTuning {
        CrawlTuning {
            page_load_timeout: Duration::from_millis(self.page_load_timeout_ms),
            page_count_timeout: Duration::from_millis(self.page_count_timeout_ms),
            next_control_timeout: Duration::from_millis(self.next_control_timeout_ms),
            obstruction_wait: Duration::from_millis(self.obstruction_wait_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            pre_advance_delay: Duration::from_millis(self.pre_advance_delay_ms),
            scroll_settle: Duration::from_millis(self.scroll_settle_ms),
            post_advance_settle: Duration::from_millis(self.post_advance_settle_ms),
            inter_target_delay: Duration::from_millis(self.inter_target_delay_ms),
            max_pages_per_target: self.max_pages_per_target.max(1),
        }
    }
}

/// 输出配置
#[derive(Debug, Clone, Deserialize)]
pub struct SinkSettings {
    /// 输出类型：`local`、`google_sheets` 或 `memory`
    pub kind: String,
    /// 本地工作簿根目录
    pub local_path: String,
    /// Sheets API 地址
    pub sheets_api_base: String,
    /// Sheets API 访问令牌
    pub access_token: Option<String>,
    /// 请求超时（秒）
    pub request_timeout_secs: u64,
    /// 可重试错误的最大重试次数
    pub max_retries: u32,
}

/// 指标配置
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSettings {
    pub enabled: bool,
    pub listen_addr: String,
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// 输出JSON格式日志
    pub json: bool,
}

/// 单个站点的配置
#[derive(Debug, Clone, Deserialize)]
pub struct SiteSettings {
    pub enabled: bool,
    /// 工作簿标识：Sheets 的表格ID，或本地目录名
    pub workbook: String,
    /// 覆盖内置的货币列表
    pub currencies: Option<Vec<String>>,
    /// 覆盖内置的URL模板
    pub url_template: Option<String>,
}

impl SiteSettings {
    /// 将覆盖项应用到站点预设上
    pub fn profile(&self, kind: SiteKind) -> SiteProfile {
        let mut profile = SiteProfile::preset(kind);
        if let Some(currencies) = &self.currencies {
            profile.currencies = currencies.clone();
        }
        if let Some(template) = &self.url_template {
            profile.url_template = template.clone();
        }
        profile
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SitesSettings {
    pub binance: SiteSettings,
    pub bybit: SiteSettings,
    pub okx: SiteSettings,
}

impl SitesSettings {
    pub fn get(&self, kind: SiteKind) -> &SiteSettings {
        match kind {
            SiteKind::Binance => &self.binance,
            SiteKind::Bybit => &self.bybit,
            SiteKind::Okx => &self.okx,
        }
    }

    /// 已启用的站点，按固定顺序
    pub fn enabled(&self) -> Vec<SiteKind> {
        SiteKind::ALL
            .into_iter()
            .filter(|kind| self.get(*kind).enabled)
            .collect()
    }
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 依次叠加默认值、`config/default`、`config/{APP_ENVIRONMENT}`
    /// 和 `P2PCRAWL__` 前缀的环境变量
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        Self::with_defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("P2PCRAWL").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// 从TOML文本加载，未给出的项取默认值
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        Self::with_defaults()?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    fn with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let mut builder = Config::builder()
            // Browser
            .set_default("browser.headless", true)?
            .set_default("browser.request_timeout_secs", 30)?
            .set_default("browser.navigation_timeout_secs", 60)?
            // Crawl pacing
            .set_default("crawl.page_load_timeout_ms", 5000)?
            .set_default("crawl.page_count_timeout_ms", 5000)?
            .set_default("crawl.next_control_timeout_ms", 5000)?
            .set_default("crawl.obstruction_wait_ms", 2000)?
            .set_default("crawl.poll_interval_ms", 250)?
            .set_default("crawl.pre_advance_delay_ms", 1000)?
            .set_default("crawl.scroll_settle_ms", 500)?
            .set_default("crawl.post_advance_settle_ms", 500)?
            .set_default("crawl.inter_target_delay_ms", 2000)?
            .set_default("crawl.max_pages_per_target", 200)?
            // Sink
            .set_default("sink.kind", "local")?
            .set_default("sink.local_path", "./workbooks")?
            .set_default("sink.sheets_api_base", "https://sheets.googleapis.com/v4")?
            .set_default("sink.request_timeout_secs", 30)?
            .set_default("sink.max_retries", 3)?
            // Observability
            .set_default("metrics.enabled", false)?
            .set_default("metrics.listen_addr", "0.0.0.0:9000")?
            .set_default("logging.json", false)?;

        for kind in SiteKind::ALL {
            builder = builder
                .set_default(format!("sites.{}.enabled", kind), true)?
                .set_default(format!("sites.{}.workbook", kind), format!("{}-p2p", kind))?;
        }
        Ok(builder)
    }
}
