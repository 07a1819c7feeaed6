use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::models::WebhookConfig;

/// 系统配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
}

/// 调度循环配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// 扫描到期任务的间隔（秒）
    #[serde(default = "default_tick_interval")]
    pub tick_interval_seconds: u64,
    /// 单个节拍内并发投递的上限
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_deliveries: usize,
    /// 每日维护的本地小时（0-23）
    #[serde(default = "default_maintenance_hour")]
    pub maintenance_hour: u32,
    /// 单个节拍最多认领的任务数
    #[serde(default = "default_claim_limit")]
    pub claim_limit: usize,
}

/// 日历数据源配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// 节假日API地址，按 ?year=YYYY 查询
    pub url: String,
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub app_secret: Option<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

/// 通知投递配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// 任务未指定渠道时使用的默认Webhook
    #[serde(default)]
    pub default_webhook: Option<WebhookConfig>,
    #[serde(default)]
    pub mail: Option<MailConfig>,
    #[serde(default)]
    pub retry: RetryConfig,
}

/// SMTP邮件配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    pub server: String,
    /// 465为隐式TLS，其余端口走STARTTLS
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
    pub sender: String,
}

/// 投递重试配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_interval_ms")]
    pub base_interval_ms: u64,
    #[serde(default = "default_max_interval_ms")]
    pub max_interval_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,
    #[serde(default = "default_attempt_timeout")]
    pub attempt_timeout_seconds: u64,
}

fn default_tick_interval() -> u64 {
    10
}
fn default_max_concurrent() -> usize {
    8
}
fn default_maintenance_hour() -> u32 {
    1
}
fn default_claim_limit() -> usize {
    64
}
fn default_request_timeout() -> u64 {
    30
}
fn default_smtp_port() -> u16 {
    465
}
fn default_max_attempts() -> u32 {
    3
}
fn default_base_interval_ms() -> u64 {
    500
}
fn default_max_interval_ms() -> u64 {
    30_000
}
fn default_multiplier() -> f64 {
    2.0
}
fn default_jitter_factor() -> f64 {
    0.1
}
fn default_attempt_timeout() -> u64 {
    30
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_seconds: default_tick_interval(),
            max_concurrent_deliveries: default_max_concurrent(),
            maintenance_hour: default_maintenance_hour(),
            claim_limit: default_claim_limit(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_interval_ms: default_base_interval_ms(),
            max_interval_ms: default_max_interval_ms(),
            multiplier: default_multiplier(),
            jitter_factor: default_jitter_factor(),
            attempt_timeout_seconds: default_attempt_timeout(),
        }
    }
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序：
    /// 1. 配置文件（TOML格式）
    /// 2. 环境变量覆盖（前缀: REMINDER_）
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_path {
            if Path::new(path).exists() {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            } else {
                return Err(anyhow::anyhow!("配置文件不存在: {}", path));
            }
        } else {
            let default_paths = [
                "config/reminder.toml",
                "reminder.toml",
                "/etc/reminder/config.toml",
            ];
            for path in &default_paths {
                if Path::new(path).exists() {
                    builder = builder.add_source(File::new(path, FileFormat::Toml));
                    break;
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("REMINDER")
                .separator("_")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .context("构建配置失败")?
            .try_deserialize()
            .context("反序列化配置失败")?;

        config.validate()?;
        Ok(config)
    }

    /// 从TOML字符串加载配置
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(toml_str).context("解析TOML配置失败")?;
        config.validate()?;
        Ok(config)
    }

    /// 校验配置有效性
    pub fn validate(&self) -> Result<()> {
        if self.scheduler.tick_interval_seconds == 0 {
            return Err(anyhow::anyhow!("调度间隔必须大于0秒"));
        }
        if self.scheduler.max_concurrent_deliveries == 0 {
            return Err(anyhow::anyhow!("并发投递上限必须大于0"));
        }
        if self.scheduler.maintenance_hour > 23 {
            return Err(anyhow::anyhow!(
                "维护小时无效: {}",
                self.scheduler.maintenance_hour
            ));
        }
        if self.calendar.url.is_empty() {
            return Err(anyhow::anyhow!("日历数据源地址不能为空"));
        }
        if self.notifier.retry.max_attempts == 0 {
            return Err(anyhow::anyhow!("重试次数必须大于0"));
        }
        if self.notifier.retry.multiplier < 1.0 {
            return Err(anyhow::anyhow!("重试退避倍数必须不小于1.0"));
        }
        Ok(())
    }
}
