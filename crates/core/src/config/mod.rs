//! 统一配置管理
//!
//! 加载顺序：serde默认值 → TOML配置文件 → REMINDER_前缀环境变量。

pub mod app_config;

pub use app_config::{
    AppConfig, CalendarConfig, MailConfig, NotifierConfig, RetryConfig, SchedulerConfig,
};
