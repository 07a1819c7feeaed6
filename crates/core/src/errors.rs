use thiserror::Error;
use uuid::Uuid;

/// 提醒系统错误类型定义
#[derive(Debug, Error)]
pub enum ReminderError {
    #[error("任务未找到: {id}")]
    TaskNotFound { id: Uuid },

    #[error("无效的CRON表达式: {expr} - {message}")]
    InvalidCron { expr: String, message: String },

    #[error("无效的倒计时时长: {0}")]
    InvalidCountdown(String),

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("日历数据源错误: {0}")]
    Provider(String),

    #[error("通知渠道错误: {0}")]
    Channel(String),

    #[error("存储错误: {0}")]
    Storage(String),

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for ReminderError {
    fn from(e: serde_json::Error) -> Self {
        ReminderError::Serialization(e.to_string())
    }
}

/// 统一的Result类型
pub type Result<T> = std::result::Result<T, ReminderError>;
