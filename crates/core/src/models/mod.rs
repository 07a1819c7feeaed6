//! # 数据模型
//!
//! 提醒系统的核心数据结构：任务实体、调度规则、渠道配置与日历数据。

pub mod calendar;
pub mod task;

pub use calendar::{CalendarDay, DayClass};
pub use task::{
    ChannelSpec, CronRule, DayLimit, DeliveryOutcome, EmailConfig, LunarRule, ScheduleSpec, Task,
    TaskResponse, TaskStatus, WebhookConfig,
};
