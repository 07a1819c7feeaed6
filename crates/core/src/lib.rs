pub mod config;
pub mod duration;
pub mod errors;
pub mod models;
pub mod traits;

pub use config::AppConfig;
pub use duration::parse_countdown;
pub use errors::{ReminderError, Result};
pub use models::{
    CalendarDay, ChannelSpec, CronRule, DayClass, DayLimit, DeliveryOutcome, EmailConfig,
    LunarRule, ScheduleSpec, Task, TaskResponse, TaskStatus, WebhookConfig,
};
pub use traits::{CalendarLookup, CalendarProvider, CalendarRepository, Notifier, TaskRepository};
