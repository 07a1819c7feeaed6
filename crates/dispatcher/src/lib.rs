//! 调度核心
//!
//! 触发时间解析、任务生命周期状态机与调度循环。

pub mod cron_utils;
pub mod lifecycle;
pub mod resolver;
pub mod scheduler_loop;

pub mod test_utils;

pub use cron_utils::CronScheduler;
pub use lifecycle::TaskLifecycleManager;
pub use resolver::{resolve_next_fire, Resolution};
pub use scheduler_loop::SchedulerLoop;
