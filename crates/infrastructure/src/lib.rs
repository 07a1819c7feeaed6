//! 内存存储实现
//!
//! 单进程场景下的任务与日历仓储。持久化后端可通过实现
//! `reminder-core` 的仓储接口替换。

pub mod memory;

pub use memory::{InMemoryCalendarRepository, InMemoryTaskRepository};
