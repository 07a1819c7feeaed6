//! 日历存储与数据源
//!
//! 缓存按年拉取的工作日/节假日/周末分类及农历信息，
//! 为触发时间解析提供O(1)的按日查询。

pub mod lunar;
pub mod provider;
pub mod store;

pub use provider::HttpCalendarProvider;
pub use store::CalendarStore;
