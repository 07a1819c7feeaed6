use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::Result;
use crate::models::CalendarDay;

/// 日历数据源接口
///
/// 拉取失败必须返回 `ReminderError::Provider`，不得破坏已有数据。
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// 拉取整年的日历数据
    async fn fetch_year(&self, year: i32) -> Result<Vec<CalendarDay>>;
}

/// 日历查询接口
///
/// 触发时间解析只依赖这一层。缺失日期返回 `Ok(None)`，
/// 与任何一种日期分类都是不同的信号。
#[async_trait]
pub trait CalendarLookup: Send + Sync {
    async fn day(&self, date: NaiveDate) -> Result<Option<CalendarDay>>;
}
