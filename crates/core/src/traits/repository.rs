//! 数据仓储层接口定义
//!
//! 持久化技术本身不在本系统范围内，所有存储访问都走这里的抽象接口。
//! 实现必须是 `Send + Sync`，支持并发的状态更新和查询。

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::errors::Result;
use crate::models::{CalendarDay, Task, TaskStatus};

/// 任务仓储接口
///
/// 除基础CRUD外，`claim_due_tasks` 承担调度核心语义：
/// 到期任务必须以条件更新的方式原子地从待执行置为执行中，
/// 保证同一到期时间只有一个调用方认领成功。
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// 持久化新任务
    async fn create(&self, task: &Task) -> Result<Task>;

    /// 根据ID获取任务
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Task>>;

    /// 整体更新任务
    async fn update(&self, task: &Task) -> Result<()>;

    /// 删除任务
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// 列出全部任务
    async fn list(&self) -> Result<Vec<Task>>;

    /// 按状态查询任务
    async fn get_by_status(&self, status: TaskStatus) -> Result<Vec<Task>>;

    /// 认领到期任务
    ///
    /// 返回 `next_fire_at <= now` 且状态为待执行的任务，
    /// 返回前已将其状态原子地置为执行中。
    async fn claim_due_tasks(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<Task>>;
}

/// 日历仓储接口
#[async_trait]
pub trait CalendarRepository: Send + Sync {
    /// 按日期查询日历条目，缺失返回 `Ok(None)`
    async fn get_day(&self, date: NaiveDate) -> Result<Option<CalendarDay>>;

    /// 统计某年已存储的条目数
    async fn count_year(&self, year: i32) -> Result<usize>;

    /// 以整年为单位替换日历数据
    async fn replace_year(&self, year: i32, days: Vec<CalendarDay>) -> Result<()>;
}
