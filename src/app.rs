use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tracing::info;
use uuid::Uuid;

use reminder_calendar::{CalendarStore, HttpCalendarProvider};
use reminder_core::config::AppConfig;
use reminder_core::models::{Task, TaskResponse};
use reminder_dispatcher::{SchedulerLoop, TaskLifecycleManager};
use reminder_infrastructure::{InMemoryCalendarRepository, InMemoryTaskRepository};
use reminder_notifier::NotificationDispatcher;

/// 主应用程序
///
/// 组装仓储、日历存储、生命周期管理器、通知投递器与调度循环。
pub struct Application {
    lifecycle: Arc<TaskLifecycleManager>,
    calendar: Arc<CalendarStore>,
    scheduler: SchedulerLoop,
}

impl Application {
    /// 创建应用实例
    pub async fn new(config: AppConfig) -> Result<Self> {
        info!("初始化提醒调度系统");

        let task_repo = Arc::new(InMemoryTaskRepository::new());
        let calendar_repo = Arc::new(InMemoryCalendarRepository::new());
        let provider = Arc::new(
            HttpCalendarProvider::new(config.calendar.clone()).context("初始化日历数据源失败")?,
        );
        let calendar = Arc::new(CalendarStore::new(calendar_repo, provider));

        let lifecycle = Arc::new(TaskLifecycleManager::new(
            task_repo,
            Arc::clone(&calendar),
            config.scheduler.claim_limit,
        ));

        let notifier = Arc::new(
            NotificationDispatcher::new(config.notifier.clone()).context("初始化通知投递器失败")?,
        );

        let scheduler = SchedulerLoop::new(
            Arc::clone(&lifecycle),
            notifier,
            config.scheduler.clone(),
        );

        Ok(Self {
            lifecycle,
            calendar,
            scheduler,
        })
    }

    /// 运行应用直到收到关闭信号
    pub async fn run(&self, shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        // 启动时先补齐日历并恢复待计算任务，失败不阻塞启动
        if let Err(e) = self.lifecycle.run_daily_maintenance(chrono::Utc::now()).await {
            tracing::warn!("启动时维护失败: {}", e);
        }

        self.scheduler.run(shutdown_rx).await?;
        info!("调度循环已停止");
        Ok(())
    }

    /// 注册新任务
    pub async fn register_task(&self, task: Task) -> Result<Task> {
        Ok(self.lifecycle.register_task(task).await?)
    }

    /// 删除任务，执行中的任务延迟到投递结束
    pub async fn delete_task(&self, task_id: Uuid) -> Result<()> {
        Ok(self.lifecycle.mark_for_deletion(task_id).await?)
    }

    /// 查询单个任务
    pub async fn get_task(&self, task_id: Uuid) -> Result<TaskResponse> {
        Ok(self.lifecycle.task_response(task_id).await?)
    }

    /// 列出全部任务
    pub async fn list_tasks(&self) -> Result<Vec<TaskResponse>> {
        Ok(self.lifecycle.list_tasks().await?)
    }

    /// 刷新指定年份的日历数据
    ///
    /// 非强制刷新对已完整的年份是无操作；强制刷新整年替换。
    /// 返回是否实际发生了拉取。
    pub async fn refresh_calendar(&self, year: i32, force: bool) -> Result<bool> {
        Ok(self.calendar.refresh_year(year, force).await?)
    }

    /// 手动触发一次每日维护
    pub async fn run_maintenance(&self) -> Result<()> {
        Ok(self.lifecycle.run_daily_maintenance(chrono::Utc::now()).await?)
    }
}
