//! 任务生命周期管理
//!
//! 状态机：待计算 → 待执行 → 执行中 → {待执行, 待计算, 执行完成, 失败}。
//! 任何状态转换都不跳过执行中；周期任务无论单轮投递成败都会推进到下一轮。

use chrono::{DateTime, Datelike, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use reminder_calendar::CalendarStore;
use reminder_core::models::{DeliveryOutcome, Task, TaskResponse, TaskStatus};
use reminder_core::traits::TaskRepository;
use reminder_core::{ReminderError, Result};

use crate::resolver::{resolve_next_fire, Resolution};

/// 任务生命周期管理器
pub struct TaskLifecycleManager {
    task_repo: Arc<dyn TaskRepository>,
    calendar: Arc<CalendarStore>,
    claim_limit: usize,
}

impl TaskLifecycleManager {
    pub fn new(
        task_repo: Arc<dyn TaskRepository>,
        calendar: Arc<CalendarStore>,
        claim_limit: usize,
    ) -> Self {
        Self {
            task_repo,
            calendar,
            claim_limit,
        }
    }

    /// 注册新任务
    ///
    /// 完成首次触发时间解析后持久化。解析失败的任务以失败状态落库并
    /// 记录原因，而不是拒绝请求；日历数据不足时落库为待计算，等待每日
    /// 维护补齐后重新解析。
    pub async fn register_task(&self, mut task: Task) -> Result<Task> {
        let now = Utc::now();
        match resolve_next_fire(&task.schedule, task.created_at, now, &*self.calendar).await {
            Ok(Resolution::FireAt(at)) => {
                task.status = TaskStatus::Scheduled;
                task.next_fire_at = Some(at);
                info!("任务 '{}' 已调度，下次触发 {}", task.name, at);
            }
            Ok(Resolution::Deferred { missing_date }) => {
                task.status = TaskStatus::PendingCalculation;
                task.next_fire_at = None;
                warn!(
                    "任务 '{}' 缺少{}的日历数据，转入待计算",
                    task.name, missing_date
                );
            }
            Ok(Resolution::Exhausted) => {
                task.record_error("调度规则已无未来触发时间");
                task.status = TaskStatus::Failed;
                task.next_fire_at = None;
                warn!("任务 '{}' 注册时已无未来触发时间", task.name);
            }
            Err(e) => {
                task.record_error(&e.to_string());
                task.status = TaskStatus::Failed;
                task.next_fire_at = None;
                warn!("任务 '{}' 调度规则无效: {}", task.name, e);
            }
        }
        self.task_repo.create(&task).await
    }

    /// 认领到期任务，返回时状态已置为执行中
    pub async fn claim_due(&self, now: DateTime<Utc>) -> Result<Vec<Task>> {
        self.task_repo.claim_due_tasks(now, self.claim_limit).await
    }

    /// 回写单次投递结果
    ///
    /// 软删除标记的任务在这里被真正删除。周期任务即使本轮投递失败也
    /// 会重新调度，失败原因记录在任务上。
    pub async fn record_outcome(&self, task_id: Uuid, outcome: DeliveryOutcome) -> Result<()> {
        let mut task = self
            .task_repo
            .get_by_id(task_id)
            .await?
            .ok_or(ReminderError::TaskNotFound { id: task_id })?;

        if task.pending_delete {
            info!("任务 '{}' 已标记删除，投递结束后移除", task.name);
            return self.task_repo.delete(task_id).await;
        }

        let delivered = match outcome {
            DeliveryOutcome::Delivered => true,
            DeliveryOutcome::Failed { reason } => {
                warn!("任务 '{}' 投递失败: {}", task.name, reason);
                task.record_error(&reason);
                false
            }
        };

        if task.is_recurring() {
            match resolve_next_fire(&task.schedule, task.created_at, Utc::now(), &*self.calendar)
                .await
            {
                Ok(Resolution::FireAt(at)) => {
                    task.status = TaskStatus::Scheduled;
                    task.next_fire_at = Some(at);
                    debug!("任务 '{}' 下次触发 {}", task.name, at);
                }
                Ok(Resolution::Deferred { missing_date }) => {
                    task.status = TaskStatus::PendingCalculation;
                    task.next_fire_at = None;
                    warn!(
                        "任务 '{}' 缺少{}的日历数据，转入待计算",
                        task.name, missing_date
                    );
                }
                Ok(Resolution::Exhausted) => {
                    task.status = TaskStatus::Completed;
                    task.next_fire_at = None;
                    info!("任务 '{}' 超出有效期，周期结束", task.name);
                }
                Err(e) => {
                    task.record_error(&e.to_string());
                    task.status = TaskStatus::Failed;
                    task.next_fire_at = None;
                    error!("任务 '{}' 重新调度失败: {}", task.name, e);
                }
            }
        } else {
            task.next_fire_at = None;
            task.status = if delivered {
                TaskStatus::Completed
            } else {
                TaskStatus::Failed
            };
        }

        self.task_repo.update(&task).await
    }

    /// 每日维护
    ///
    /// 先补齐当年与下一年的日历数据，再重新解析所有待计算任务。
    /// 幂等；数据源失败时受影响的任务保持待计算，等待下次维护。
    pub async fn run_daily_maintenance(&self, now: DateTime<Utc>) -> Result<()> {
        let year = now.year();
        self.calendar.ensure_years(&[year, year + 1], false).await;

        let pending = self
            .task_repo
            .get_by_status(TaskStatus::PendingCalculation)
            .await?;
        let total = pending.len();
        let mut promoted = 0usize;

        for mut task in pending {
            if !task.is_recurring() {
                // 非周期任务的解析不依赖日历，滞留待计算说明状态异常
                task.record_error("非周期任务滞留待计算状态");
                task.status = TaskStatus::Failed;
                self.task_repo.update(&task).await?;
                continue;
            }

            match resolve_next_fire(&task.schedule, task.created_at, now, &*self.calendar).await {
                Ok(Resolution::FireAt(at)) => {
                    task.status = TaskStatus::Scheduled;
                    task.next_fire_at = Some(at);
                    self.task_repo.update(&task).await?;
                    promoted += 1;
                }
                Ok(Resolution::Deferred { missing_date }) => {
                    debug!(
                        "任务 '{}' 仍缺少{}的日历数据，保持待计算",
                        task.name, missing_date
                    );
                }
                Ok(Resolution::Exhausted) => {
                    task.status = TaskStatus::Completed;
                    task.next_fire_at = None;
                    self.task_repo.update(&task).await?;
                }
                Err(e) => {
                    task.record_error(&e.to_string());
                    task.status = TaskStatus::Failed;
                    task.next_fire_at = None;
                    self.task_repo.update(&task).await?;
                }
            }
        }

        info!("每日维护完成: 待计算任务{}个，恢复调度{}个", total, promoted);
        Ok(())
    }

    /// 删除任务
    ///
    /// 执行中的任务只做软删除标记，待投递结果回写后真正移除。
    pub async fn mark_for_deletion(&self, task_id: Uuid) -> Result<()> {
        let mut task = self
            .task_repo
            .get_by_id(task_id)
            .await?
            .ok_or(ReminderError::TaskNotFound { id: task_id })?;

        if task.status == TaskStatus::Running {
            task.pending_delete = true;
            self.task_repo.update(&task).await?;
            info!("任务 '{}' 正在执行，已标记延迟删除", task.name);
            Ok(())
        } else {
            self.task_repo.delete(task_id).await
        }
    }

    /// 查询单个任务视图
    pub async fn task_response(&self, task_id: Uuid) -> Result<TaskResponse> {
        self.task_repo
            .get_by_id(task_id)
            .await?
            .map(|t| TaskResponse::from(&t))
            .ok_or(ReminderError::TaskNotFound { id: task_id })
    }

    /// 列出全部任务视图
    pub async fn list_tasks(&self) -> Result<Vec<TaskResponse>> {
        Ok(self
            .task_repo
            .list()
            .await?
            .iter()
            .map(TaskResponse::from)
            .collect())
    }
}
