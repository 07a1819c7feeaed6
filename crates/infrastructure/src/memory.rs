use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use reminder_core::models::{CalendarDay, Task, TaskStatus};
use reminder_core::traits::{CalendarRepository, TaskRepository};
use reminder_core::{ReminderError, Result};

/// 内存任务仓储
///
/// 认领操作在写锁内完成状态翻转，保证同一到期任务只被认领一次。
#[derive(Default)]
pub struct InMemoryTaskRepository {
    tasks: Arc<RwLock<HashMap<Uuid, Task>>>,
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn create(&self, task: &Task) -> Result<Task> {
        let mut tasks = self.tasks.write().await;
        if tasks.contains_key(&task.id) {
            return Err(ReminderError::Storage(format!("任务已存在: {}", task.id)));
        }
        tasks.insert(task.id, task.clone());
        Ok(task.clone())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Task>> {
        Ok(self.tasks.read().await.get(&id).cloned())
    }

    async fn update(&self, task: &Task) -> Result<()> {
        let mut tasks = self.tasks.write().await;
        match tasks.get_mut(&task.id) {
            Some(slot) => {
                let mut updated = task.clone();
                updated.updated_at = Utc::now();
                *slot = updated;
                Ok(())
            }
            None => Err(ReminderError::TaskNotFound { id: task.id }),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut tasks = self.tasks.write().await;
        tasks
            .remove(&id)
            .map(|_| ())
            .ok_or(ReminderError::TaskNotFound { id })
    }

    async fn list(&self) -> Result<Vec<Task>> {
        Ok(self.tasks.read().await.values().cloned().collect())
    }

    async fn get_by_status(&self, status: TaskStatus) -> Result<Vec<Task>> {
        Ok(self
            .tasks
            .read()
            .await
            .values()
            .filter(|t| t.status == status)
            .cloned()
            .collect())
    }

    async fn claim_due_tasks(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<Task>> {
        let mut tasks = self.tasks.write().await;
        let mut due: Vec<Uuid> = tasks
            .values()
            .filter(|t| {
                t.status == TaskStatus::Scheduled
                    && t.next_fire_at.map(|at| at <= now).unwrap_or(false)
            })
            .map(|t| t.id)
            .collect();
        // 先到期的先认领
        due.sort_by_key(|id| tasks[id].next_fire_at);
        due.truncate(limit);

        let mut claimed = Vec::with_capacity(due.len());
        for id in due {
            if let Some(task) = tasks.get_mut(&id) {
                task.status = TaskStatus::Running;
                task.updated_at = now;
                claimed.push(task.clone());
            }
        }
        if !claimed.is_empty() {
            debug!("认领了{}个到期任务", claimed.len());
        }
        Ok(claimed)
    }
}

/// 内存日历仓储
#[derive(Default)]
pub struct InMemoryCalendarRepository {
    days: Arc<RwLock<HashMap<NaiveDate, CalendarDay>>>,
}

impl InMemoryCalendarRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CalendarRepository for InMemoryCalendarRepository {
    async fn get_day(&self, date: NaiveDate) -> Result<Option<CalendarDay>> {
        Ok(self.days.read().await.get(&date).cloned())
    }

    async fn count_year(&self, year: i32) -> Result<usize> {
        Ok(self
            .days
            .read()
            .await
            .keys()
            .filter(|d| d.year() == year)
            .count())
    }

    async fn replace_year(&self, year: i32, days: Vec<CalendarDay>) -> Result<()> {
        let mut map = self.days.write().await;
        map.retain(|d, _| d.year() != year);
        for day in days {
            map.insert(day.date, day);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reminder_core::models::{DayClass, ScheduleSpec};

    fn scheduled_task(fire_at: DateTime<Utc>) -> Task {
        let mut task = Task::new("测试任务", "内容", ScheduleSpec::OneTime { fire_at });
        task.status = TaskStatus::Scheduled;
        task.next_fire_at = Some(fire_at);
        task
    }

    #[tokio::test]
    async fn test_task_crud() {
        let repo = InMemoryTaskRepository::new();
        let task = scheduled_task(Utc::now());

        repo.create(&task).await.unwrap();
        assert!(repo.create(&task).await.is_err());

        let loaded = repo.get_by_id(task.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "测试任务");

        repo.delete(task.id).await.unwrap();
        assert!(repo.get_by_id(task.id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete(task.id).await,
            Err(ReminderError::TaskNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_claim_due_tasks_flips_status() {
        let repo = InMemoryTaskRepository::new();
        let now = Utc::now();

        let due = scheduled_task(now - chrono::Duration::seconds(5));
        let future = scheduled_task(now + chrono::Duration::hours(1));
        repo.create(&due).await.unwrap();
        repo.create(&future).await.unwrap();

        let claimed = repo.claim_due_tasks(now, 10).await.unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].id, due.id);
        assert_eq!(claimed[0].status, TaskStatus::Running);

        // 已认领的任务不会被再次认领
        let claimed = repo.claim_due_tasks(now, 10).await.unwrap();
        assert!(claimed.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_claim_is_exclusive() {
        let repo = Arc::new(InMemoryTaskRepository::new());
        let now = Utc::now();
        for _ in 0..20 {
            repo.create(&scheduled_task(now - chrono::Duration::seconds(1)))
                .await
                .unwrap();
        }

        let mut handles = Vec::new();
        for _ in 0..4 {
            let repo = Arc::clone(&repo);
            handles.push(tokio::spawn(
                async move { repo.claim_due_tasks(now, 100).await },
            ));
        }

        let mut total = 0;
        for handle in handles {
            total += handle.await.unwrap().unwrap().len();
        }
        assert_eq!(total, 20);
    }

    #[tokio::test]
    async fn test_calendar_replace_year() {
        let repo = InMemoryCalendarRepository::new();
        let d1 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();

        repo.replace_year(2024, vec![CalendarDay::new(d1, DayClass::Holiday)])
            .await
            .unwrap();
        repo.replace_year(2025, vec![CalendarDay::new(d2, DayClass::Holiday)])
            .await
            .unwrap();
        assert_eq!(repo.count_year(2024).await.unwrap(), 1);

        // 整年替换不影响其他年份
        repo.replace_year(2024, Vec::new()).await.unwrap();
        assert_eq!(repo.count_year(2024).await.unwrap(), 0);
        assert_eq!(repo.count_year(2025).await.unwrap(), 1);
    }
}
