//! 调度循环
//!
//! 固定间隔认领到期任务，经信号量限流后并发投递；慢投递不阻塞后续
//! 节拍，未认领的任务保持待执行。每日维护在到点后的首个节拍触发，
//! 脱离节拍路径执行。

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, Semaphore};
use tracing::{debug, error, info};

use reminder_core::config::SchedulerConfig;
use reminder_core::models::DeliveryOutcome;
use reminder_core::traits::Notifier;
use reminder_core::Result;

use crate::lifecycle::TaskLifecycleManager;

/// 调度循环
pub struct SchedulerLoop {
    lifecycle: Arc<TaskLifecycleManager>,
    notifier: Arc<dyn Notifier>,
    config: SchedulerConfig,
    semaphore: Arc<Semaphore>,
    last_maintenance: Mutex<Option<NaiveDate>>,
}

impl SchedulerLoop {
    pub fn new(
        lifecycle: Arc<TaskLifecycleManager>,
        notifier: Arc<dyn Notifier>,
        config: SchedulerConfig,
    ) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_deliveries));
        Self {
            lifecycle,
            notifier,
            config,
            semaphore,
            last_maintenance: Mutex::new(None),
        }
    }

    /// 运行调度循环直到收到关闭信号
    ///
    /// 关闭时不取消在途投递，由投递任务自行完成并回写。
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        let mut ticker = tokio::time::interval(Duration::from_secs(
            self.config.tick_interval_seconds,
        ));
        info!(
            "调度循环启动，间隔{}秒，并发上限{}",
            self.config.tick_interval_seconds, self.config.max_concurrent_deliveries
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick(Utc::now()).await;
                }
                _ = shutdown_rx.recv() => {
                    info!("调度循环收到关闭信号");
                    break;
                }
            }
        }
        Ok(())
    }

    /// 单个调度节拍
    pub async fn tick(&self, now: DateTime<Utc>) {
        self.maybe_run_maintenance(now).await;

        let due = match self.lifecycle.claim_due(now).await {
            Ok(tasks) => tasks,
            Err(e) => {
                error!("认领到期任务失败: {}", e);
                return;
            }
        };
        if due.is_empty() {
            return;
        }
        debug!("本节拍认领{}个到期任务", due.len());

        for task in due {
            let semaphore = Arc::clone(&self.semaphore);
            let lifecycle = Arc::clone(&self.lifecycle);
            let notifier = Arc::clone(&self.notifier);

            // 限流等待发生在投递任务内部，节拍路径不等待许可
            tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                };
                let outcome = match notifier.deliver(&task).await {
                    Ok(()) => DeliveryOutcome::Delivered,
                    Err(e) => DeliveryOutcome::Failed {
                        reason: e.to_string(),
                    },
                };
                if let Err(e) = lifecycle.record_outcome(task.id, outcome).await {
                    error!("回写任务{}投递结果失败: {}", task.id, e);
                }
            });
        }
    }

    /// 到达维护小时后，当天首个节拍触发每日维护
    async fn maybe_run_maintenance(&self, now: DateTime<Utc>) {
        let local = now.with_timezone(&chrono::Local);
        let today = local.date_naive();
        {
            let mut last = self.last_maintenance.lock().await;
            if local.hour() < self.config.maintenance_hour || *last == Some(today) {
                return;
            }
            *last = Some(today);
        }

        let lifecycle = Arc::clone(&self.lifecycle);
        tokio::spawn(async move {
            if let Err(e) = lifecycle.run_daily_maintenance(Utc::now()).await {
                error!("每日维护失败: {}", e);
            }
        });
    }
}
