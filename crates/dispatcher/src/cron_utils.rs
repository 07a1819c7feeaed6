use chrono::{DateTime, Utc};
use cron::Schedule;
use std::str::FromStr;

use reminder_core::{ReminderError, Result};

/// CRON表达式解析和候选时间迭代工具
///
/// 接受标准5段表达式（分 时 日 月 周），内部补齐秒段；
/// 6段或7段表达式原样使用。
#[derive(Debug)]
pub struct CronScheduler {
    schedule: Schedule,
}

impl CronScheduler {
    /// 创建新的CRON调度器
    pub fn new(cron_expr: &str) -> Result<Self> {
        let normalized = Self::normalize(cron_expr);
        let schedule =
            Schedule::from_str(&normalized).map_err(|e| ReminderError::InvalidCron {
                expr: cron_expr.to_string(),
                message: e.to_string(),
            })?;
        Ok(Self { schedule })
    }

    /// 标准5段表达式补齐秒段
    fn normalize(cron_expr: &str) -> String {
        let fields = cron_expr.split_whitespace().count();
        if fields == 5 {
            format!("0 {}", cron_expr.trim())
        } else {
            cron_expr.trim().to_string()
        }
    }

    /// 获取严格晚于 `from` 的下一次执行时间
    pub fn next_after(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&from).next()
    }

    /// 获取严格晚于 `from` 的最多 `count` 个执行时间
    pub fn upcoming_times(&self, from: DateTime<Utc>, count: usize) -> Vec<DateTime<Utc>> {
        self.schedule.after(&from).take(count).collect()
    }

    /// 校验CRON表达式是否有效
    pub fn validate(cron_expr: &str) -> Result<()> {
        Self::new(cron_expr).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_five_field_expression_is_normalized() {
        let scheduler = CronScheduler::new("30 9 * * *").unwrap();
        let from = Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap();
        let next = scheduler.next_after(from).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 6, 3, 9, 30, 0).unwrap());
    }

    #[test]
    fn test_six_field_expression_kept_as_is() {
        let scheduler = CronScheduler::new("15 0 12 * * *").unwrap();
        let from = Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap();
        let next = scheduler.next_after(from).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 6, 3, 12, 0, 15).unwrap());
    }

    #[test]
    fn test_invalid_expression() {
        let err = CronScheduler::new("not a cron").unwrap_err();
        assert!(matches!(err, ReminderError::InvalidCron { .. }));
        assert!(CronScheduler::validate("61 * * * *").is_err());
        assert!(CronScheduler::validate("*/5 * * * *").is_ok());
    }

    #[test]
    fn test_upcoming_times_are_strictly_increasing() {
        let scheduler = CronScheduler::new("0 9 * * *").unwrap();
        let from = Utc.with_ymd_and_hms(2024, 6, 3, 10, 0, 0).unwrap();
        let times = scheduler.upcoming_times(from, 5);
        assert_eq!(times.len(), 5);
        for pair in times.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert!(times[0] > from);
    }
}
