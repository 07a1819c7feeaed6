//! 触发时间解析
//!
//! 纯函数式地把调度规则解析为下一次触发时间。日历查询只在规则
//! 需要时发生；日历数据缺失是可恢复信号（Deferred），与规则本身
//! 不可满足（Configuration错误）严格区分。

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use tracing::debug;

use reminder_core::models::{CronRule, DayClass, DayLimit, ScheduleSpec};
use reminder_core::traits::CalendarLookup;
use reminder_core::{parse_countdown, ReminderError, Result};

use crate::cron_utils::CronScheduler;

/// 单次解析最多检查的CRON候选时间数
///
/// 日限制最多跳过一年的日次，超过这个数量仍无匹配视为规则不可满足。
pub const MAX_CRON_CANDIDATES: usize = 366;

/// 解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// 下一次触发时间
    FireAt(DateTime<Utc>),
    /// 不会再触发：一次性任务已错过，或周期任务超出有效期
    Exhausted,
    /// 日历数据缺失，待数据补齐后重新解析
    Deferred { missing_date: NaiveDate },
}

/// 解析调度规则的下一次触发时间
///
/// 倒计时相对创建时间计算；所有比较以 `as_of` 为当前时刻，
/// 返回的触发时间严格晚于 `as_of`。
pub async fn resolve_next_fire(
    schedule: &ScheduleSpec,
    created_at: DateTime<Utc>,
    as_of: DateTime<Utc>,
    calendar: &dyn CalendarLookup,
) -> Result<Resolution> {
    match schedule {
        ScheduleSpec::Countdown { duration } => {
            let d = parse_countdown(duration)?;
            let fire_at = created_at + d;
            if fire_at > as_of {
                Ok(Resolution::FireAt(fire_at))
            } else {
                Ok(Resolution::Exhausted)
            }
        }
        ScheduleSpec::OneTime { fire_at } => {
            if *fire_at > as_of {
                Ok(Resolution::FireAt(*fire_at))
            } else {
                Ok(Resolution::Exhausted)
            }
        }
        ScheduleSpec::Cron(rule) => resolve_cron(rule, as_of, calendar).await,
    }
}

async fn resolve_cron(
    rule: &CronRule,
    as_of: DateTime<Utc>,
    calendar: &dyn CalendarLookup,
) -> Result<Resolution> {
    let scheduler = CronScheduler::new(&rule.expression)?;

    // 候选时间严格晚于from；有效期起点本身允许触发
    let mut from = as_of;
    if let Some(start) = rule.start_time {
        if start > from {
            from = start - chrono::Duration::seconds(1);
        }
    }

    let candidates = scheduler.upcoming_times(from, MAX_CRON_CANDIDATES);
    if candidates.is_empty() {
        return Ok(Resolution::Exhausted);
    }

    for candidate in &candidates {
        if let Some(end) = rule.end_time {
            if *candidate > end {
                return Ok(Resolution::Exhausted);
            }
        }
        match check_candidate(rule, *candidate, calendar).await? {
            Gate::Allow => {
                debug!("CRON候选时间通过: {}", candidate);
                return Ok(Resolution::FireAt(*candidate));
            }
            Gate::Reject => continue,
            Gate::MissingData(date) => {
                return Ok(Resolution::Deferred { missing_date: date });
            }
        }
    }

    if candidates.len() < MAX_CRON_CANDIDATES {
        // 迭代器已耗尽，表达式不会再产生候选
        return Ok(Resolution::Exhausted);
    }

    Err(ReminderError::Configuration(format!(
        "CRON规则 '{}' 在{}个候选时间内无一满足日期限制",
        rule.expression, MAX_CRON_CANDIDATES
    )))
}

enum Gate {
    Allow,
    Reject,
    MissingData(NaiveDate),
}

/// 候选时间是否通过日期限制与农历限制
///
/// 日期限制为任一匹配；农历限制与日期限制同时生效。
async fn check_candidate(
    rule: &CronRule,
    candidate: DateTime<Utc>,
    calendar: &dyn CalendarLookup,
) -> Result<Gate> {
    let date = candidate.date_naive();

    if !rule.limit_days.is_empty() {
        let weekday = candidate.weekday().number_from_monday() as u8;

        // 不依赖日历的限制先判
        let mut matched = rule.limit_days.iter().any(|limit| {
            matches!(limit, DayLimit::Weekdays { days } if days.contains(&weekday))
        });

        if !matched {
            let has_calendar_limit = rule
                .limit_days
                .iter()
                .any(|limit| !matches!(limit, DayLimit::Weekdays { .. }));
            if has_calendar_limit {
                let day = match calendar.day(date).await? {
                    Some(d) => d,
                    None => return Ok(Gate::MissingData(date)),
                };
                matched = rule.limit_days.iter().any(|limit| match limit {
                    DayLimit::Workday => day.classification == DayClass::Workday,
                    DayLimit::Holiday => day.classification == DayClass::Holiday,
                    DayLimit::Weekend => day.classification == DayClass::Weekend,
                    DayLimit::Weekdays { .. } => false,
                });
            }
            if !matched {
                return Ok(Gate::Reject);
            }
        }
    }

    if let Some(lunar) = &rule.lunar {
        let day = match calendar.day(date).await? {
            Some(d) => d,
            None => return Ok(Gate::MissingData(date)),
        };
        match day.lunar_date() {
            Some((month, lunar_day)) => {
                if month != lunar.month || lunar_day != lunar.day {
                    return Ok(Gate::Reject);
                }
            }
            // 有条目但农历信息不可用，同样等待数据补齐
            None => return Ok(Gate::MissingData(date)),
        }
    }

    Ok(Gate::Allow)
}
