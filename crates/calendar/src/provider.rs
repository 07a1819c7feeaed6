use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use reminder_core::config::CalendarConfig;
use reminder_core::models::{CalendarDay, DayClass};
use reminder_core::traits::CalendarProvider;
use reminder_core::{ReminderError, Result};

use crate::lunar::parse_lunar_label;

/// 节假日API的响应包装
#[derive(Debug, Deserialize)]
struct ApiResponse {
    code: i32,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    data: Vec<ApiDay>,
}

/// 节假日API的单日条目
///
/// dayType语义：0工作日、1假日（普通休息日）、2节假日。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiDay {
    date: String,
    #[serde(default)]
    week_day: Option<u8>,
    #[serde(default)]
    day_type: Option<u8>,
    #[serde(default)]
    type_des: Option<String>,
    #[serde(default)]
    lunar_calendar: Option<String>,
}

/// 基于HTTP节假日API的日历数据源
pub struct HttpCalendarProvider {
    client: reqwest::Client,
    config: CalendarConfig,
}

impl HttpCalendarProvider {
    pub fn new(config: CalendarConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| ReminderError::Provider(format!("构建HTTP客户端失败: {e}")))?;
        Ok(Self { client, config })
    }

    fn map_day(entry: &ApiDay) -> Result<CalendarDay> {
        let date = NaiveDate::parse_from_str(&entry.date, "%Y-%m-%d").map_err(|e| {
            ReminderError::Provider(format!("无效的日期 '{}': {e}", entry.date))
        })?;
        let week_day = entry
            .week_day
            .unwrap_or_else(|| date.weekday().number_from_monday() as u8);

        let classification = match entry.day_type {
            Some(0) => DayClass::Workday,
            Some(2) => DayClass::Holiday,
            // dayType=1 是普通休息日：落在周末按周末算，工作日里的休息日按节假日算（调休）
            Some(1) => {
                if week_day >= 6 {
                    DayClass::Weekend
                } else {
                    DayClass::Holiday
                }
            }
            _ => {
                if week_day >= 6 {
                    DayClass::Weekend
                } else {
                    DayClass::Workday
                }
            }
        };

        let mut day = CalendarDay::new(date, classification);
        day.type_description = entry.type_des.clone();
        day.lunar_label = entry.lunar_calendar.clone();
        if let Some(label) = &entry.lunar_calendar {
            match parse_lunar_label(label) {
                Some((month, lunar_day)) => {
                    day.lunar_month = Some(month);
                    day.lunar_day = Some(lunar_day);
                }
                None => {
                    warn!("无法解析农历标签: {} ({})", label, entry.date);
                }
            }
        }
        Ok(day)
    }
}

#[async_trait]
impl CalendarProvider for HttpCalendarProvider {
    async fn fetch_year(&self, year: i32) -> Result<Vec<CalendarDay>> {
        let mut query: Vec<(&str, String)> = vec![("year", year.to_string())];
        if let Some(app_id) = &self.config.app_id {
            query.push(("app_id", app_id.clone()));
        }
        if let Some(app_secret) = &self.config.app_secret {
            query.push(("app_secret", app_secret.clone()));
        }

        debug!("拉取{}年日历数据: {}", year, self.config.url);

        let response = self
            .client
            .get(&self.config.url)
            .query(&query)
            .send()
            .await
            .map_err(|e| ReminderError::Provider(format!("日历API请求失败: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReminderError::Provider(format!(
                "日历API返回异常状态: {status}"
            )));
        }

        let body: ApiResponse = response
            .json()
            .await
            .map_err(|e| ReminderError::Provider(format!("日历API响应解析失败: {e}")))?;

        if body.code != 1 {
            return Err(ReminderError::Provider(format!(
                "日历API返回错误: code={}, msg={}",
                body.code,
                body.msg.as_deref().unwrap_or("")
            )));
        }

        let mut days = Vec::with_capacity(body.data.len());
        for entry in &body.data {
            days.push(Self::map_day(entry)?);
        }

        debug!("{}年日历数据共{}条", year, days.len());
        Ok(days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(date: &str, week_day: u8, day_type: Option<u8>) -> ApiDay {
        ApiDay {
            date: date.to_string(),
            week_day: Some(week_day),
            day_type,
            type_des: None,
            lunar_calendar: None,
        }
    }

    #[test]
    fn test_day_type_mapping() {
        let day = HttpCalendarProvider::map_day(&entry("2024-01-02", 2, Some(0))).unwrap();
        assert_eq!(day.classification, DayClass::Workday);

        let day = HttpCalendarProvider::map_day(&entry("2024-02-10", 6, Some(2))).unwrap();
        assert_eq!(day.classification, DayClass::Holiday);

        // 普通休息日落在周末
        let day = HttpCalendarProvider::map_day(&entry("2024-01-06", 6, Some(1))).unwrap();
        assert_eq!(day.classification, DayClass::Weekend);

        // 普通休息日落在工作日（调休）
        let day = HttpCalendarProvider::map_day(&entry("2024-02-15", 4, Some(1))).unwrap();
        assert_eq!(day.classification, DayClass::Holiday);
    }

    #[test]
    fn test_missing_day_type_falls_back_to_weekday() {
        let day = HttpCalendarProvider::map_day(&entry("2024-01-06", 6, None)).unwrap();
        assert_eq!(day.classification, DayClass::Weekend);

        let day = HttpCalendarProvider::map_day(&entry("2024-01-03", 3, None)).unwrap();
        assert_eq!(day.classification, DayClass::Workday);
    }

    #[test]
    fn test_lunar_label_parsed_at_ingest() {
        let mut e = entry("2024-02-10", 6, Some(2));
        e.lunar_calendar = Some("正月初一".to_string());
        let day = HttpCalendarProvider::map_day(&e).unwrap();
        assert_eq!(day.lunar_date(), Some((1, 1)));
        assert_eq!(day.lunar_label.as_deref(), Some("正月初一"));

        // 无法解析的标签保留原文但不产生数值
        let mut e = entry("2024-02-11", 7, Some(2));
        e.lunar_calendar = Some("未知".to_string());
        let day = HttpCalendarProvider::map_day(&e).unwrap();
        assert_eq!(day.lunar_date(), None);
        assert_eq!(day.lunar_label.as_deref(), Some("未知"));
    }

    #[test]
    fn test_malformed_date_is_provider_error() {
        let result = HttpCalendarProvider::map_day(&entry("2024/01/01", 1, Some(0)));
        assert!(matches!(result, Err(ReminderError::Provider(_))));
    }
}
