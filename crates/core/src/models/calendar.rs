use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 日期三分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DayClass {
    /// 工作日（含调休补班的周末）
    Workday,
    /// 普通周末
    Weekend,
    /// 法定节假日
    Holiday,
}

impl std::fmt::Display for DayClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DayClass::Workday => "工作日",
            DayClass::Weekend => "周末",
            DayClass::Holiday => "节假日",
        };
        write!(f, "{s}")
    }
}

/// 单个日历日条目
///
/// 按日期不可变；强制刷新以整年为单位替换。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub classification: DayClass,
    /// 数据源给出的类别描述，如 "春节"
    pub type_description: Option<String>,
    /// 数据源给出的农历标签，如 "正月初一"
    pub lunar_label: Option<String>,
    /// 从农历标签解析出的农历月，解析失败时为空
    pub lunar_month: Option<u8>,
    /// 从农历标签解析出的农历日，解析失败时为空
    pub lunar_day: Option<u8>,
}

impl CalendarDay {
    pub fn new(date: NaiveDate, classification: DayClass) -> Self {
        Self {
            date,
            classification,
            type_description: None,
            lunar_label: None,
            lunar_month: None,
            lunar_day: None,
        }
    }

    /// 农历限制可用的数值信息
    pub fn lunar_date(&self) -> Option<(u8, u8)> {
        match (self.lunar_month, self.lunar_day) {
            (Some(m), Some(d)) => Some((m, d)),
            _ => None,
        }
    }
}
