//! 测试辅助：日历假实现与数据构造器
//!
//! 供单元测试与组件测试共用。

pub mod mocks {
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::RwLock;

    use reminder_core::models::{CalendarDay, DayClass};
    use reminder_core::traits::{CalendarLookup, CalendarProvider};
    use reminder_core::{ReminderError, Result};

    /// 基于内存表的日历查询假实现
    #[derive(Default)]
    pub struct FakeCalendar {
        days: RwLock<HashMap<NaiveDate, CalendarDay>>,
        pub lookups: AtomicUsize,
    }

    impl FakeCalendar {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn put(&self, day: CalendarDay) {
            self.days.write().unwrap().insert(day.date, day);
        }

        pub fn put_range(&self, days: Vec<CalendarDay>) {
            let mut map = self.days.write().unwrap();
            for day in days {
                map.insert(day.date, day);
            }
        }
    }

    #[async_trait]
    impl CalendarLookup for FakeCalendar {
        async fn day(&self, date: NaiveDate) -> Result<Option<CalendarDay>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(self.days.read().unwrap().get(&date).cloned())
        }
    }

    /// 返回预置数据的日历数据源假实现
    #[derive(Default)]
    pub struct StaticProvider {
        years: RwLock<HashMap<i32, Vec<CalendarDay>>>,
        pub calls: AtomicUsize,
        pub fail: AtomicBool,
    }

    impl StaticProvider {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn put_year(&self, year: i32, days: Vec<CalendarDay>) {
            self.years.write().unwrap().insert(year, days);
        }

        pub fn set_fail(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl CalendarProvider for StaticProvider {
        async fn fetch_year(&self, year: i32) -> Result<Vec<CalendarDay>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(ReminderError::Provider("数据源不可用".to_string()));
            }
            Ok(self
                .years
                .read()
                .unwrap()
                .get(&year)
                .cloned()
                .unwrap_or_default())
        }
    }

    /// 构造一个工作日条目
    pub fn workday(date: NaiveDate) -> CalendarDay {
        CalendarDay::new(date, DayClass::Workday)
    }

    /// 构造一个周末条目
    pub fn weekend(date: NaiveDate) -> CalendarDay {
        CalendarDay::new(date, DayClass::Weekend)
    }

    /// 构造一个节假日条目
    pub fn holiday(date: NaiveDate) -> CalendarDay {
        CalendarDay::new(date, DayClass::Holiday)
    }

    /// 附加农历信息
    pub fn with_lunar(mut day: CalendarDay, label: &str, month: u8, lunar_day: u8) -> CalendarDay {
        day.lunar_label = Some(label.to_string());
        day.lunar_month = Some(month);
        day.lunar_day = Some(lunar_day);
        day
    }

    /// 按星期几填充一段连续日期：周一到周五工作日，周六周日周末
    pub fn plain_range(start: NaiveDate, days: i64) -> Vec<CalendarDay> {
        use chrono::Datelike;
        (0..days)
            .map(|i| {
                let date = start + chrono::Duration::days(i);
                if date.weekday().number_from_monday() >= 6 {
                    weekend(date)
                } else {
                    workday(date)
                }
            })
            .collect()
    }
}
