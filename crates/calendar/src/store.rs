use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{info, warn};

use reminder_core::models::{CalendarDay, DayClass};
use reminder_core::traits::{CalendarLookup, CalendarProvider, CalendarRepository};
use reminder_core::Result;

/// 一年数据不少于这么多条即视为完整（数据源偶有缺日）
const YEAR_COMPLETE_THRESHOLD: usize = 300;

/// 日历存储
///
/// 仓储保存按年拉取的数据，数据源只在缺年或强制刷新时被调用。
/// 数据源失败不破坏已有数据。
pub struct CalendarStore {
    repo: Arc<dyn CalendarRepository>,
    provider: Arc<dyn CalendarProvider>,
}

impl CalendarStore {
    pub fn new(repo: Arc<dyn CalendarRepository>, provider: Arc<dyn CalendarProvider>) -> Self {
        Self { repo, provider }
    }

    /// 按日查询日历条目
    pub async fn day(&self, date: NaiveDate) -> Result<Option<CalendarDay>> {
        self.repo.get_day(date).await
    }

    /// 按日查询日期分类
    pub async fn classify(&self, date: NaiveDate) -> Result<Option<DayClass>> {
        Ok(self.repo.get_day(date).await?.map(|d| d.classification))
    }

    /// 按日查询农历标签
    pub async fn lunar_label(&self, date: NaiveDate) -> Result<Option<String>> {
        Ok(self.repo.get_day(date).await?.and_then(|d| d.lunar_label))
    }

    /// 刷新一年的日历数据
    ///
    /// 非强制刷新时，已完整的年份跳过数据源调用。
    /// 返回是否实际发生了拉取。
    pub async fn refresh_year(&self, year: i32, force: bool) -> Result<bool> {
        if !force {
            let count = self.repo.count_year(year).await?;
            if count >= YEAR_COMPLETE_THRESHOLD {
                return Ok(false);
            }
        }

        let days = self.provider.fetch_year(year).await?;
        let count = days.len();
        self.repo.replace_year(year, days).await?;
        info!("已刷新{}年日历数据，共{}条", year, count);
        Ok(true)
    }

    /// 确保若干年份的日历数据可用
    ///
    /// 单年失败只记录告警，不影响其余年份。
    pub async fn ensure_years(&self, years: &[i32], force: bool) {
        for &year in years {
            if let Err(e) = self.refresh_year(year, force).await {
                warn!("刷新{}年日历数据失败: {}", year, e);
            }
        }
    }
}

#[async_trait]
impl CalendarLookup for CalendarStore {
    async fn day(&self, date: NaiveDate) -> Result<Option<CalendarDay>> {
        self.repo.get_day(date).await
    }
}
