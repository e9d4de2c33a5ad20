use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use moka::future::Cache;

use crate::model::holiday::Holiday;
use crate::store::WorkflowStore;
use crate::workflow::{calendar, error::WorkflowResult};

/// Holidays that can fall in a given year, cached per year.
///
/// The calendar changes rarely while every leave create/approve needs it,
/// so lookups are served from memory until the TTL expires or a holiday is
/// added.
pub struct HolidayCache {
    store: Arc<dyn WorkflowStore>,
    by_year: Cache<i32, Arc<Vec<Holiday>>>,
}

impl HolidayCache {
    pub fn new(store: Arc<dyn WorkflowStore>, ttl: Duration) -> Self {
        Self {
            store,
            by_year: Cache::builder()
                .max_capacity(64) // a few years either side of today
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn for_year(&self, year: i32) -> WorkflowResult<Arc<Vec<Holiday>>> {
        if let Some(holidays) = self.by_year.get(&year).await {
            return Ok(holidays);
        }

        let holidays = Arc::new(self.store.holidays_for_year(year).await?);
        self.by_year.insert(year, holidays.clone()).await;
        tracing::debug!(year, count = holidays.len(), "Holiday cache filled");
        Ok(holidays)
    }

    /// Every holiday relevant to `[start, end]`, across all spanned years
    pub async fn for_range(&self, start: NaiveDate, end: NaiveDate) -> WorkflowResult<Vec<Holiday>> {
        let mut holidays: Vec<Holiday> = Vec::new();
        for year in start.year()..=end.year() {
            for holiday in self.for_year(year).await?.iter() {
                // recurring rows come back for every year
                if !holidays.iter().any(|h| h.id == holiday.id) {
                    holidays.push(holiday.clone());
                }
            }
        }
        Ok(holidays)
    }

    pub async fn working_days(&self, start: NaiveDate, end: NaiveDate) -> WorkflowResult<i32> {
        let holidays = self.for_range(start, end).await?;
        Ok(calendar::working_days(start, end, &holidays))
    }

    pub fn invalidate(&self) {
        self.by_year.invalidate_all();
    }
}
