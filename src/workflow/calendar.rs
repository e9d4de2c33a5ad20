use std::collections::HashSet;

use chrono::{Datelike, NaiveDate, Weekday};

use crate::model::holiday::Holiday;
use crate::workflow::error::{WorkflowError, WorkflowResult};

/// Longest inclusive range, in calendar days, that is ever counted
pub const MAX_RANGE_DAYS: i64 = 3 * 366;

/// Ordering and length checks for a requested date range
pub fn validate_range(start: NaiveDate, end: NaiveDate) -> WorkflowResult<()> {
    if start > end {
        return Err(WorkflowError::Validation(
            "start_date cannot be after end_date".into(),
        ));
    }
    let span = (end - start).num_days() + 1;
    if span > MAX_RANGE_DAYS {
        return Err(WorkflowError::Validation(format!(
            "date range of {span} days exceeds the maximum of {MAX_RANGE_DAYS} days"
        )));
    }
    Ok(())
}

/// Dates inside `[start, end]` that are holidays.
///
/// Recurring holidays are projected onto every calendar year the range
/// touches, so each one can land at most once per year. A recurring Feb 29
/// only lands in leap years.
pub fn holidays_in_range(holidays: &[Holiday], start: NaiveDate, end: NaiveDate) -> HashSet<NaiveDate> {
    let mut dates = HashSet::new();

    for holiday in holidays {
        if holiday.is_recurring {
            for year in start.year()..=end.year() {
                if let Some(date) =
                    NaiveDate::from_ymd_opt(year, holiday.date.month(), holiday.date.day())
                {
                    if date >= start && date <= end {
                        dates.insert(date);
                    }
                }
            }
        } else if holiday.date >= start && holiday.date <= end {
            dates.insert(holiday.date);
        }
    }

    dates
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Business days in `[start, end]`, both ends included.
///
/// Callers validate ordering; a reversed range counts as zero days.
pub fn working_days(start: NaiveDate, end: NaiveDate, holidays: &[Holiday]) -> i32 {
    if start > end {
        return 0;
    }

    let closed = holidays_in_range(holidays, start, end);

    start
        .iter_days()
        .take_while(|day| *day <= end)
        .filter(|day| !is_weekend(*day) && !closed.contains(day))
        .count() as i32
}
