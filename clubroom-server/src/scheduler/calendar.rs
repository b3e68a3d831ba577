//! Calendar month windows in the business timezone

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use super::error::{ScheduleError, ScheduleResult};
use crate::utils::ErrorCode;
use crate::utils::time;

/// Half-open `[start, end)` covering one local calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthWindow {
    pub year: i32,
    pub month: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl MonthWindow {
    pub fn new(year: i32, month: u32, tz: Tz) -> ScheduleResult<Self> {
        let first = first_of_month(year, month)?;
        let (next_year, next_month) = next_month(year, month);
        let next = first_of_month(next_year, next_month)?;

        Ok(Self {
            year,
            month,
            start: time::day_start(first, tz),
            end: time::day_start(next, tz),
        })
    }
}

fn first_of_month(year: i32, month: u32) -> ScheduleResult<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
        ScheduleError::validation(
            ErrorCode::ValidationFailed,
            format!("Invalid month: {year}-{month:02}"),
        )
    })
}

fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month >= 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}
