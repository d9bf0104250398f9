//! Date parsing and day-window arithmetic.
//!
//! All day math is UTC; a "day" is the half-open interval
//! `[00:00:00, next 00:00:00)`.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use crate::error::{Error, Result};

/// Parse a strict `YYYY-MM-DD` date string.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| Error::invalid_input(format!("invalid date '{}': {}", s, e)))
}

/// UTC midnight at the start of the given date.
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).expect("midnight is always valid"))
}

/// UTC midnight of the following date (exclusive upper bound).
pub fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    start_of_day(date) + Duration::days(1)
}

/// Calendar-day difference `to - from`.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// Shift a date by a signed number of days.
pub fn shift(date: NaiveDate, days: i64) -> NaiveDate {
    date + Duration::days(days)
}

/// The time window of one statistics day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub date: NaiveDate,
    /// Inclusive start of day.
    pub from: DateTime<Utc>,
    /// Exclusive end of day.
    pub to: DateTime<Utc>,
}

impl DayWindow {
    pub fn for_date(date: NaiveDate) -> Self {
        Self {
            date,
            from: start_of_day(date),
            to: end_of_day(date),
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.from && ts < self.to
    }
}
