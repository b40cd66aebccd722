//! Calendar helpers
//!
//! Lenient date parsing (unparsable input yields `None`, never an error) and
//! the week/month arithmetic used by the period builder.

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, TimeZone};

const DATE_FORMAT: &str = "%Y-%m-%d";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse a calendar date such as `2024-01-10`.
///
/// Full timestamps are accepted too; only their date part is kept.
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
        return Some(date);
    }
    // `2024-01-10T00:00:00.000Z` style values: the date the user picked
    trimmed
        .get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, DATE_FORMAT).ok())
}

/// Parse a timestamp and return its calendar date in host local time.
///
/// Accepts RFC 3339 (converted to local time), naive date-times (taken as
/// local), bare dates and epoch milliseconds written as text.
pub fn parse_timestamp_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Local).date_naive());
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt.date());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
        return Some(date);
    }

    trimmed.parse::<i64>().ok().and_then(millis_to_local_date)
}

/// Parse a local wall-clock instant, as accepted by [`parse_timestamp_date`]
pub fn parse_local_datetime(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Local).naive_local());
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Local calendar date of an epoch-millisecond instant
pub fn millis_to_local_date(millis: i64) -> Option<NaiveDate> {
    Local
        .timestamp_millis_opt(millis)
        .earliest()
        .map(|dt| dt.date_naive())
}

/// Monday on or before `date`
pub fn start_of_week(date: NaiveDate) -> NaiveDate {
    date.checked_sub_signed(chrono::Duration::days(
        date.weekday().num_days_from_monday() as i64,
    ))
    .unwrap_or(NaiveDate::MIN)
}

/// First day of the month containing `date`
pub fn start_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Last day of the month containing `date`
pub fn end_of_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first_of_next| first_of_next.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

/// Shift `date` back by whole months, clamping the day to the target month
pub fn months_back(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_sub_months(chrono::Months::new(months))
        .unwrap_or(NaiveDate::MIN)
}

/// Round half away from zero to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
