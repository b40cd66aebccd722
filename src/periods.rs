//! Period building
//!
//! Partitions a date range into contiguous, non-overlapping buckets aligned
//! to calendar days, Monday-start weeks, months or years.

use chrono::{Datelike, Duration, NaiveDate};

use crate::dates::{end_of_month, months_back, start_of_month, start_of_week};
use crate::types::{Period, PeriodMode};

/// Build the ordered periods covering `[start, end]`.
///
/// The first period is aligned to the bucket containing `start`, so it may
/// begin before it. Returns an empty list when `end < start`; callers are
/// expected to order the bounds themselves.
pub fn build_periods(start: NaiveDate, end: NaiveDate, mode: PeriodMode) -> Vec<Period> {
    let mut periods = Vec::new();

    let mut cursor = match mode {
        PeriodMode::Daily => start,
        PeriodMode::Weekly => start_of_week(start),
        PeriodMode::Monthly => start_of_month(start),
        PeriodMode::Yearly => start.with_ordinal(1).unwrap_or(start),
    };

    while cursor <= end {
        let period = period_at(cursor, mode);
        let Some(next) = period.end.succ_opt() else {
            periods.push(period);
            break;
        };
        periods.push(period);
        cursor = next;
    }

    periods
}

/// The period of `mode` that starts at the aligned date `start`.
///
/// A period running past the last representable date is cut short there.
fn period_at(start: NaiveDate, mode: PeriodMode) -> Period {
    match mode {
        PeriodMode::Daily => {
            let key = start.format("%Y-%m-%d").to_string();
            Period {
                label: key.clone(),
                key,
                start,
                end: start,
            }
        }
        PeriodMode::Weekly => Period {
            key: start.format("%Y-%m-%d").to_string(),
            label: start.format("%b %d, %Y").to_string(),
            start,
            end: start
                .checked_add_signed(Duration::days(6))
                .unwrap_or(NaiveDate::MAX),
        },
        PeriodMode::Monthly => Period {
            key: start.format("%Y-%m").to_string(),
            label: start.format("%b %Y").to_string(),
            start,
            end: end_of_month(start),
        },
        PeriodMode::Yearly => {
            let key = start.year().to_string();
            Period {
                label: key.clone(),
                key,
                start,
                end: NaiveDate::from_ymd_opt(start.year(), 12, 31).unwrap_or(start),
            }
        }
    }
}

/// The range shown when the caller supplies none, ending at `today`.
///
/// Daily: the last 7 days. Weekly: the last 8 weeks. Monthly: the last 6
/// months. Yearly: the last 3 years.
pub fn default_range(mode: PeriodMode, today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = match mode {
        PeriodMode::Daily => today
            .checked_sub_signed(Duration::days(6))
            .unwrap_or(NaiveDate::MIN),
        PeriodMode::Weekly => start_of_week(today)
            .checked_sub_signed(Duration::weeks(7))
            .unwrap_or(NaiveDate::MIN),
        PeriodMode::Monthly => start_of_month(months_back(today, 5)),
        PeriodMode::Yearly => {
            NaiveDate::from_ymd_opt(today.year() - 2, 1, 1).unwrap_or(today)
        }
    };
    (start, today)
}

/// Index of the first period whose inclusive bounds contain `date`.
///
/// The slice need not be sorted.
pub fn find_period(periods: &[Period], date: NaiveDate) -> Option<usize> {
    periods.iter().position(|p| p.contains(date))
}
