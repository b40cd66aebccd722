//! "Now" providers
//!
//! Status derivation and default ranges depend on the local wall clock.
//! Callers pass the instant explicitly; these providers supply it.

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};

/// Source of the current local date/time
pub trait Clock {
    /// Current local wall-clock time
    fn now(&self) -> NaiveDateTime;

    /// Current local calendar day
    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Host clock in the host's local time zone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Clock pinned to one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl FixedClock {
    /// Clock pinned to midnight of `date`
    pub fn on(date: NaiveDate) -> Self {
        Self(date.and_time(NaiveTime::default()))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
