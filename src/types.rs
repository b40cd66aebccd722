//! Core types for Calm Mind analytics
//!
//! This module defines the records read from storage (tasks, stress logs),
//! the closed enums their free-text fields are normalised into, and the
//! series shapes handed to the chart renderer.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::dates;

/// Task lifecycle state.
///
/// `Missing` is never stored; it is derived from an overdue due date.
/// `DoneLate` is a display refinement of `Completed` and is never produced
/// by status derivation itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Missing,
    Completed,
    DoneLate,
}

impl TaskStatus {
    /// Map a stored status string onto the closed set of base states.
    ///
    /// Lower-cases, trims and collapses whitespace/hyphen runs to `_`.
    /// Unrecognised values become `Todo`. A stored `done_late` is a
    /// completed task and normalises to `Completed`.
    pub fn normalize(raw: &str) -> Self {
        match collapse_status(raw).as_str() {
            "in_progress" | "inprogress" | "doing" => TaskStatus::InProgress,
            "missing" | "overdue" => TaskStatus::Missing,
            "completed" | "complete" | "done" | "done_late" => TaskStatus::Completed,
            _ => TaskStatus::Todo,
        }
    }

    /// Whether the stored string literally says `done_late`
    pub fn is_stored_done_late(raw: &str) -> bool {
        collapse_status(raw) == "done_late"
    }

    /// Active tasks count towards workload
    pub fn is_active(&self) -> bool {
        matches!(self, TaskStatus::Todo | TaskStatus::InProgress)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Missing => "missing",
            TaskStatus::Completed => "completed",
            TaskStatus::DoneLate => "done_late",
        }
    }
}

fn collapse_status(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;
    for ch in raw.trim().chars() {
        if ch.is_whitespace() || ch == '-' || ch == '_' {
            pending_sep = true;
            continue;
        }
        if pending_sep && !out.is_empty() {
            out.push('_');
        }
        pending_sep = false;
        out.extend(ch.to_lowercase());
    }
    out
}

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Missing or unrecognised priorities count as `Medium`
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_lowercase()).as_deref() {
            Some("high") => Priority::High,
            Some("low") => Priority::Low,
            _ => Priority::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }
}

/// A user-created to-do item, as stored by the application
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Opaque identifier, usually the creation time in epoch milliseconds
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    /// Stored status text; see [`TaskStatus::normalize`]
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    /// When the task was marked completed, if the client recorded it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

impl Task {
    pub fn stored_status(&self) -> TaskStatus {
        TaskStatus::normalize(&self.status)
    }

    pub fn priority(&self) -> Priority {
        Priority::from_raw(self.priority.as_deref())
    }

    /// Due date, if present and parsable
    pub fn due(&self) -> Option<NaiveDate> {
        self.due_date.as_deref().and_then(dates::parse_calendar_date)
    }

    /// Start date, if present and parsable
    pub fn start(&self) -> Option<NaiveDate> {
        self.start_date.as_deref().and_then(dates::parse_calendar_date)
    }

    /// Local date the task was completed on, if recorded
    pub fn completed_on(&self) -> Option<NaiveDate> {
        self.completed_at.as_deref().and_then(dates::parse_timestamp_date)
    }

    /// Creation date recovered from a millisecond-timestamp id
    pub fn created_on(&self) -> Option<NaiveDate> {
        self.id
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(dates::millis_to_local_date)
    }
}

/// A stored timestamp: epoch milliseconds or a textual date/time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Millis(i64),
    Fractional(f64),
    Text(String),
}

impl Timestamp {
    /// Calendar date of this timestamp in host local time
    pub fn local_date(&self) -> Option<NaiveDate> {
        match self {
            Timestamp::Millis(ms) => dates::millis_to_local_date(*ms),
            Timestamp::Fractional(ms) if ms.is_finite() => {
                dates::millis_to_local_date(ms.trunc() as i64)
            }
            Timestamp::Fractional(_) => None,
            Timestamp::Text(text) => dates::parse_timestamp_date(text),
        }
    }
}

/// One self-reported mood entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressLog {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    /// Entry time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<Timestamp>,
    /// Entry time as written by older clients
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<Timestamp>,
    /// Self-reported level, 1 (calm) to 5 (overwhelmed)
    pub stress: u8,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl StressLog {
    /// Entry date from `ts`, falling back to the legacy `date` field
    pub fn log_date(&self) -> Option<NaiveDate> {
        self.ts
            .as_ref()
            .and_then(Timestamp::local_date)
            .or_else(|| self.date.as_ref().and_then(Timestamp::local_date))
    }
}

/// Granularity used to partition a date range.
///
/// Deserialization goes through [`PeriodMode::parse`], so unknown or
/// differently-cased names read as `Monthly`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum PeriodMode {
    Daily,
    Weekly,
    #[default]
    Monthly,
    Yearly,
}

impl PeriodMode {
    /// Parse a mode name; unknown names fall back to `Monthly`
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "daily" | "day" => PeriodMode::Daily,
            "weekly" | "week" => PeriodMode::Weekly,
            "yearly" | "year" => PeriodMode::Yearly,
            _ => PeriodMode::Monthly,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodMode::Daily => "daily",
            PeriodMode::Weekly => "weekly",
            PeriodMode::Monthly => "monthly",
            PeriodMode::Yearly => "yearly",
        }
    }
}

impl From<String> for PeriodMode {
    fn from(raw: String) -> Self {
        PeriodMode::parse(&raw)
    }
}

/// A contiguous date bucket, inclusive on both ends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    /// Stable bucket id
    pub key: String,
    /// Display label, unique within one period list
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Tally of tasks per derived status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCounts {
    pub todo: usize,
    pub in_progress: usize,
    pub missing: usize,
    pub completed: usize,
}

impl TaskCounts {
    pub fn total(&self) -> usize {
        self.todo + self.in_progress + self.missing + self.completed
    }
}

/// Tally of tasks per priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

/// Average stress for one period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressPoint {
    pub label: String,
    pub stress: f64,
}

/// Active-task workload against average stress for one period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadStressPoint {
    pub label: String,
    pub workload: usize,
    pub stress: f64,
}

/// Workload/stress point with the fitted trend value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub label: String,
    pub workload: usize,
    pub stress: f64,
    pub predicted: f64,
}

/// One slice of a tag frequency chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagShare {
    pub name: String,
    pub value: usize,
    /// Whole-number share of all tag occurrences
    pub pct: u32,
}

/// Fitted line `y = a + b * x`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Regression {
    pub a: f64,
    pub b: f64,
}

impl Regression {
    pub fn predict(&self, x: f64) -> f64 {
        self.a + self.b * x
    }
}

/// Accept ids written either as JSON strings or numbers
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Read an explicit JSON `null` as the field's default
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
