//! Pipeline orchestration
//!
//! This module provides the public API for Calm Mind analytics.
//! It runs one snapshot through every stage and produces the series the
//! dashboard charts consume.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::aggregator::{
    aggregate_stress_logs, build_workload_vs_stress, get_tag_distribution_from_logs,
    get_tag_distribution_from_tasks, representative_date, StressSummary,
};
use crate::clock::{Clock, SystemClock};
use crate::config::AnalyticsConfig;
use crate::error::AnalyticsError;
use crate::periods::{build_periods, default_range};
use crate::regression::{fit_workload_vs_stress, project_trend};
use crate::status::{derive_status, get_priority_distribution, get_task_counts};
use crate::store::{Snapshot, SnapshotProvider};
use crate::types::{
    Period, PeriodMode, PriorityCounts, Regression, StressLog, StressPoint, TagShare, Task,
    TaskCounts, TrendPoint, WorkloadStressPoint,
};

/// Inclusive date range requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Range with ordered bounds; `start > end` is rejected
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, AnalyticsError> {
        if end < start {
            return Err(AnalyticsError::InvalidRange(format!(
                "end {} is before start {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    /// Range built from bounds given in either order
    pub fn ordered(a: NaiveDate, b: NaiveDate) -> Self {
        if b < a {
            Self { start: b, end: a }
        } else {
            Self { start: a, end: b }
        }
    }
}

/// Everything the analytics dashboard shows for one snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub mode: PeriodMode,
    pub range: DateRange,
    pub generated_at: NaiveDateTime,
    pub periods: Vec<Period>,
    pub task_counts: TaskCounts,
    pub priorities: PriorityCounts,
    pub stress_series: Vec<StressPoint>,
    pub workload_vs_stress: Vec<WorkloadStressPoint>,
    pub regression: Regression,
    pub trend: Vec<TrendPoint>,
    pub log_tags: Vec<TagShare>,
    pub task_tags: Vec<TagShare>,
    pub stress_summary: StressSummary,
}

impl AnalyticsReport {
    /// Run every stage over one snapshot.
    ///
    /// Pipeline stages:
    /// 1. Period Builder - partition the range
    /// 2. Status Derivation - tally tasks by effective status
    /// 3. Aggregator - stress per period, workload per period, tag shares
    /// 4. Regression Estimator - fit and project the workload trend
    pub fn build(
        tasks: &[Task],
        logs: &[StressLog],
        range: DateRange,
        mode: PeriodMode,
        now: NaiveDateTime,
    ) -> Self {
        // Stage 1: Periods
        let periods = build_periods(range.start, range.end, mode);

        // Stage 2: Status counts
        let derive = |task: &Task| derive_status(task, now);
        let task_counts = get_task_counts(tasks, derive);
        let priorities = get_priority_distribution(tasks);

        // Stage 3: Aggregation
        let stress_series = aggregate_stress_logs(logs, &periods);
        let workload_vs_stress = build_workload_vs_stress(
            tasks,
            &stress_series,
            &periods,
            derive,
            representative_date,
        );

        // Stage 4: Trend
        let regression = fit_workload_vs_stress(&workload_vs_stress);
        let trend = project_trend(&workload_vs_stress, regression);

        debug!(
            periods = periods.len(),
            tasks = tasks.len(),
            logs = logs.len(),
            mode = mode.as_str(),
            "built analytics report"
        );

        Self {
            mode,
            range,
            generated_at: now,
            periods,
            task_counts,
            priorities,
            stress_series,
            workload_vs_stress,
            regression,
            trend,
            log_tags: get_tag_distribution_from_logs(logs),
            task_tags: get_tag_distribution_from_tasks(tasks),
            stress_summary: StressSummary::from_logs(logs),
        }
    }

    /// Build from a snapshot
    pub fn from_snapshot(
        snapshot: &Snapshot,
        range: DateRange,
        mode: PeriodMode,
        now: NaiveDateTime,
    ) -> Self {
        Self::build(&snapshot.tasks, &snapshot.logs, range, mode, now)
    }

    /// Serialize the report to compact JSON
    pub fn to_json(&self) -> Result<String, AnalyticsError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serialize the report to indented JSON
    pub fn to_json_pretty(&self) -> Result<String, AnalyticsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Build a report from raw stored JSON.
///
/// # Arguments
/// * `tasks_json` - JSON array of tasks as stored by the application
/// * `logs_json` - JSON array of stress logs as stored by the application
/// * `mode` - Period mode name; unknown names fall back to monthly
/// * `range` - Inclusive range, or `None` for the mode's default range
/// * `now` - Local wall-clock time used for status derivation
///
/// Unlike the store readers, malformed JSON here is an error: the caller
/// handed it over directly.
pub fn analytics_report_json(
    tasks_json: &str,
    logs_json: &str,
    mode: &str,
    range: Option<DateRange>,
    now: NaiveDateTime,
) -> Result<String, AnalyticsError> {
    let tasks: Vec<Task> = serde_json::from_str(tasks_json)?;
    let logs: Vec<StressLog> = serde_json::from_str(logs_json)?;
    let mode = PeriodMode::parse(mode);
    let range = range.unwrap_or_else(|| {
        let (start, end) = default_range(mode, now.date());
        DateRange { start, end }
    });

    AnalyticsReport::build(&tasks, &logs, range, mode, now).to_json()
}

/// Processor bound to a snapshot provider, a clock and a configuration.
///
/// Every call pulls a fresh snapshot; nothing is cached between calls.
pub struct AnalyticsProcessor<P, C = SystemClock> {
    provider: P,
    clock: C,
    config: AnalyticsConfig,
}

impl<P: SnapshotProvider> AnalyticsProcessor<P, SystemClock> {
    /// Create a processor using the host clock and default settings
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            clock: SystemClock,
            config: AnalyticsConfig::default(),
        }
    }
}

impl<P: SnapshotProvider, C: Clock> AnalyticsProcessor<P, C> {
    /// Create a processor with an explicit clock and configuration
    pub fn with_parts(provider: P, clock: C, config: AnalyticsConfig) -> Self {
        Self {
            provider,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Report for `range` (or the default range) at the configured mode
    pub fn report(&self, range: Option<DateRange>) -> AnalyticsReport {
        self.report_with_mode(self.config.default_mode, range)
    }

    /// Report for `range` (or the default range) at `mode`
    pub fn report_with_mode(&self, mode: PeriodMode, range: Option<DateRange>) -> AnalyticsReport {
        let now = self.clock.now();
        let range = range.unwrap_or_else(|| {
            let (start, end) = default_range(mode, now.date());
            DateRange { start, end }
        });
        let snapshot = self.provider.snapshot();

        info!(
            start = %range.start,
            end = %range.end,
            mode = mode.as_str(),
            "computing analytics"
        );
        AnalyticsReport::from_snapshot(&snapshot, range, mode, now)
    }
}
