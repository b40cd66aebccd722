//! Period aggregation
//!
//! Buckets stress logs and tasks into periods and summarises them:
//! - average stress per period (0 for periods without logs)
//! - active-task workload per period, paired with that period's stress
//! - tag frequency tables for logs and tasks
//!
//! Records without a usable date are left out of every bucket.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::dates::round2;
use crate::periods::find_period;
use crate::types::{
    Period, StressLog, StressPoint, TagShare, Task, TaskStatus, WorkloadStressPoint,
};

/// Average stress of the logs falling in each period.
///
/// The result is aligned with `periods`. A period with no logs reports 0;
/// callers that need to tell "no data" from a real zero check the raw log
/// count (see [`StressSummary::has_data`]).
pub fn aggregate_stress_logs(logs: &[StressLog], periods: &[Period]) -> Vec<StressPoint> {
    let mut sums = vec![(0u64, 0usize); periods.len()];
    let mut undated = 0usize;

    for log in logs {
        let Some(date) = log.log_date() else {
            undated += 1;
            continue;
        };
        if let Some(idx) = find_period(periods, date) {
            sums[idx].0 += u64::from(log.stress);
            sums[idx].1 += 1;
        }
    }

    if undated > 0 {
        debug!(undated, "skipped stress logs without a usable date");
    }

    periods
        .iter()
        .zip(sums)
        .map(|(period, (sum, count))| StressPoint {
            label: period.label.clone(),
            stress: if count == 0 {
                0.0
            } else {
                round2(sum as f64 / count as f64)
            },
        })
        .collect()
}

/// Date a task is attributed to: due date, else start date, else the
/// creation time encoded in its id
pub fn representative_date(task: &Task) -> Option<NaiveDate> {
    task.due()
        .or_else(|| task.start())
        .or_else(|| task.created_on())
}

/// Pair active-task workload with average stress for each period.
///
/// Workload counts tasks whose derived status is `Todo` or `InProgress` and
/// whose `task_date` falls in the period. Stress is looked up from
/// `stress_series` by label and is 0 when the label is absent.
pub fn build_workload_vs_stress<D, G>(
    tasks: &[Task],
    stress_series: &[StressPoint],
    periods: &[Period],
    derive: D,
    task_date: G,
) -> Vec<WorkloadStressPoint>
where
    D: Fn(&Task) -> TaskStatus,
    G: Fn(&Task) -> Option<NaiveDate>,
{
    let mut workload = vec![0usize; periods.len()];

    for task in tasks {
        if !derive(task).is_active() {
            continue;
        }
        let Some(date) = task_date(task) else {
            continue;
        };
        if let Some(idx) = find_period(periods, date) {
            workload[idx] += 1;
        }
    }

    let stress_by_label: HashMap<&str, f64> = stress_series
        .iter()
        .map(|point| (point.label.as_str(), point.stress))
        .collect();

    periods
        .iter()
        .zip(workload)
        .map(|(period, workload)| WorkloadStressPoint {
            label: period.label.clone(),
            workload,
            stress: stress_by_label
                .get(period.label.as_str())
                .copied()
                .unwrap_or(0.0),
        })
        .collect()
}

/// Frequency of every tag across all logs, in first-seen order.
///
/// Tags are trimmed first; blank tags are not counted and do not add to
/// the total the percentages are taken from.
pub fn get_tag_distribution_from_logs(logs: &[StressLog]) -> Vec<TagShare> {
    tag_distribution(logs.iter().flat_map(|log| log.tags.iter()))
}

/// Frequency of every tag across all tasks, in first-seen order; blank
/// tags are skipped as for logs
pub fn get_tag_distribution_from_tasks(tasks: &[Task]) -> Vec<TagShare> {
    tag_distribution(tasks.iter().flat_map(|task| task.tags.iter()))
}

fn tag_distribution<'a, I>(tags: I) -> Vec<TagShare>
where
    I: Iterator<Item = &'a String>,
{
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();

    for tag in tags {
        let name = tag.trim();
        if name.is_empty() {
            continue;
        }
        let count = counts.entry(name).or_insert_with(|| {
            order.push(name);
            0
        });
        *count += 1;
    }

    let total: usize = counts.values().sum();

    order
        .into_iter()
        .map(|name| {
            let value = counts[name];
            let pct = if total == 0 {
                0
            } else {
                (100.0 * value as f64 / total as f64).round() as u32
            };
            TagShare {
                name: name.to_string(),
                value,
                pct,
            }
        })
        .collect()
}

/// Headline figures over a set of stress logs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StressSummary {
    /// Number of logs considered
    pub count: usize,
    /// Mean stress over all logs (2 dp), 0 when there are none
    pub average: f64,
    /// Stress of the most recent dated log
    pub latest: Option<u8>,
    /// Whether any logs exist at all
    pub has_data: bool,
}

impl StressSummary {
    pub fn from_logs(logs: &[StressLog]) -> Self {
        let count = logs.len();
        let average = if count == 0 {
            0.0
        } else {
            let sum: u64 = logs.iter().map(|log| u64::from(log.stress)).sum();
            round2(sum as f64 / count as f64)
        };

        // ties keep the later entry in storage order
        let latest = logs
            .iter()
            .filter_map(|log| log.log_date().map(|date| (date, log.stress)))
            .max_by_key(|(date, _)| *date)
            .map(|(_, stress)| stress);

        Self {
            count,
            average,
            latest,
            has_data: count > 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::periods::build_periods;
    use crate::status::derive_status;
    use crate::types::{PeriodMode, Timestamp};
    use chrono::{Local, TimeZone};
    use pretty_assertions::assert_eq;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn local_noon_millis(y: i32, m: u32, d: u32) -> i64 {
        Local
            .with_ymd_and_hms(y, m, d, 12, 0, 0)
            .single()
            .unwrap()
            .timestamp_millis()
    }

    fn log(ts: &str, stress: u8, tags: &[&str]) -> StressLog {
        StressLog {
            id: ts.to_string(),
            ts: Some(Timestamp::Text(ts.to_string())),
            date: None,
            stress,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            note: None,
        }
    }

    fn task(status: &str, due: Option<&str>) -> Task {
        Task {
            id: "t".to_string(),
            title: "Lab report".to_string(),
            status: status.to_string(),
            due_date: due.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_weekly_average_and_empty_periods() {
        let periods = build_periods(ymd(2024, 1, 1), ymd(2024, 1, 21), PeriodMode::Weekly);
        let logs = vec![
            log("2024-01-09T08:00:00", 2, &[]),
            log("2024-01-11T21:00:00", 4, &[]),
        ];

        let series = aggregate_stress_logs(&logs, &periods);
        let values: Vec<f64> = series.iter().map(|p| p.stress).collect();
        assert_eq!(values, vec![0.0, 3.0, 0.0]);
        assert_eq!(series[1].label, periods[1].label);
    }

    #[test]
    fn test_average_rounds_to_two_places() {
        let periods = build_periods(ymd(2024, 1, 1), ymd(2024, 1, 1), PeriodMode::Daily);
        let logs = vec![
            log("2024-01-01T08:00:00", 1, &[]),
            log("2024-01-01T12:00:00", 2, &[]),
            log("2024-01-01T20:00:00", 2, &[]),
        ];
        assert_eq!(aggregate_stress_logs(&logs, &periods)[0].stress, 1.67);
    }

    #[test]
    fn test_boundary_day_lands_in_one_period() {
        let periods = build_periods(ymd(2024, 1, 1), ymd(2024, 2, 29), PeriodMode::Monthly);
        let logs = vec![
            log("2024-01-31T23:59:00", 5, &[]),
            log("2024-02-01T00:00:00", 1, &[]),
        ];
        let values: Vec<f64> = aggregate_stress_logs(&logs, &periods)
            .iter()
            .map(|p| p.stress)
            .collect();
        assert_eq!(values, vec![5.0, 1.0]);
    }

    #[test]
    fn test_undated_logs_are_skipped() {
        let periods = build_periods(ymd(2024, 1, 1), ymd(2024, 1, 2), PeriodMode::Daily);
        let mut undated = log("whenever", 5, &[]);
        undated.ts = None;
        let logs = vec![undated, log("2024-01-02", 3, &[])];

        let values: Vec<f64> = aggregate_stress_logs(&logs, &periods)
            .iter()
            .map(|p| p.stress)
            .collect();
        assert_eq!(values, vec![0.0, 3.0]);
    }

    #[test]
    fn test_workload_vs_stress() {
        let now = ymd(2024, 1, 15).and_hms_opt(9, 0, 0).unwrap();
        let periods = build_periods(ymd(2024, 1, 1), ymd(2024, 1, 31), PeriodMode::Weekly);
        let tasks = vec![
            task("todo", Some("2024-01-16")),
            task("in_progress", Some("2024-01-20")),
            // overdue, so not workload
            task("todo", Some("2024-01-03")),
            task("completed", Some("2024-01-17")),
            Task {
                start_date: Some("2024-01-25".to_string()),
                ..task("todo", None)
            },
            // no date at all: excluded, not assigned anywhere
            Task {
                id: "not-a-timestamp".to_string(),
                ..task("todo", None)
            },
        ];
        let stress = vec![StressPoint {
            label: periods[2].label.clone(),
            stress: 3.5,
        }];

        let series = build_workload_vs_stress(
            &tasks,
            &stress,
            &periods,
            |t| derive_status(t, now),
            representative_date,
        );

        let workload: Vec<usize> = series.iter().map(|p| p.workload).collect();
        assert_eq!(workload, vec![0, 0, 2, 1, 0]);
        assert_eq!(series[2].stress, 3.5);
        assert_eq!(series[3].stress, 0.0);
        assert_eq!(series.len(), periods.len());
    }

    #[test]
    fn test_millisecond_timestamps_bucket_by_local_day() {
        let logs = vec![StressLog {
            id: "m".to_string(),
            ts: Some(Timestamp::Millis(local_noon_millis(2024, 1, 10))),
            date: None,
            stress: 4,
            tags: Vec::new(),
            note: None,
        }];
        let periods = build_periods(ymd(2024, 1, 1), ymd(2024, 1, 21), PeriodMode::Weekly);

        let series = aggregate_stress_logs(&logs, &periods);
        let stress: Vec<f64> = series.iter().map(|p| p.stress).collect();
        assert_eq!(stress, vec![0.0, 4.0, 0.0]);
        assert_eq!(series[1].label, "Jan 08, 2024");
    }

    #[test]
    fn test_representative_date_fallbacks() {
        let due = task("todo", Some("2024-05-01"));
        assert_eq!(representative_date(&due), Some(ymd(2024, 5, 1)));

        let started = Task {
            start_date: Some("2024-04-20".to_string()),
            ..task("todo", None)
        };
        assert_eq!(representative_date(&started), Some(ymd(2024, 4, 20)));

        let from_id = Task {
            id: local_noon_millis(2024, 1, 10).to_string(),
            ..task("todo", None)
        };
        assert_eq!(representative_date(&from_id), Some(ymd(2024, 1, 10)));

        assert_eq!(representative_date(&task("todo", None)), None);
    }

    #[test]
    fn test_tag_distribution() {
        let logs = vec![
            log("2024-01-01", 3, &["exams", "sleep"]),
            log("2024-01-02", 4, &["exams", " ", "money"]),
            log("2024-01-03", 2, &["exams"]),
        ];

        let dist = get_tag_distribution_from_logs(&logs);
        assert_eq!(
            dist,
            vec![
                TagShare {
                    name: "exams".to_string(),
                    value: 3,
                    pct: 60,
                },
                TagShare {
                    name: "sleep".to_string(),
                    value: 1,
                    pct: 20,
                },
                TagShare {
                    name: "money".to_string(),
                    value: 1,
                    pct: 20,
                },
            ]
        );

        let total: usize = dist.iter().map(|t| t.value).sum();
        assert_eq!(total, 5);
        let pct_sum: u32 = dist.iter().map(|t| t.pct).sum();
        assert!((pct_sum as i64 - 100).abs() <= dist.len() as i64);
    }

    #[test]
    fn test_tag_distribution_empty() {
        assert!(get_tag_distribution_from_logs(&[]).is_empty());
        assert!(get_tag_distribution_from_logs(&[log("2024-01-01", 1, &[])]).is_empty());
    }

    #[test]
    fn test_task_tag_distribution() {
        let tasks = vec![
            Task {
                tags: vec!["deadline".to_string(), "group work".to_string()],
                ..task("todo", None)
            },
            Task {
                tags: vec!["deadline".to_string()],
                ..task("todo", None)
            },
        ];
        let dist = get_tag_distribution_from_tasks(&tasks);
        assert_eq!(dist[0].name, "deadline");
        assert_eq!(dist[0].pct, 67);
        assert_eq!(dist[1].pct, 33);
    }

    #[test]
    fn test_stress_summary() {
        let empty = StressSummary::from_logs(&[]);
        assert!(!empty.has_data);
        assert_eq!(empty.average, 0.0);
        assert_eq!(empty.latest, None);

        let logs = vec![
            log("2024-01-05T10:00:00", 2, &[]),
            log("2024-01-09T10:00:00", 5, &[]),
            log("2024-01-07T10:00:00", 4, &[]),
        ];
        let summary = StressSummary::from_logs(&logs);
        assert_eq!(
            summary,
            StressSummary {
                count: 3,
                average: 3.67,
                latest: Some(5),
                has_data: true,
            }
        );
    }
}
