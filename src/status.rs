//! Status derivation
//!
//! Classifies a task's effective lifecycle state from its stored status, its
//! due date and the current local date:
//! - completion is terminal and beats overdue-ness
//! - an active task due before today is `Missing`
//! - unparsable due dates never make a task overdue

use chrono::NaiveDateTime;

use crate::types::{Priority, PriorityCounts, Task, TaskCounts, TaskStatus};

/// Derive the effective status of `task` at local time `now`.
///
/// Never returns [`TaskStatus::DoneLate`].
pub fn derive_status(task: &Task, now: NaiveDateTime) -> TaskStatus {
    let normalized = task.stored_status();
    if normalized == TaskStatus::Completed {
        return TaskStatus::Completed;
    }

    match task.due() {
        Some(due) if due < now.date() => TaskStatus::Missing,
        _ => normalized,
    }
}

/// Display-only refinement of [`derive_status`].
///
/// A completed task is shown as `DoneLate` when it was stored that way or
/// when its due date precedes the day it was completed (the recorded
/// completion day, or today if none was recorded).
pub fn display_status(task: &Task, now: NaiveDateTime) -> TaskStatus {
    let status = derive_status(task, now);
    if status != TaskStatus::Completed {
        return status;
    }

    if TaskStatus::is_stored_done_late(&task.status) {
        return TaskStatus::DoneLate;
    }

    let finished_on = task.completed_on().unwrap_or_else(|| now.date());
    match task.due() {
        Some(due) if due < finished_on => TaskStatus::DoneLate,
        _ => TaskStatus::Completed,
    }
}

/// Tally tasks into the four base states.
///
/// A `derive` function that reports `DoneLate` is counted as completed, so
/// the total always equals `tasks.len()`.
pub fn get_task_counts<F>(tasks: &[Task], derive: F) -> TaskCounts
where
    F: Fn(&Task) -> TaskStatus,
{
    tasks.iter().fold(TaskCounts::default(), |mut counts, task| {
        match derive(task) {
            TaskStatus::Todo => counts.todo += 1,
            TaskStatus::InProgress => counts.in_progress += 1,
            TaskStatus::Missing => counts.missing += 1,
            TaskStatus::Completed | TaskStatus::DoneLate => counts.completed += 1,
        }
        counts
    })
}

/// Tally tasks per priority; unknown priorities count as `Medium`
pub fn get_priority_distribution(tasks: &[Task]) -> PriorityCounts {
    tasks
        .iter()
        .fold(PriorityCounts::default(), |mut counts, task| {
            match task.priority() {
                Priority::High => counts.high += 1,
                Priority::Medium => counts.medium += 1,
                Priority::Low => counts.low += 1,
            }
            counts
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap()
    }

    fn task(status: &str, due: Option<&str>) -> Task {
        Task {
            id: "1".to_string(),
            title: "Read chapter 4".to_string(),
            status: status.to_string(),
            due_date: due.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_overdue_task_becomes_missing() {
        let t = task("todo", Some("2024-01-10"));
        assert_eq!(derive_status(&t, at(2024, 1, 15)), TaskStatus::Missing);
        assert_eq!(derive_status(&t, at(2024, 1, 1)), TaskStatus::Todo);
    }

    #[test]
    fn test_due_today_is_not_missing() {
        let t = task("in progress", Some("2024-01-15"));
        assert_eq!(derive_status(&t, at(2024, 1, 15)), TaskStatus::InProgress);
        assert_eq!(derive_status(&t, at(2024, 1, 16)), TaskStatus::Missing);
    }

    #[test]
    fn test_completed_is_never_missing() {
        let t = task("completed", Some("2020-01-01"));
        assert_eq!(derive_status(&t, at(2024, 1, 15)), TaskStatus::Completed);
    }

    #[test]
    fn test_no_or_bad_due_date_never_missing() {
        assert_eq!(
            derive_status(&task("todo", None), at(2030, 1, 1)),
            TaskStatus::Todo
        );
        assert_eq!(
            derive_status(&task("todo", Some("someday")), at(2030, 1, 1)),
            TaskStatus::Todo
        );
    }

    #[test]
    fn test_derive_is_deterministic() {
        let t = task("in-progress", Some("2024-01-10"));
        let now = at(2024, 1, 12);
        assert_eq!(derive_status(&t, now), derive_status(&t, now));
    }

    #[test]
    fn test_display_status_done_late() {
        let now = at(2024, 1, 15);

        let late = Task {
            completed_at: Some("2024-01-12T10:00:00".to_string()),
            ..task("completed", Some("2024-01-10"))
        };
        assert_eq!(display_status(&late, now), TaskStatus::DoneLate);

        let on_time = Task {
            completed_at: Some("2024-01-09T10:00:00".to_string()),
            ..task("completed", Some("2024-01-10"))
        };
        assert_eq!(display_status(&on_time, now), TaskStatus::Completed);

        // no completion time recorded: compared against today
        assert_eq!(
            display_status(&task("completed", Some("2024-01-10")), now),
            TaskStatus::DoneLate
        );
        assert_eq!(
            display_status(&task("done_late", None), now),
            TaskStatus::DoneLate
        );
        // the base rule is unaffected
        assert_eq!(
            derive_status(&task("done_late", None), now),
            TaskStatus::Completed
        );
    }

    #[test]
    fn test_task_counts_conserve_total() {
        let now = at(2024, 1, 15);
        let tasks = vec![
            task("todo", None),
            task("todo", Some("2024-01-01")),
            task("in_progress", Some("2024-02-01")),
            task("completed", Some("2024-01-01")),
            task("done_late", None),
            task("whatever", None),
        ];

        let counts = get_task_counts(&tasks, |t| derive_status(t, now));
        assert_eq!(
            counts,
            TaskCounts {
                todo: 2,
                in_progress: 1,
                missing: 1,
                completed: 2,
            }
        );
        assert_eq!(counts.total(), tasks.len());

        let display_counts = get_task_counts(&tasks, |t| display_status(t, now));
        assert_eq!(display_counts.total(), tasks.len());
        assert_eq!(display_counts.completed, 2);
    }

    #[test]
    fn test_priority_distribution() {
        let mut high = task("todo", None);
        high.priority = Some("High".to_string());
        let mut low = task("todo", None);
        low.priority = Some("Low".to_string());
        let mut odd = task("todo", None);
        odd.priority = Some("Critical".to_string());

        let counts = get_priority_distribution(&[high, low, odd, task("todo", None)]);
        assert_eq!(
            counts,
            PriorityCounts {
                high: 1,
                medium: 2,
                low: 1,
            }
        );
    }
}
