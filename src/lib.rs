//! Calm Mind Analytics - period-bucketed task and stress analytics
//!
//! Turns snapshots of a student's tasks and self-reported stress logs into
//! chart-ready series through a deterministic pipeline: period building →
//! status derivation → aggregation → trend regression.
//!
//! ## Modules
//!
//! - **Core**: `status`, `periods`, `aggregator`, `regression`
//! - **Collaborators**: `store` (snapshot providers), `clock` ("now" providers)
//! - **Orchestration**: `pipeline`, plus the `ffi` C bindings

pub mod aggregator;
pub mod clock;
pub mod config;
pub mod dates;
pub mod error;
pub mod periods;
pub mod pipeline;
pub mod regression;
pub mod status;
pub mod store;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use aggregator::{
    aggregate_stress_logs, build_workload_vs_stress, get_tag_distribution_from_logs,
    get_tag_distribution_from_tasks, representative_date, StressSummary,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::AnalyticsConfig;
pub use error::AnalyticsError;
pub use periods::{build_periods, default_range};
pub use pipeline::{analytics_report_json, AnalyticsProcessor, AnalyticsReport, DateRange};
pub use regression::{compute_regression, project_trend};
pub use status::{derive_status, display_status, get_priority_distribution, get_task_counts};
pub use store::{Snapshot, SnapshotProvider};
pub use types::{Period, PeriodMode, Priority, StressLog, Task, TaskStatus};

/// Library version
pub const CALM_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name reported by the CLI and diagnostics
pub const PRODUCER_NAME: &str = "calm-mind-analytics";
