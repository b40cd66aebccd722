//! Calm CLI - Command-line interface for Calm Mind analytics
//!
//! Commands:
//! - report: Build the analytics report for a data directory
//! - status: Show derived and display status for every task
//! - periods: Print the periods covering a date range
//! - doctor: Diagnose configuration and stored data

use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use calm_mind_analytics::clock::{Clock, FixedClock, SystemClock};
use calm_mind_analytics::config::AnalyticsConfig;
use calm_mind_analytics::dates::{parse_calendar_date, parse_local_datetime};
use calm_mind_analytics::pipeline::{AnalyticsProcessor, DateRange};
use calm_mind_analytics::store::{
    FileStore, KeyValueStore, SnapshotProvider, StoreSnapshot,
};
use calm_mind_analytics::{
    build_periods, derive_status, display_status, AnalyticsError, PeriodMode, CALM_VERSION,
    PRODUCER_NAME,
};

/// Calm - period-bucketed task and stress analytics
#[derive(Parser)]
#[command(name = "calm")]
#[command(version = CALM_VERSION)]
#[command(about = "Task and stress analytics for Calm Mind data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the analytics report for a data directory
    Report {
        /// Directory holding <key>.json files
        #[arg(short, long)]
        data_dir: PathBuf,

        /// Period mode (daily, weekly, monthly, yearly); defaults to the config
        #[arg(short, long)]
        mode: Option<String>,

        /// Range start (YYYY-MM-DD); requires --end
        #[arg(long, requires = "end")]
        start: Option<String>,

        /// Range end (YYYY-MM-DD); requires --start
        #[arg(long, requires = "start")]
        end: Option<String>,

        /// Local time to evaluate at (defaults to the host clock)
        #[arg(long)]
        now: Option<String>,

        /// Configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Show derived and display status for every task
    Status {
        /// Directory holding <key>.json files
        #[arg(short, long)]
        data_dir: PathBuf,

        /// Local time to evaluate at (defaults to the host clock)
        #[arg(long)]
        now: Option<String>,

        /// Configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the periods covering a date range
    Periods {
        /// Range start (YYYY-MM-DD)
        #[arg(long)]
        start: String,

        /// Range end (YYYY-MM-DD)
        #[arg(long)]
        end: String,

        /// Period mode (daily, weekly, monthly, yearly)
        #[arg(short, long, default_value = "monthly")]
        mode: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and stored data
    Doctor {
        /// Directory holding <key>.json files
        #[arg(short, long)]
        data_dir: PathBuf,

        /// Configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("calm_mind_analytics=info,calm=info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CalmCliError> {
    match cli.command {
        Commands::Report {
            data_dir,
            mode,
            start,
            end,
            now,
            config,
            output,
            pretty,
        } => cmd_report(
            &data_dir,
            mode.as_deref(),
            start.as_deref(),
            end.as_deref(),
            now.as_deref(),
            config.as_deref(),
            &output,
            pretty,
        ),

        Commands::Status {
            data_dir,
            now,
            config,
            json,
        } => cmd_status(&data_dir, now.as_deref(), config.as_deref(), json),

        Commands::Periods {
            start,
            end,
            mode,
            json,
        } => cmd_periods(&start, &end, &mode, json),

        Commands::Doctor {
            data_dir,
            config,
            json,
        } => cmd_doctor(&data_dir, config.as_deref(), json),
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_report(
    data_dir: &Path,
    mode: Option<&str>,
    start: Option<&str>,
    end: Option<&str>,
    now: Option<&str>,
    config_path: Option<&Path>,
    output: &Path,
    pretty: bool,
) -> Result<(), CalmCliError> {
    let config = load_config(config_path)?;
    let mode = mode.map(PeriodMode::parse).unwrap_or(config.default_mode);
    let range = match (start, end) {
        (Some(start), Some(end)) => Some(DateRange::new(parse_date(start)?, parse_date(end)?)?),
        _ => None,
    };
    let clock = FixedClock(parse_now(now)?);

    let provider = StoreSnapshot::new(FileStore::new(data_dir), &config.storage);
    let processor = AnalyticsProcessor::with_parts(provider, clock, config);
    let report = processor.report_with_mode(mode, range);

    let output_data = if pretty {
        report.to_json_pretty()?
    } else {
        report.to_json()?
    };

    if output.to_string_lossy() == "-" {
        println!("{}", output_data);
    } else {
        fs::write(output, output_data + "\n")?;
        info!(path = %output.display(), "wrote report");
    }

    Ok(())
}

fn cmd_status(
    data_dir: &Path,
    now: Option<&str>,
    config_path: Option<&Path>,
    json: bool,
) -> Result<(), CalmCliError> {
    let config = load_config(config_path)?;
    let now = parse_now(now)?;
    let snapshot = StoreSnapshot::new(FileStore::new(data_dir), &config.storage).snapshot();

    let rows: Vec<StatusRow> = snapshot
        .tasks
        .iter()
        .map(|task| StatusRow {
            id: task.id.clone(),
            title: task.title.clone(),
            due_date: task.due_date.clone(),
            stored: task.status.clone(),
            derived: derive_status(task, now).as_str(),
            display: display_status(task, now).as_str(),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        println!("Task Status ({})", now.format("%Y-%m-%d %H:%M"));
        println!("===========");
        if rows.is_empty() {
            println!("No tasks found");
        }
        for row in &rows {
            println!(
                "  {:<14} {:<12} {:<12} {:<11} {}",
                row.id,
                row.derived,
                row.display,
                row.due_date.as_deref().unwrap_or("-"),
                row.title
            );
        }
    }

    Ok(())
}

fn cmd_periods(start: &str, end: &str, mode: &str, json: bool) -> Result<(), CalmCliError> {
    let range = DateRange::new(parse_date(start)?, parse_date(end)?)?;
    let mode = PeriodMode::parse(mode);
    let periods = build_periods(range.start, range.end, mode);
    debug!(count = periods.len(), mode = mode.as_str(), "built periods");

    if json {
        println!("{}", serde_json::to_string_pretty(&periods)?);
    } else {
        for period in &periods {
            println!(
                "{:<12} {:<14} {} .. {}",
                period.key, period.label, period.start, period.end
            );
        }
    }

    Ok(())
}

fn cmd_doctor(data_dir: &Path, config_path: Option<&Path>, json: bool) -> Result<(), CalmCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("{} {}", PRODUCER_NAME, CALM_VERSION),
    });

    let config = match config_path {
        None => {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Ok,
                message: "Using default configuration".to_string(),
            });
            AnalyticsConfig::default()
        }
        Some(path) => match AnalyticsConfig::load(path) {
            Ok(config) => {
                checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Ok,
                    message: format!("Configuration valid ({})", path.display()),
                });
                config
            }
            Err(e) => {
                checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Invalid configuration: {}", e),
                });
                AnalyticsConfig::default()
            }
        },
    };

    if data_dir.is_dir() {
        checks.push(DoctorCheck {
            name: "data_dir".to_string(),
            status: CheckStatus::Ok,
            message: format!("Data directory {}", data_dir.display()),
        });
    } else {
        checks.push(DoctorCheck {
            name: "data_dir".to_string(),
            status: CheckStatus::Warning,
            message: "Data directory does not exist".to_string(),
        });
    }

    let store = FileStore::new(data_dir);
    let keys = &config.storage;
    let key_groups = [
        ("tasks", &keys.tasks, &keys.legacy_tasks),
        ("stress_logs", &keys.stress_logs, &keys.legacy_stress_logs),
    ];
    for (name, primary, legacy) in key_groups {
        checks.push(check_stored_list(&store, name, primary, legacy));
    }

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: CALM_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Calm Doctor Report");
        println!("==================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(CalmCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

/// Inspect the first stored value among a primary key and its legacy keys
fn check_stored_list(
    store: &FileStore,
    name: &str,
    primary: &str,
    legacy: &[String],
) -> DoctorCheck {
    let keys = std::iter::once(primary).chain(legacy.iter().map(String::as_str));
    for key in keys {
        match store.get(key) {
            Ok(None) => continue,
            Ok(Some(raw)) => {
                return match serde_json::from_str::<serde_json::Value>(&raw) {
                    Ok(serde_json::Value::Array(items)) => DoctorCheck {
                        name: name.to_string(),
                        status: if key == primary {
                            CheckStatus::Ok
                        } else {
                            CheckStatus::Warning
                        },
                        message: format!("{} records under key '{}'", items.len(), key),
                    },
                    Ok(_) => DoctorCheck {
                        name: name.to_string(),
                        status: CheckStatus::Error,
                        message: format!("Key '{}' does not hold an array", key),
                    },
                    Err(e) => DoctorCheck {
                        name: name.to_string(),
                        status: CheckStatus::Error,
                        message: format!("Key '{}' holds invalid JSON: {}", key, e),
                    },
                };
            }
            Err(e) => {
                return DoctorCheck {
                    name: name.to_string(),
                    status: CheckStatus::Error,
                    message: format!("Cannot read key '{}': {}", key, e),
                };
            }
        }
    }

    DoctorCheck {
        name: name.to_string(),
        status: CheckStatus::Warning,
        message: "Nothing stored yet".to_string(),
    }
}

// Helper functions

fn load_config(path: Option<&Path>) -> Result<AnalyticsConfig, CalmCliError> {
    match path {
        Some(path) => Ok(AnalyticsConfig::load(path)?),
        None => Ok(AnalyticsConfig::default()),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, CalmCliError> {
    parse_calendar_date(raw).ok_or_else(|| {
        CalmCliError::Analytics(AnalyticsError::DateParseError(format!(
            "'{}' is not a YYYY-MM-DD date",
            raw
        )))
    })
}

fn parse_now(raw: Option<&str>) -> Result<NaiveDateTime, CalmCliError> {
    match raw {
        None => Ok(SystemClock.now()),
        Some(raw) => parse_local_datetime(raw).ok_or_else(|| {
            CalmCliError::Analytics(AnalyticsError::DateParseError(format!(
                "'{}' is not a date or date-time",
                raw
            )))
        }),
    }
}

// Error types

#[derive(Debug)]
enum CalmCliError {
    Io(io::Error),
    Analytics(AnalyticsError),
    Json(serde_json::Error),
    DoctorFailed,
}

impl From<io::Error> for CalmCliError {
    fn from(e: io::Error) -> Self {
        CalmCliError::Io(e)
    }
}

impl From<AnalyticsError> for CalmCliError {
    fn from(e: AnalyticsError) -> Self {
        CalmCliError::Analytics(e)
    }
}

impl From<serde_json::Error> for CalmCliError {
    fn from(e: serde_json::Error) -> Self {
        CalmCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<CalmCliError> for CliError {
    fn from(e: CalmCliError) -> Self {
        match e {
            CalmCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            CalmCliError::Analytics(e) => {
                let (code, hint) = match &e {
                    AnalyticsError::JsonError(_) => ("JSON_ERROR", "Check JSON syntax"),
                    AnalyticsError::IoError(_) => ("IO_ERROR", "Check file paths and permissions"),
                    AnalyticsError::DateParseError(_) => {
                        ("DATE_ERROR", "Dates are YYYY-MM-DD, times YYYY-MM-DDTHH:MM:SS")
                    }
                    AnalyticsError::InvalidRange(_) => {
                        ("RANGE_ERROR", "Pass --start on or before --end")
                    }
                    AnalyticsError::ConfigError(_) => {
                        ("CONFIG_ERROR", "Run 'calm doctor --config <file>' for details")
                    }
                    AnalyticsError::StoreError(_) => {
                        ("STORE_ERROR", "Storage keys may only use letters, digits, '_', '-' and '.'")
                    }
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            CalmCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            CalmCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct StatusRow {
    id: String,
    title: String,
    due_date: Option<String>,
    stored: String,
    derived: &'static str,
    display: &'static str,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
