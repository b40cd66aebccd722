//! Error types for Calm Mind analytics
//!
//! The aggregation functions themselves are total and never return these;
//! only the edges that touch caller-supplied text, files or storage do.

use thiserror::Error;

/// Errors raised at the fallible edges of the crate
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Date parse error: {0}")]
    DateParseError(String),

    #[error("Invalid date range: {0}")]
    InvalidRange(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Store error: {0}")]
    StoreError(String),
}
