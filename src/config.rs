//! Analytics configuration
//!
//! Storage key names and the default period granularity. Every field has a
//! default, so an empty JSON object is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::AnalyticsError;
use crate::types::PeriodMode;

/// Key the task list is stored under
pub const DEFAULT_TASKS_KEY: &str = "tasks";
/// Key older clients stored the task list under
pub const LEGACY_TASKS_KEY: &str = "calm_mind_tasks";
/// Key the stress log list is stored under
pub const DEFAULT_STRESS_LOGS_KEY: &str = "stressLogs";
/// Keys older clients stored stress logs under, most recent first
pub const LEGACY_STRESS_LOGS_KEYS: [&str; 2] = ["moodLogs", "stress_logs"];

/// Storage key layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StorageKeys {
    pub tasks: String,
    pub legacy_tasks: Vec<String>,
    pub stress_logs: String,
    pub legacy_stress_logs: Vec<String>,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            tasks: DEFAULT_TASKS_KEY.to_string(),
            legacy_tasks: vec![LEGACY_TASKS_KEY.to_string()],
            stress_logs: DEFAULT_STRESS_LOGS_KEY.to_string(),
            legacy_stress_logs: LEGACY_STRESS_LOGS_KEYS
                .iter()
                .map(|k| k.to_string())
                .collect(),
        }
    }
}

/// Analytics settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalyticsConfig {
    /// Granularity used when the caller does not pick one
    pub default_mode: PeriodMode,
    pub storage: StorageKeys,
}

impl AnalyticsConfig {
    /// Load configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, AnalyticsError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, AnalyticsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self, AnalyticsError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Reject key layouts the stores cannot use
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        let keys = &self.storage;
        let all = std::iter::once(&keys.tasks)
            .chain(&keys.legacy_tasks)
            .chain(std::iter::once(&keys.stress_logs))
            .chain(&keys.legacy_stress_logs);

        for key in all {
            if key.trim().is_empty() {
                return Err(AnalyticsError::ConfigError(
                    "storage keys must not be empty".to_string(),
                ));
            }
        }

        if keys.tasks == keys.stress_logs {
            return Err(AnalyticsError::ConfigError(format!(
                "tasks and stress logs share the key '{}'",
                keys.tasks
            )));
        }

        Ok(())
    }
}
