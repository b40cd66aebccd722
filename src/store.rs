//! Snapshot providers
//!
//! Tasks and stress logs live as JSON arrays in a key-value store. Readers
//! here never fail: a missing key, an unreadable value or a corrupt array
//! yields an empty list, and individual malformed records are skipped.
//! Change detection (polling, subscriptions) belongs to the host.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::config::StorageKeys;
use crate::error::AnalyticsError;
use crate::types::{StressLog, Task};

/// Backend holding string values under string keys
pub trait KeyValueStore {
    /// Value stored under `key`, or `None` when absent
    fn get(&self, key: &str) -> Result<Option<String>, AnalyticsError>;

    /// Replace the value stored under `key`
    fn set(&mut self, key: &str, value: &str) -> Result<(), AnalyticsError>;
}

/// In-process store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for seeding fixtures
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, AnalyticsError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), AnalyticsError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Directory-backed store: each key is a `<key>.json` file
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, AnalyticsError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(AnalyticsError::StoreError(format!(
                "invalid storage key '{}'",
                key
            )));
        }
        Ok(self.root.join(format!("{}.json", key)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, AnalyticsError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), AnalyticsError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.root)?;
        fs::write(path, value)?;
        Ok(())
    }
}

/// Read a record list from the first key that holds a value.
///
/// Keys are tried in order; a present but corrupt value does not fall
/// through to older keys.
fn read_records<S, T>(store: &S, keys: &[&str]) -> Vec<T>
where
    S: KeyValueStore,
    T: DeserializeOwned,
{
    for key in keys {
        let raw = match store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => continue,
            Err(e) => {
                warn!(key = %key, error = %e, "failed to read stored records");
                return Vec::new();
            }
        };
        return parse_records(key, &raw);
    }
    Vec::new()
}

fn parse_records<T: DeserializeOwned>(key: &str, raw: &str) -> Vec<T> {
    let items: Vec<serde_json::Value> = match serde_json::from_str(raw) {
        Ok(serde_json::Value::Array(items)) => items,
        Ok(serde_json::Value::Null) => return Vec::new(),
        Ok(_) => {
            warn!(key = %key, "stored value is not an array; treating as empty");
            return Vec::new();
        }
        Err(e) => {
            warn!(key = %key, error = %e, "corrupt stored value; treating as empty");
            return Vec::new();
        }
    };

    let total = items.len();
    let records: Vec<T> = items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(key = %key, index, error = %e, "skipping malformed record");
                None
            }
        })
        .collect();

    debug!(key = %key, read = records.len(), total, "loaded stored records");
    records
}

fn write_records<S, T>(store: &mut S, key: &str, records: &[T]) -> Result<(), AnalyticsError>
where
    S: KeyValueStore,
    T: Serialize,
{
    let json = serde_json::to_string(records)?;
    store.set(key, &json)
}

/// Task list persisted under the configured task keys
#[derive(Debug, Clone)]
pub struct TaskStore<S> {
    store: S,
    key: String,
    legacy_keys: Vec<String>,
}

impl<S: KeyValueStore> TaskStore<S> {
    pub fn new(store: S, keys: &StorageKeys) -> Self {
        Self {
            store,
            key: keys.tasks.clone(),
            legacy_keys: keys.legacy_tasks.clone(),
        }
    }

    /// All stored tasks; empty when nothing usable is stored
    pub fn read(&self) -> Vec<Task> {
        let keys: Vec<&str> = std::iter::once(self.key.as_str())
            .chain(self.legacy_keys.iter().map(String::as_str))
            .collect();
        read_records(&self.store, &keys)
    }

    /// Replace the stored task list (always under the primary key)
    pub fn write(&mut self, tasks: &[Task]) -> Result<(), AnalyticsError> {
        write_records(&mut self.store, &self.key, tasks)
    }

    pub fn into_inner(self) -> S {
        self.store
    }
}

/// Stress log list persisted under the configured stress-log keys
#[derive(Debug, Clone)]
pub struct StressLogStore<S> {
    store: S,
    key: String,
    legacy_keys: Vec<String>,
}

impl<S: KeyValueStore> StressLogStore<S> {
    pub fn new(store: S, keys: &StorageKeys) -> Self {
        Self {
            store,
            key: keys.stress_logs.clone(),
            legacy_keys: keys.legacy_stress_logs.clone(),
        }
    }

    /// All stored logs; empty when nothing usable is stored
    pub fn read(&self) -> Vec<StressLog> {
        let keys: Vec<&str> = std::iter::once(self.key.as_str())
            .chain(self.legacy_keys.iter().map(String::as_str))
            .collect();
        read_records(&self.store, &keys)
    }

    /// Replace the stored log list (always under the primary key)
    pub fn write(&mut self, logs: &[StressLog]) -> Result<(), AnalyticsError> {
        write_records(&mut self.store, &self.key, logs)
    }

    pub fn into_inner(self) -> S {
        self.store
    }
}

/// Immutable view of everything the aggregator reads in one pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, serde::Deserialize)]
pub struct Snapshot {
    pub tasks: Vec<Task>,
    pub logs: Vec<StressLog>,
}

/// Pull-based source of snapshots
pub trait SnapshotProvider {
    fn snapshot(&self) -> Snapshot;
}

impl SnapshotProvider for Snapshot {
    fn snapshot(&self) -> Snapshot {
        self.clone()
    }
}

/// Snapshot provider reading both lists from one key-value store
#[derive(Debug, Clone)]
pub struct StoreSnapshot<S> {
    tasks: TaskStore<S>,
    logs: StressLogStore<S>,
}

impl<S: KeyValueStore + Clone> StoreSnapshot<S> {
    pub fn new(store: S, keys: &StorageKeys) -> Self {
        Self {
            tasks: TaskStore::new(store.clone(), keys),
            logs: StressLogStore::new(store, keys),
        }
    }
}

impl<S: KeyValueStore> SnapshotProvider for StoreSnapshot<S> {
    fn snapshot(&self) -> Snapshot {
        Snapshot {
            tasks: self.tasks.read(),
            logs: self.logs.read(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn keys() -> StorageKeys {
        StorageKeys::default()
    }

    #[test]
    fn test_missing_keys_read_empty() {
        let tasks = TaskStore::new(MemoryStore::new(), &keys());
        assert!(tasks.read().is_empty());
        let logs = StressLogStore::new(MemoryStore::new(), &keys());
        assert!(logs.read().is_empty());
    }

    #[test]
    fn test_corrupt_value_reads_empty() {
        let store = MemoryStore::new().with("tasks", "{not json");
        assert!(TaskStore::new(store, &keys()).read().is_empty());

        let store = MemoryStore::new().with("stressLogs", r#"{"stress": 3}"#);
        assert!(StressLogStore::new(store, &keys()).read().is_empty());
    }

    #[test]
    fn test_malformed_records_are_skipped() {
        let store = MemoryStore::new().with(
            "stressLogs",
            r#"[{"id": "1", "ts": "2024-01-01", "stress": 3}, {"id": "2", "stress": "high"}, 7]"#,
        );
        let logs = StressLogStore::new(store, &keys()).read();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].id, "1");
    }

    #[test]
    fn test_null_fields_keep_record() {
        let store = MemoryStore::new()
            .with(
                "tasks",
                r#"[
                    {"id": "1", "title": null, "status": null, "description": null, "tags": null},
                    {"id": "2", "title": "Essay", "status": "todo"}
                ]"#,
            )
            .with(
                "stressLogs",
                r#"[{"id": "a", "ts": "2024-01-01", "stress": 3, "tags": null, "note": null}]"#,
            );

        let tasks = TaskStore::new(store.clone(), &keys()).read();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].title, "");
        assert!(tasks[0].tags.is_empty());
        assert_eq!(tasks[0].stored_status(), crate::types::TaskStatus::Todo);

        let logs = StressLogStore::new(store, &keys()).read();
        assert_eq!(logs.len(), 1);
        assert!(logs[0].tags.is_empty());
    }

    #[test]
    fn test_legacy_keys() {
        let store = MemoryStore::new()
            .with("calm_mind_tasks", r#"[{"id": "old", "title": "Legacy"}]"#)
            .with("stress_logs", r#"[{"id": "s", "date": "2024-01-01", "stress": 2}]"#);

        let tasks = TaskStore::new(store.clone(), &keys()).read();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Legacy");

        let logs = StressLogStore::new(store, &keys()).read();
        assert_eq!(logs.len(), 1);
    }

    #[test]
    fn test_primary_key_wins_over_legacy() {
        let store = MemoryStore::new()
            .with("tasks", r#"[{"id": "new", "title": "Current"}]"#)
            .with("calm_mind_tasks", r#"[{"id": "old", "title": "Legacy"}]"#);
        let tasks = TaskStore::new(store, &keys()).read();
        assert_eq!(tasks[0].id, "new");
    }

    #[test]
    fn test_write_then_read() {
        let mut store = TaskStore::new(MemoryStore::new(), &keys());
        let task = Task {
            id: "42".to_string(),
            title: "Revise notes".to_string(),
            status: "todo".to_string(),
            due_date: Some("2024-02-01".to_string()),
            tags: vec!["exams".to_string()],
            ..Default::default()
        };
        store.write(std::slice::from_ref(&task)).unwrap();
        assert_eq!(store.read(), vec![task]);
    }

    #[test]
    fn test_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut fs_store = FileStore::new(dir.path());

        assert_eq!(fs_store.get("tasks").unwrap(), None);
        fs_store.set("tasks", "[]").unwrap();
        assert_eq!(fs_store.get("tasks").unwrap().as_deref(), Some("[]"));
        assert!(dir.path().join("tasks.json").exists());

        assert!(fs_store.get("../escape").is_err());
        assert!(fs_store.set("", "x").is_err());
    }

    #[test]
    fn test_store_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("tasks.json"),
            r#"[{"id": "1", "title": "Essay", "status": "todo"}]"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("moodLogs.json"),
            r#"[{"id": "a", "ts": 1704110400000, "stress": 4, "tags": ["exams"]}]"#,
        )
        .unwrap();

        let provider = StoreSnapshot::new(FileStore::new(dir.path()), &keys());
        let snapshot = provider.snapshot();
        assert_eq!(snapshot.tasks.len(), 1);
        assert_eq!(snapshot.logs.len(), 1);
        assert_eq!(snapshot.logs[0].stress, 4);
        assert_eq!(provider.snapshot(), snapshot);
    }
}
