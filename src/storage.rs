//! Storage layer for kogura
//!
//! State is two independent JSON values in a key-value store:
//!
//! ```text
//! <data dir>/
//!   kogura.toml          # Configuration
//!   tasks.json           # The task collection (array of task records)
//!   collapsedDates.json  # Per-day collapse overrides ({"YYYY-MM-DD": bool})
//! ```
//!
//! Each value is read once when a session opens and rewritten whole after
//! every change to it. Last write wins.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::FixedOffset;
use tempfile::NamedTempFile;

use crate::error::{Error, Result};
use crate::schedule::CollapseState;
use crate::task::{StoredTask, TaskCollection, TaskRecord};

/// Key of the task collection
pub const TASKS_KEY: &str = "tasks";

/// Key of the collapse overrides
pub const COLLAPSE_KEY: &str = "collapsedDates";

/// A durable string store addressed by key.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// One file per key under a root directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the store
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file backing `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        write_atomic(&self.path_for(key), value.as_bytes())
    }
}

/// Write data atomically using temp file + rename.
///
/// Readers never see a partial file: it is either the old content or the new.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let mut file = NamedTempFile::new_in(parent)?;
    file.write_all(data)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|err| Error::Io(err.error))?;
    Ok(())
}

/// In-memory store, mostly for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Typed load/save of the two persisted values.
#[derive(Debug)]
pub struct Gateway<S> {
    store: S,
    zone: FixedOffset,
}

fn first_duplicate_id(tasks: &[TaskRecord]) -> Option<&str> {
    let mut seen = HashSet::with_capacity(tasks.len());
    tasks
        .iter()
        .map(|task| task.id.as_str())
        .find(|id| !seen.insert(*id))
}

impl<S: KeyValueStore> Gateway<S> {
    pub fn new(store: S, zone: FixedOffset) -> Self {
        Self { store, zone }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Load the task collection. A missing value is an empty list; a value
    /// that does not parse is an error.
    pub fn load_tasks(&self) -> Result<TaskCollection> {
        let Some(raw) = self.store.get(TASKS_KEY)? else {
            return Ok(Vec::new());
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        let stored: Vec<StoredTask> = serde_json::from_str(&raw)?;
        let tasks = stored
            .into_iter()
            .map(|task| TaskRecord::from_persisted(task, self.zone))
            .collect::<Result<Vec<_>>>()?;
        if let Some(id) = first_duplicate_id(&tasks) {
            return Err(Error::InvalidStoredTask {
                id: id.to_string(),
                reason: "id appears more than once".to_string(),
            });
        }
        tracing::debug!(count = tasks.len(), "loaded tasks");
        Ok(tasks)
    }

    pub fn save_tasks(&mut self, tasks: &[TaskRecord]) -> Result<()> {
        let json = serde_json::to_string_pretty(tasks)?;
        self.store.set(TASKS_KEY, &json)?;
        tracing::debug!(count = tasks.len(), "saved tasks");
        Ok(())
    }

    /// Load collapse overrides. Anything unreadable falls back to defaults.
    pub fn load_collapse(&self) -> Result<CollapseState> {
        let Some(raw) = self.store.get(COLLAPSE_KEY)? else {
            return Ok(CollapseState::new());
        };
        match serde_json::from_str::<CollapseState>(&raw) {
            Ok(state) => Ok(state),
            Err(err) => {
                tracing::warn!(error = %err, "ignoring malformed collapse state");
                Ok(CollapseState::new())
            }
        }
    }

    pub fn save_collapse(&mut self, collapse: &CollapseState) -> Result<()> {
        let json = serde_json::to_string_pretty(collapse)?;
        self.store.set(COLLAPSE_KEY, &json)?;
        tracing::debug!(entries = collapse.len(), "saved collapse state");
        Ok(())
    }
}
