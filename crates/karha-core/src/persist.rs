use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::task::{Task, Theme, TrashedTask};

pub const TASKS_KEY: &str = "taskItems";
pub const TRASH_KEY: &str = "removedTaskItems";
pub const THEME_KEY: &str = "appTheme";

const STORAGE_FILE: &str = "storage.json";

/// String-valued key-value persistence, the role `localStorage` plays in a
/// browser.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()>;
    fn remove(&mut self, key: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// All keys in one JSON object file, rewritten atomically on every change.
#[derive(Debug)]
pub struct FileStore {
    pub path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let path = data_dir.join(STORAGE_FILE);
        let entries = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("failed reading {}", path.display()))?;
            if raw.trim().is_empty() {
                BTreeMap::new()
            } else {
                match serde_json::from_str(&raw) {
                    Ok(entries) => entries,
                    Err(err) => {
                        warn!(
                            file = %path.display(),
                            error = %err,
                            "storage file unreadable; starting empty"
                        );
                        BTreeMap::new()
                    }
                }
            }
        } else {
            BTreeMap::new()
        };

        info!(file = %path.display(), keys = entries.len(), "opened storage");
        Ok(Self { path, entries })
    }

    fn flush(&self) -> anyhow::Result<()> {
        debug!(file = %self.path.display(), keys = self.entries.len(), "writing storage");

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut temp, &self.entries)?;
        writeln!(temp)?;
        temp.flush()?;

        temp.persist(&self.path)
            .map_err(|err| anyhow!("failed to persist {}: {}", self.path.display(), err))?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

/// Everything that survives a restart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub tasks: Vec<Task>,
    pub trashed: Vec<TrashedTask>,
    pub theme: Theme,
}

/// Reads each key on its own; a missing or unreadable key yields its default.
#[tracing::instrument(skip(store))]
pub fn load_snapshot(store: &dyn KeyValueStore) -> Snapshot {
    Snapshot {
        tasks: load_key(store, TASKS_KEY).unwrap_or_default(),
        trashed: load_key(store, TRASH_KEY).unwrap_or_default(),
        theme: load_key::<bool>(store, THEME_KEY)
            .map(Theme::from_is_dark)
            .unwrap_or_default(),
    }
}

#[tracing::instrument(skip(store, snapshot))]
pub fn save_snapshot(store: &mut dyn KeyValueStore, snapshot: &Snapshot) -> anyhow::Result<()> {
    store.set(TASKS_KEY, &serde_json::to_string(&snapshot.tasks)?)?;
    store.set(TRASH_KEY, &serde_json::to_string(&snapshot.trashed)?)?;
    store.set(THEME_KEY, &serde_json::to_string(&snapshot.theme.is_dark())?)?;
    debug!(
        tasks = snapshot.tasks.len(),
        trashed = snapshot.trashed.len(),
        "snapshot saved"
    );
    Ok(())
}

/// Drops both task keys, leaving the theme.
#[tracing::instrument(skip(store))]
pub fn erase_tasks(store: &mut dyn KeyValueStore) -> anyhow::Result<()> {
    store.remove(TASKS_KEY)?;
    store.remove(TRASH_KEY)?;
    Ok(())
}

fn load_key<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!(key, "key absent");
            return None;
        }
        Err(err) => {
            warn!(key, error = %err, "failed reading key");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(key, error = %err, "failed parsing stored value; using default");
            None
        }
    }
}
