use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use catcher_core::{CapturedRecord, StateSnapshot};
use serde_json::Value;
use thiserror::Error;

use crate::persist::{AtomicFileWriter, PersistError};

pub const KEY_ENABLED: &str = "enabled";
pub const KEY_COUNT: &str = "capturedCount";
pub const KEY_LOG: &str = "capturedStreams";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("corrupt value for key {key}: {message}")]
    Corrupt { key: String, message: String },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Key-value state store. `set` must apply all entries or none of them.
pub trait StateStore: Send + Sync {
    fn get(&self, keys: &[&str]) -> Result<Vec<Option<Value>>, StoreError>;
    fn set(&self, entries: Vec<(String, Value)>) -> Result<(), StoreError>;
}

/// Writes enabled flag, count and log in a single `set`.
pub fn commit_snapshot(store: &dyn StateStore, snapshot: &StateSnapshot) -> Result<(), StoreError> {
    store.set(vec![
        (KEY_ENABLED.to_string(), Value::Bool(snapshot.enabled)),
        (KEY_COUNT.to_string(), Value::from(snapshot.log.len())),
        (KEY_LOG.to_string(), serde_json::to_value(&snapshot.log)?),
    ])
}

/// Reads the last committed snapshot. Missing keys fall back to a fresh,
/// enabled, empty state; the stored count is recomputed from the log.
pub fn load_snapshot(store: &dyn StateStore) -> Result<StateSnapshot, StoreError> {
    let mut values = store.get(&[KEY_ENABLED, KEY_LOG])?.into_iter();
    let enabled = match values.next().flatten() {
        None => true,
        Some(Value::Bool(enabled)) => enabled,
        Some(other) => {
            return Err(StoreError::Corrupt {
                key: KEY_ENABLED.to_string(),
                message: format!("expected bool, found {other}"),
            })
        }
    };
    let log: Vec<CapturedRecord> = match values.next().flatten() {
        None => Vec::new(),
        Some(value) => serde_json::from_value(value).map_err(|err| StoreError::Corrupt {
            key: KEY_LOG.to_string(),
            message: err.to_string(),
        })?,
    };
    Ok(StateSnapshot::new(enabled, log))
}

/// Process-local store, mainly for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn get(&self, keys: &[&str]) -> Result<Vec<Option<Value>>, StoreError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(keys.iter().map(|key| entries.get(*key).cloned()).collect())
    }

    fn set(&self, entries: Vec<(String, Value)>) -> Result<(), StoreError> {
        let mut current = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        current.extend(entries);
        Ok(())
    }
}

/// JSON document on disk, replaced atomically on every `set`.
#[derive(Debug)]
pub struct FileStore {
    writer: AtomicFileWriter,
    filename: String,
    entries: Mutex<BTreeMap<String, Value>>,
}

impl FileStore {
    /// Opens the store at `path`, loading existing entries if the file exists.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| StoreError::Unavailable(format!("invalid state path {path:?}")))?
            .to_string();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let entries = match fs::read_to_string(path) {
            Ok(text) => serde_json::from_str(&text).map_err(|err| StoreError::Corrupt {
                key: filename.clone(),
                message: err.to_string(),
            })?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };

        Ok(Self {
            writer: AtomicFileWriter::new(dir),
            filename,
            entries: Mutex::new(entries),
        })
    }
}

impl StateStore for FileStore {
    fn get(&self, keys: &[&str]) -> Result<Vec<Option<Value>>, StoreError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(keys.iter().map(|key| entries.get(*key).cloned()).collect())
    }

    fn set(&self, entries: Vec<(String, Value)>) -> Result<(), StoreError> {
        let mut current = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = current.clone();
        next.extend(entries);
        let content = serde_json::to_vec_pretty(&next)?;
        self.writer.write(&self.filename, &content)?;
        *current = next;
        Ok(())
    }
}
