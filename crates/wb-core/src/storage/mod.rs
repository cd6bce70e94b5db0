//! Persistent key-value storage
//!
//! Annotations and user presets are stored as JSON strings under fixed keys.
//! Backends are interchangeable behind [`KeyValueStore`].

mod sqlite;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ahash::AHashMap;
use parking_lot::RwLock;
use thiserror::Error;

pub use sqlite::SqliteStore;

/// Storage key for the annotation map
pub const ANNOTATION_STORAGE_KEY: &str = "secopsWorkbenchAnnotations";

/// Storage key for user-defined presets
pub const PRESET_STORAGE_KEY: &str = "secopsWorkbenchPresets";

/// Errors raised by storage backends
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Corrupt storage content: {0}")]
    Corrupt(String),
}

/// A string-to-string persistent map
pub trait KeyValueStore: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a value
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Volatile store, used for tests and as the degraded fallback
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<AHashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// Store backed by a single JSON object on disk.
///
/// The file is re-read on every access and rewritten on every change.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl JsonFileStore {
    /// Create a store at `path`. The file is created lazily on first write.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: RwLock::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StorageError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw).map_err(|e| StorageError::Corrupt(e.to_string()))
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let encoded = serde_json::to_string_pretty(entries)
            .map_err(|e| StorageError::Corrupt(e.to_string()))?;
        std::fs::write(&self.path, encoded)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.read();
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.lock.write();
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.lock.write();
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_json_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let store = JsonFileStore::new(&path);
        assert_eq!(store.get("a").unwrap(), None);
        store.set("a", "{\"x\":1}").unwrap();
        store.set("b", "2").unwrap();

        let reopened = JsonFileStore::new(&path);
        assert_eq!(reopened.get("a").unwrap().as_deref(), Some("{\"x\":1}"));
        reopened.remove("a").unwrap();
        assert_eq!(reopened.get("a").unwrap(), None);
        assert_eq!(reopened.get("b").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn test_json_file_store_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "not json").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(store.get("a"), Err(StorageError::Corrupt(_))));
    }
}
