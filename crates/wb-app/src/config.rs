//! Application configuration
//!
//! Loaded from a JSON file; every section is optional and falls back to its
//! defaults.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use wb_core::{JsonFileStore, KeyValueStore, MemoryStore, SqliteStore, WorkbenchSettings};
use wb_data::NullConfig;

/// Default JSON storage file for annotations and presets
pub const DEFAULT_STORAGE_FILE: &str = "secops-workbench.json";

/// Where annotations and user presets are persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StorageBackend {
    Memory,
    Json { path: PathBuf },
    Sqlite { path: PathBuf },
}

impl Default for StorageBackend {
    fn default() -> Self {
        StorageBackend::Json {
            path: PathBuf::from(DEFAULT_STORAGE_FILE),
        }
    }
}

impl StorageBackend {
    /// Open the backend. A backend that cannot be opened falls back to
    /// memory so that the session still works without persistence.
    pub fn open(&self) -> Arc<dyn KeyValueStore> {
        match self {
            StorageBackend::Memory => Arc::new(MemoryStore::new()),
            StorageBackend::Json { path } => Arc::new(JsonFileStore::new(path)),
            StorageBackend::Sqlite { path } => match SqliteStore::open(path) {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    warn!("Cannot open SQLite storage {:?}, using memory only: {}", path, e);
                    Arc::new(MemoryStore::new())
                }
            },
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Memory => write!(f, "memory"),
            StorageBackend::Json { path } => write!(f, "json:{}", path.display()),
            StorageBackend::Sqlite { path } => write!(f, "sqlite:{}", path.display()),
        }
    }
}

impl FromStr for StorageBackend {
    type Err = String;

    /// `memory`, `json:<path>` or `sqlite:<path>`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "memory" {
            return Ok(StorageBackend::Memory);
        }
        match s.split_once(':') {
            Some(("json", path)) if !path.is_empty() => Ok(StorageBackend::Json { path: path.into() }),
            Some(("sqlite", path)) if !path.is_empty() => Ok(StorageBackend::Sqlite { path: path.into() }),
            _ => Err(format!(
                "invalid storage '{}', expected memory, json:<path> or sqlite:<path>",
                s
            )),
        }
    }
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub settings: WorkbenchSettings,
    pub null_handling: NullConfig,
    pub storage: StorageBackend,
    /// Field delimiter for CSV input
    pub delimiter: Option<char>,
}

impl AppConfig {
    /// Read a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig = serde_json::from_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        debug!(path = %path.display(), storage = %config.storage, "Loaded configuration");
        Ok(config)
    }

    /// Read `path` if given, otherwise use defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Delimiter as a byte; non-ASCII delimiters fall back to a comma
    pub fn delimiter_byte(&self) -> u8 {
        match self.delimiter {
            Some(c) if c.is_ascii() => c as u8,
            Some(c) => {
                warn!("Ignoring non-ASCII delimiter {:?}", c);
                b','
            }
            None => b',',
        }
    }
}
