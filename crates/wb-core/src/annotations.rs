//! Status-note annotations
//!
//! Notes typed into the reserved note column are keyed by a composite
//! identity (person + campaign) rather than by row position, so they survive
//! reloading the same export or a newer export of the same campaign.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::storage::{KeyValueStore, ANNOTATION_STORAGE_KEY};
use crate::value::Row;

/// Separator between the person and campaign parts of a key
pub const KEY_SEPARATOR: &str = "::";

/// A stored annotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Annotation {
    #[serde(rename = "statusNote", default)]
    pub status_note: String,
}

/// Which fields make up the composite annotation key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationKeyConfig {
    /// Preferred person identifier (usually the email address)
    pub primary_person_field: String,

    /// Used when the primary identifier is blank
    pub secondary_person_field: String,

    /// Campaign identifier (a due-date field)
    pub campaign_field: String,
}

impl Default for AnnotationKeyConfig {
    fn default() -> Self {
        Self {
            primary_person_field: "Email".to_string(),
            secondary_person_field: "Employee Number".to_string(),
            campaign_field: "Due Date".to_string(),
        }
    }
}

impl AnnotationKeyConfig {
    /// Derive the composite key for a row, or `None` when the person or the
    /// campaign part is missing.
    pub fn key_for(&self, row: &Row) -> Option<String> {
        let part = |field: &str| {
            row.get(field)
                .map(|v| v.as_display().trim().to_string())
                .filter(|s| !s.is_empty())
        };

        let person = part(&self.primary_person_field)
            .or_else(|| part(&self.secondary_person_field))?;
        let campaign = part(&self.campaign_field)?;

        compose_key(&person, &campaign)
    }
}

/// Composite key from a person identifier and a campaign value, or `None`
/// when either part is blank.
pub fn compose_key(person: &str, campaign: &str) -> Option<String> {
    let person = person.trim();
    let campaign = campaign.trim();
    if person.is_empty() || campaign.is_empty() {
        return None;
    }
    Some(format!("{}{}{}", person.to_lowercase(), KEY_SEPARATOR, campaign))
}

/// Durable annotation map.
///
/// Backed by a [`KeyValueStore`]; unreadable content is treated as an empty
/// map and a failed write switches the store to memory-only for the rest of
/// the session.
pub struct AnnotationStore {
    backend: Arc<dyn KeyValueStore>,
    entries: BTreeMap<String, Annotation>,
    degraded: bool,
}

impl AnnotationStore {
    /// Load annotations from a backend
    pub fn open(backend: Arc<dyn KeyValueStore>) -> Self {
        let (entries, degraded) = match backend.get(ANNOTATION_STORAGE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<BTreeMap<String, Annotation>>(&raw) {
                Ok(entries) => (entries, false),
                Err(e) => {
                    warn!("Annotation storage is corrupt, starting empty: {}", e);
                    (BTreeMap::new(), false)
                }
            },
            Ok(None) => (BTreeMap::new(), false),
            Err(e) => {
                warn!("Annotation storage unreadable, using memory only: {}", e);
                (BTreeMap::new(), true)
            }
        };

        debug!(count = entries.len(), "Loaded annotations");

        Self {
            backend,
            entries,
            degraded,
        }
    }

    /// Get the annotation for a key
    pub fn get(&self, key: &str) -> Option<&Annotation> {
        self.entries.get(key)
    }

    /// Stored note for a key, if any and non-empty
    pub fn note_for(&self, key: &str) -> Option<&str> {
        self.entries
            .get(key)
            .map(|a| a.status_note.as_str())
            .filter(|n| !n.is_empty())
    }

    /// Insert or update a note. An empty note for an unknown key creates
    /// nothing. Returns true when the map changed.
    pub fn upsert(&mut self, key: &str, note: &str) -> bool {
        match self.entries.get_mut(key) {
            Some(existing) if existing.status_note == note => return false,
            Some(existing) => existing.status_note = note.to_string(),
            None if note.is_empty() => return false,
            None => {
                self.entries.insert(
                    key.to_string(),
                    Annotation {
                        status_note: note.to_string(),
                    },
                );
            }
        }

        self.persist();
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True once storage has failed and writes stay in memory
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    fn persist(&mut self) {
        if self.degraded {
            return;
        }

        let encoded = match serde_json::to_string(&self.entries) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!("Failed to encode annotations: {}", e);
                return;
            }
        };

        if let Err(e) = self.backend.set(ANNOTATION_STORAGE_KEY, &encoded) {
            warn!("Annotation storage unwritable, keeping notes in memory: {}", e);
            self.degraded = true;
        }
    }
}
