//! Built-in and user presets, with user presets persisted in a key-value store

use std::sync::Arc;

use chrono::Utc;
use indexmap::IndexMap;
use tracing::{debug, info, warn};

use wb_core::storage::PRESET_STORAGE_KEY;
use wb_core::KeyValueStore;

use crate::builtin::{builtin, builtin_presets};
use crate::matcher::{match_score, SUGGESTION_THRESHOLD};
use crate::model::{Preset, PresetId};
use crate::PresetError;

/// Lookup, persistence and sharing of presets
pub struct PresetRegistry {
    backend: Arc<dyn KeyValueStore>,
    user: IndexMap<PresetId, Preset>,
    degraded: bool,
}

impl PresetRegistry {
    /// Load user presets from a backend. Corrupt content starts empty.
    pub fn open(backend: Arc<dyn KeyValueStore>) -> Self {
        let (user, degraded) = match backend.get(PRESET_STORAGE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<IndexMap<PresetId, Preset>>(&raw) {
                Ok(user) => (user, false),
                Err(e) => {
                    warn!("Preset storage is corrupt, starting empty: {}", e);
                    (IndexMap::new(), false)
                }
            },
            Ok(None) => (IndexMap::new(), false),
            Err(e) => {
                warn!("Preset storage unreadable, using memory only: {}", e);
                (IndexMap::new(), true)
            }
        };

        debug!(count = user.len(), "Loaded user presets");

        Self {
            backend,
            user,
            degraded,
        }
    }

    /// Built-in first, then user presets
    pub fn get(&self, id: &str) -> Option<&Preset> {
        builtin(id).or_else(|| self.user.get(id))
    }

    /// Built-ins followed by user presets in save order
    pub fn list(&self) -> Vec<&Preset> {
        builtin_presets().iter().chain(self.user.values()).collect()
    }

    /// Store a user preset, replacing one with the same id
    pub fn save_user_preset(&mut self, mut preset: Preset) -> Result<(), PresetError> {
        preset.validate()?;
        if builtin(&preset.id).is_some() {
            return Err(PresetError::BuiltinConflict(preset.id));
        }

        preset.is_user_preset = true;
        preset.saved_at = Some(Utc::now());

        info!(id = %preset.id, label = %preset.label, "Saved user preset");
        self.user.insert(preset.id.clone(), preset);
        self.persist();
        Ok(())
    }

    /// Remove a user preset. Returns false when it did not exist.
    pub fn delete_user_preset(&mut self, id: &str) -> Result<bool, PresetError> {
        if builtin(id).is_some() {
            return Err(PresetError::ReadOnly(id.to_string()));
        }
        let removed = self.user.shift_remove(id).is_some();
        if removed {
            self.persist();
        }
        Ok(removed)
    }

    /// Portable JSON document for one preset
    pub fn export_document(&self, id: &str) -> Result<String, PresetError> {
        let preset = self.get(id).ok_or_else(|| PresetError::NotFound(id.to_string()))?;
        Ok(serde_json::to_string_pretty(preset)?)
    }

    /// Parse a preset document and save it as a user preset
    pub fn import_document(&mut self, json: &str) -> Result<PresetId, PresetError> {
        let preset: Preset = serde_json::from_str(json)?;
        let id = preset.id.clone();
        self.save_user_preset(preset)?;
        Ok(id)
    }

    /// Best-scoring preset for a field list, if it clears the threshold
    pub fn suggest(&self, fields: &[String]) -> Option<&Preset> {
        self.list()
            .into_iter()
            .map(|p| (match_score(p, fields), p))
            .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
            .reduce(|best, next| if next.0 > best.0 { next } else { best })
            .map(|(_, preset)| preset)
    }

    pub fn user_presets(&self) -> impl Iterator<Item = &Preset> {
        self.user.values()
    }

    /// True once storage has failed and presets stay in memory
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    fn persist(&mut self) {
        if self.degraded {
            return;
        }

        let encoded = match serde_json::to_string(&self.user) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!("Failed to encode presets: {}", e);
                return;
            }
        };

        if let Err(e) = self.backend.set(PRESET_STORAGE_KEY, &encoded) {
            warn!("Preset storage unwritable, keeping presets in memory: {}", e);
            self.degraded = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::PHISHER_LIKE_ID;
    use wb_core::{JsonFileStore, MemoryStore};

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_save_and_reload() {
        let backend: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let mut registry = PresetRegistry::open(backend.clone());
        registry
            .save_user_preset(Preset::new("q3", "Q3").keep(["Email"]))
            .unwrap();

        let saved = registry.get("q3").unwrap();
        assert!(saved.is_user_preset);
        assert!(saved.saved_at.is_some());

        let reopened = PresetRegistry::open(backend);
        assert_eq!(reopened.list().len(), 2);
        assert_eq!(reopened.list()[0].id, PHISHER_LIKE_ID);
        assert_eq!(reopened.get("q3").unwrap().label, "Q3");
    }

    #[test]
    fn test_builtins_are_read_only() {
        let mut registry = PresetRegistry::open(Arc::new(MemoryStore::new()));
        assert!(matches!(
            registry.save_user_preset(Preset::new(PHISHER_LIKE_ID, "Mine")),
            Err(PresetError::BuiltinConflict(_))
        ));
        assert!(matches!(registry.delete_user_preset(PHISHER_LIKE_ID), Err(PresetError::ReadOnly(_))));
        assert!(!registry.delete_user_preset("missing").unwrap());
    }

    #[test]
    fn test_export_import_document() {
        let mut source = PresetRegistry::open(Arc::new(MemoryStore::new()));
        source
            .save_user_preset(Preset::new("sbu", "SBU cleanup").map_value("SBU", "Indy*", "Indiana"))
            .unwrap();
        let document = source.export_document("sbu").unwrap();

        let mut target = PresetRegistry::open(Arc::new(MemoryStore::new()));
        assert_eq!(target.import_document(&document).unwrap(), "sbu");
        assert_eq!(target.get("sbu").unwrap().value_mapping["SBU"]["Indy*"], "Indiana");

        assert!(matches!(target.import_document("{not json"), Err(PresetError::Json(_))));
        assert!(matches!(
            target.import_document(r#"{"id":"x","label":""}"#),
            Err(PresetError::Invalid(_))
        ));
        assert!(matches!(source.export_document("nope"), Err(PresetError::NotFound(_))));
    }

    #[test]
    fn test_corrupt_storage_starts_empty() {
        let backend = Arc::new(MemoryStore::new());
        backend.set(PRESET_STORAGE_KEY, "[[[").unwrap();
        let registry = PresetRegistry::open(backend);
        assert_eq!(registry.user_presets().count(), 0);
        assert!(!registry.is_degraded());
    }

    #[test]
    fn test_json_file_backend() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workbench.json");
        {
            let mut registry = PresetRegistry::open(Arc::new(JsonFileStore::new(&path)));
            registry.save_user_preset(Preset::new("a", "A")).unwrap();
        }
        let registry = PresetRegistry::open(Arc::new(JsonFileStore::new(&path)));
        assert!(registry.get("a").is_some());
    }

    #[test]
    fn test_suggest() {
        let registry = PresetRegistry::open(Arc::new(MemoryStore::new()));
        let phisher = fields(&[
            "Email", "First Name", "Last Name", "Job Title", "Group", "Manager Name", "Location",
        ]);
        assert_eq!(registry.suggest(&phisher).unwrap().id, PHISHER_LIKE_ID);
        assert!(registry.suggest(&fields(&["Email", "First Name"])).is_none());
    }
}
