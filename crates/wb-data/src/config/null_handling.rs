//! Placeholder cells that load as empty

use serde::{Serialize, Deserialize};

/// Placeholders found in HR and phishing-platform exports
pub const COMMON_PLACEHOLDERS: &[&str] = &["-", "N/A", "null", "None", "#N/A"];

/// Which raw cell texts are read as [`wb_core::Scalar::Empty`].
///
/// The empty string always is; `placeholders` adds more.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NullConfig {
    pub placeholders: Vec<String>,

    /// Trim the cell before comparing, so `"  "` is also empty
    pub trim: bool,

    pub case_sensitive: bool,
}

impl NullConfig {
    /// Trimmed, case-insensitive matching over [`COMMON_PLACEHOLDERS`]
    pub fn with_common_placeholders() -> Self {
        Self {
            placeholders: COMMON_PLACEHOLDERS.iter().map(|p| p.to_string()).collect(),
            trim: true,
            case_sensitive: false,
        }
    }

    pub fn is_null(&self, value: &str) -> bool {
        let value = if self.trim { value.trim() } else { value };
        if value.is_empty() {
            return true;
        }
        self.placeholders.iter().any(|p| {
            if self.case_sensitive {
                value == p
            } else {
                value.eq_ignore_ascii_case(p)
            }
        })
    }

    /// Returns false when the placeholder was already known
    pub fn add_placeholder(&mut self, placeholder: &str) -> bool {
        if placeholder.is_empty() || self.placeholders.iter().any(|p| p == placeholder) {
            return false;
        }
        self.placeholders.push(placeholder.to_string());
        true
    }

    pub fn remove_placeholder(&mut self, placeholder: &str) {
        self.placeholders.retain(|p| p != placeholder);
    }
}
