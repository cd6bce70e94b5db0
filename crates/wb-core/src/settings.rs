//! Workbench settings

use serde::{Deserialize, Serialize};

use crate::annotations::AnnotationKeyConfig;

/// Default name of the reserved note column
pub const DEFAULT_NOTE_COLUMN: &str = "StatusNote";

/// Which rows the main export covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExportScope {
    /// Every row of the dataset, projected through the visible columns
    #[default]
    FullDataset,
    /// Only the rows surviving the active search and row filters, in sort order
    FilteredView,
}

/// Settings shared by every workbench component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkbenchSettings {
    /// Reserved column holding the per-row status note
    pub note_column: String,

    /// Fields forming the composite annotation key
    pub annotation_key: AnnotationKeyConfig,

    /// Columns that generic cleanup never touches
    pub protected_columns: Vec<String>,

    /// Rows shown in the table preview
    pub preview_rows: usize,

    /// Rows covered by the main export
    pub export_scope: ExportScope,
}

impl Default for WorkbenchSettings {
    fn default() -> Self {
        let annotation_key = AnnotationKeyConfig::default();
        let mut protected_columns = vec![
            annotation_key.primary_person_field.clone(),
            annotation_key.secondary_person_field.clone(),
            annotation_key.campaign_field.clone(),
        ];
        for extra in ["EmployeeID", "Campaign"] {
            if !protected_columns.iter().any(|c| c == extra) {
                protected_columns.push(extra.to_string());
            }
        }

        Self {
            note_column: DEFAULT_NOTE_COLUMN.to_string(),
            annotation_key,
            protected_columns,
            preview_rows: 100,
            export_scope: ExportScope::FullDataset,
        }
    }
}

impl WorkbenchSettings {
    /// Whether a column is protected from generic cleanup
    pub fn is_protected(&self, field: &str) -> bool {
        self.protected_columns.iter().any(|c| c == field)
    }
}
