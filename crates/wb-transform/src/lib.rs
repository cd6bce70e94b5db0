//! Data-mutating operations on the tabular store
//!
//! Every transform works on a copy of the dataset and commits it only when
//! something changed, so the replaced dataset becomes the single undo
//! snapshot. Missing inputs are reported through [`TransformOutcome`] and
//! never as errors.

pub mod cleanup;
pub mod dedup;
pub mod join;
pub mod mapping;
pub mod preset;
pub mod rows;

use serde::Serialize;

pub use cleanup::{cleanup_column, CleanupOp, CleanupTarget};
pub use dedup::{deduplicate, KeepPolicy};
pub use join::{join_lookup, JoinReport, JoinSpec};
pub use mapping::apply_value_mapping;
pub use preset::{apply_preset, PresetReport};
pub use rows::hide_selected_rows;

/// Result of a transform, ready to show as a status line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransformOutcome {
    /// Cells or rows changed
    pub changed: usize,
    pub message: String,
}

impl TransformOutcome {
    pub fn changed(changed: usize, message: impl Into<String>) -> Self {
        Self {
            changed,
            message: message.into(),
        }
    }

    /// Nothing was touched
    pub fn skipped(message: impl Into<String>) -> Self {
        Self::changed(0, message)
    }

    pub fn is_change(&self) -> bool {
        self.changed > 0
    }
}

pub(crate) const NO_DATASET: &str = "No dataset loaded.";
