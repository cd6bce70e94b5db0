//! Read-only contract exposed to other modules (for example the report
//! builder). Consumers get owned snapshots and never a handle that can
//! mutate the session.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::value::Row;

/// Bucket label used for blank values in group counts
pub const EMPTY_BUCKET: &str = "(empty)";

/// One distinct value and how many rows carry it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCount {
    pub value: String,
    pub count: usize,
}

/// Result of a group-and-count over one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub field: String,
    pub rows: Vec<GroupCount>,
}

impl Summary {
    /// Total number of rows counted
    pub fn total(&self) -> usize {
        self.rows.iter().map(|r| r.count).sum()
    }
}

/// Owned copy of the current session data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub fields: Vec<String>,
    pub rows: Vec<Row>,
    pub visible_fields: Vec<String>,
    pub display_names: IndexMap<String, String>,
    pub source_name: String,
}

impl SessionSnapshot {
    /// Display label for a field
    pub fn display_name<'a>(&'a self, field: &'a str) -> &'a str {
        self.display_names
            .get(field)
            .map(String::as_str)
            .unwrap_or(field)
    }
}

/// Narrow read-only view of a workbench session
pub trait DataSessionProvider {
    /// Snapshot of the loaded data, `None` when nothing is loaded
    fn current_session_data(&self) -> Option<SessionSnapshot>;

    /// Group-and-count over the whole dataset, `None` when nothing is loaded
    /// or the field does not exist
    fn compute_group_and_count(&self, field: &str) -> Option<Summary>;
}
