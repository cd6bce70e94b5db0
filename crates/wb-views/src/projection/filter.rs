use serde::{Deserialize, Serialize};

use wb_core::Row;

/// Comparison applied by a [`RowFilter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterOperator {
    Equals,
    NotEquals,
    Contains,
    IsEmpty,
    IsNotEmpty,
}

/// One conjunctive row condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowFilter {
    pub field: String,
    pub operator: FilterOperator,
    #[serde(default)]
    pub value: String,
}

impl RowFilter {
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// Case-insensitive test against one row. A missing field reads as empty.
    pub fn matches(&self, row: &Row) -> bool {
        let cell = row.get(&self.field).map(|v| v.as_display()).unwrap_or_default();

        match self.operator {
            FilterOperator::IsEmpty => cell.trim().is_empty(),
            FilterOperator::IsNotEmpty => !cell.trim().is_empty(),
            FilterOperator::Equals => cell.to_lowercase() == self.value.to_lowercase(),
            FilterOperator::NotEquals => cell.to_lowercase() != self.value.to_lowercase(),
            FilterOperator::Contains => cell.to_lowercase().contains(&self.value.to_lowercase()),
        }
    }
}

/// Which columns the free-text search looks at
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchScope {
    /// Every effective field
    #[default]
    All,
    Field(String),
}

/// Search text, scope and row filters. Never mutates the dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterState {
    pub search_text: String,
    pub scope: SearchScope,
    pub row_filters: Vec<RowFilter>,
}

impl FilterState {
    pub fn is_active(&self) -> bool {
        !self.search_text.trim().is_empty() || !self.row_filters.is_empty()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Row filters first, then the search over `fields` (or the scoped field)
    pub fn matches(&self, row: &Row, fields: &[String]) -> bool {
        if !self.row_filters.iter().all(|f| f.matches(row)) {
            return false;
        }

        let needle = self.search_text.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }

        let contains = |field: &str| {
            row.get(field)
                .map(|v| v.as_display().to_lowercase().contains(&needle))
                .unwrap_or(false)
        };

        match &self.scope {
            SearchScope::All => fields.iter().any(|f| contains(f)),
            SearchScope::Field(field) => contains(field),
        }
    }
}
