use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use wb_views::RowFilter;

/// Unique identifier for a preset
pub type PresetId = String;

/// Column reference to `from -> to` rules. A `from` ending in `*` matches by
/// literal prefix.
pub type ValueMapping = IndexMap<String, IndexMap<String, String>>;

/// Fills a blank target column from a prefix table, then a constant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivationRule {
    /// Column to fill, by key or display name
    pub target_field: String,

    /// Tried in order when `target_field` does not resolve
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternate_targets: Vec<String>,

    /// Column whose first two characters select a prefix table entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_field: Option<String>,

    /// Two-character prefix (case-insensitive) to derived value
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub prefix_table: IndexMap<String, String>,

    /// Used when no prefix entry applies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
}

impl DerivationRule {
    /// Prefix table entry for a source value, matching its first two
    /// characters case-insensitively
    pub fn lookup_prefix(&self, source: &str) -> Option<&str> {
        let source = source.trim();
        if source.chars().count() < 2 {
            return None;
        }
        let prefix = source.chars().take(2).collect::<String>().to_lowercase();
        self.prefix_table
            .iter()
            .find(|(key, _)| key.to_lowercase() == prefix)
            .map(|(_, value)| value.as_str())
    }

    /// Value derived for a row whose source reads `source`: the prefix table
    /// first, then the fallback.
    pub fn derive(&self, source: Option<&str>) -> Option<Derived<'_>> {
        match source.and_then(|s| self.lookup_prefix(s)) {
            Some(value) => Some(Derived::Prefix(value)),
            None => self.fallback.as_deref().map(Derived::Fallback),
        }
    }

    /// Candidate target columns, primary first
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.target_field.as_str()).chain(self.alternate_targets.iter().map(String::as_str))
    }
}

/// Where a derived value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derived<'a> {
    Prefix(&'a str),
    Fallback(&'a str),
}

impl<'a> Derived<'a> {
    pub fn value(&self) -> &'a str {
        match *self {
            Derived::Prefix(value) | Derived::Fallback(value) => value,
        }
    }
}

/// A named bundle of view and value transformations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    pub id: PresetId,
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keep_fields: Vec<String>,
    #[serde(default)]
    pub rename_fields: IndexMap<String, String>,
    #[serde(default)]
    pub value_mapping: ValueMapping,
    #[serde(default, rename = "derivationRules")]
    pub derivation: Vec<DerivationRule>,
    #[serde(default)]
    pub row_filters: Vec<RowFilter>,
    #[serde(default)]
    pub is_user_preset: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

impl Preset {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: String::new(),
            keep_fields: Vec::new(),
            rename_fields: IndexMap::new(),
            value_mapping: ValueMapping::new(),
            derivation: Vec::new(),
            row_filters: Vec::new(),
            is_user_preset: false,
            saved_at: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn keep<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keep_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.rename_fields.insert(from.into(), to.into());
        self
    }

    pub fn map_value(mut self, column: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.value_mapping
            .entry(column.into())
            .or_default()
            .insert(from.into(), to.into());
        self
    }

    pub fn derive(mut self, rule: DerivationRule) -> Self {
        self.derivation.push(rule);
        self
    }

    pub fn filter(mut self, filter: RowFilter) -> Self {
        self.row_filters.push(filter);
        self
    }

    /// Reject presets that cannot be stored or applied
    pub fn validate(&self) -> Result<(), crate::PresetError> {
        if self.id.trim().is_empty() {
            return Err(crate::PresetError::Invalid("missing id".into()));
        }
        if self.label.trim().is_empty() {
            return Err(crate::PresetError::Invalid(format!("preset '{}' has no label", self.id)));
        }
        Ok(())
    }
}
