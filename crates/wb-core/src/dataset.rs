//! The in-memory table

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::value::{Row, Scalar};

/// Fields plus rows, reconciled so that field names are unique and every row
/// carries a value for every field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    fields: Vec<String>,
    rows: Vec<Row>,
}

impl Dataset {
    /// Build a dataset, reconciling fields and rows
    pub fn new(fields: Vec<String>, rows: Vec<Row>) -> Self {
        let fields = unique_fields(fields);
        let rows = rows
            .into_iter()
            .map(|row| reconcile_row(&fields, row))
            .collect();

        Self { fields, rows }
    }

    /// Build a dataset from positional records
    pub fn from_records(fields: Vec<String>, records: Vec<Vec<Scalar>>) -> Self {
        let fields = unique_fields(fields);
        let rows = records
            .into_iter()
            .map(|record| {
                let mut values = record.into_iter();
                fields
                    .iter()
                    .map(|field| (field.clone(), values.next().unwrap_or_default()))
                    .collect::<Row>()
            })
            .collect();

        Self { fields, rows }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [Row] {
        &mut self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    pub fn field_index(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == field)
    }

    /// Value of a cell; missing rows or fields read as empty
    pub fn value(&self, row: usize, field: &str) -> &Scalar {
        static EMPTY: Scalar = Scalar::Empty;
        self.rows
            .get(row)
            .and_then(|r| r.get(field))
            .unwrap_or(&EMPTY)
    }

    /// Set a cell value. Returns false when the row or field does not exist.
    pub fn set_value(&mut self, row: usize, field: &str, value: Scalar) -> bool {
        if !self.has_field(field) {
            return false;
        }
        match self.rows.get_mut(row) {
            Some(r) => {
                r.insert(field.to_string(), value);
                true
            }
            None => false,
        }
    }

    /// Append a new field, filling every row with an empty value.
    /// Returns false when the field already exists.
    pub fn append_field(&mut self, field: &str) -> bool {
        if self.has_field(field) {
            return false;
        }
        self.fields.push(field.to_string());
        for row in &mut self.rows {
            row.insert(field.to_string(), Scalar::Empty);
        }
        true
    }

    /// Replace all rows, reconciling each against the current fields
    pub fn replace_rows(&mut self, rows: Vec<Row>) {
        self.rows = rows
            .into_iter()
            .map(|row| reconcile_row(&self.fields, row))
            .collect();
    }
}

/// Drop empty names and suffix duplicates with `_2`, `_3`, ...
fn unique_fields(fields: Vec<String>) -> Vec<String> {
    let mut seen = AHashSet::new();
    let mut result = Vec::with_capacity(fields.len());

    for (idx, field) in fields.into_iter().enumerate() {
        let base = if field.is_empty() {
            format!("Column {}", idx + 1)
        } else {
            field
        };

        let mut candidate = base.clone();
        let mut suffix = 2;
        while seen.contains(&candidate) {
            candidate = format!("{}_{}", base, suffix);
            suffix += 1;
        }

        seen.insert(candidate.clone());
        result.push(candidate);
    }

    result
}

fn reconcile_row(fields: &[String], mut row: Row) -> Row {
    fields
        .iter()
        .map(|field| {
            let value = row.swap_remove(field).unwrap_or_default();
            (field.clone(), value)
        })
        .collect()
}
