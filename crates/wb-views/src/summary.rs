//! Group-and-count summaries over the whole dataset

use ahash::AHashMap;

use wb_core::{Dataset, GroupCount, Summary, EMPTY_BUCKET};

/// Count distinct values of `field` across every row.
///
/// Blank cells land in the `(empty)` bucket. Buckets are ordered by count
/// descending, then by value; on equal counts the `(empty)` bucket sorts
/// after real values. Search and row filters are not consulted.
pub fn group_and_count(dataset: &Dataset, field: &str) -> Option<Summary> {
    if !dataset.has_field(field) {
        return None;
    }

    let mut counts: AHashMap<String, usize> = AHashMap::new();
    for row in 0..dataset.row_count() {
        let value = dataset.value(row, field);
        let key = if value.is_blank() {
            EMPTY_BUCKET.to_string()
        } else {
            value.as_display()
        };
        *counts.entry(key).or_insert(0) += 1;
    }

    let mut rows: Vec<GroupCount> = counts
        .into_iter()
        .map(|(value, count)| GroupCount { value, count })
        .collect();

    rows.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| (a.value == EMPTY_BUCKET).cmp(&(b.value == EMPTY_BUCKET)))
            .then_with(|| a.value.cmp(&b.value))
    });

    Some(Summary {
        field: field.to_string(),
        rows,
    })
}

/// Fields offered for grouping: everything except the note column
pub fn groupable_fields(dataset: &Dataset, note_column: &str) -> Vec<String> {
    dataset
        .fields()
        .iter()
        .filter(|f| f.as_str() != note_column)
        .cloned()
        .collect()
}
