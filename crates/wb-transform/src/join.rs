use ahash::AHashMap;
use serde::Serialize;
use tracing::{info, warn};

use wb_core::{Dataset, Scalar};
use wb_data::TabularStore;
use wb_views::ViewState;

use crate::NO_DATASET;

/// Parameters of a lookup join
#[derive(Debug, Clone)]
pub struct JoinSpec<'a> {
    /// Key column in the loaded dataset, by key or display name
    pub local_key: String,
    pub lookup: &'a Dataset,
    pub lookup_key: String,
    /// Lookup columns to import. Only columns the dataset lacks are imported.
    pub columns: Vec<String>,
    pub case_sensitive: bool,
    /// Written to every imported column of an unmatched row
    pub fallback: String,
}

/// Counts reported by [`join_lookup`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JoinReport {
    pub matched: usize,
    pub unmatched: usize,
    /// Columns that did not exist before the join
    pub added_columns: Vec<String>,
    /// Requested columns already in the dataset, left untouched
    pub skipped_columns: Vec<String>,
    pub message: String,
}

impl JoinReport {
    fn skipped(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn is_change(&self) -> bool {
        self.matched + self.unmatched > 0
    }
}

/// Copy columns from a lookup table onto rows with a matching key.
///
/// Keys are trimmed and, unless `case_sensitive`, lowercased. The first
/// lookup row wins for duplicate keys. Unmatched rows get the fallback.
/// Only new columns are imported: a requested column the dataset already has
/// (the key, protected identity columns, the note column) is reported in
/// `skipped_columns` and never written. New columns are appended to the
/// dataset and to the visible fields.
pub fn join_lookup(store: &mut TabularStore, view: &mut ViewState, spec: &JoinSpec<'_>) -> JoinReport {
    let Some(current) = store.dataset() else {
        return JoinReport::skipped(NO_DATASET);
    };
    let Some(local_key) = view.resolve_field(current, &spec.local_key) else {
        return JoinReport::skipped(format!("Column \"{}\" does not exist.", spec.local_key));
    };
    if !spec.lookup.has_field(&spec.lookup_key) {
        return JoinReport::skipped(format!("Lookup column \"{}\" does not exist.", spec.lookup_key));
    }

    let mut skipped_columns = Vec::new();
    let columns: Vec<&String> = spec
        .columns
        .iter()
        .filter(|c| {
            if !spec.lookup.has_field(c) {
                warn!(column = %c, "Skipping join column missing from lookup table");
                return false;
            }
            if current.has_field(c) {
                warn!(column = %c, "Skipping join column already in dataset");
                if !skipped_columns.contains(*c) {
                    skipped_columns.push(c.to_string());
                }
                return false;
            }
            true
        })
        .collect();
    if columns.is_empty() {
        let mut report = JoinReport::skipped(if skipped_columns.is_empty() {
            "No lookup columns selected.".to_string()
        } else {
            format!("No new columns to import; already present: {}.", skipped_columns.join(", "))
        });
        report.skipped_columns = skipped_columns;
        return report;
    }

    let normalize = |value: &Scalar| {
        let key = value.as_display().trim().to_string();
        if spec.case_sensitive {
            key
        } else {
            key.to_lowercase()
        }
    };

    let mut index: AHashMap<String, usize> = AHashMap::new();
    for row in 0..spec.lookup.row_count() {
        let key = normalize(spec.lookup.value(row, &spec.lookup_key));
        if !key.is_empty() {
            index.entry(key).or_insert(row);
        }
    }

    let mut working = current.clone();
    let mut added_columns = Vec::new();
    for column in &columns {
        if working.append_field(column) {
            added_columns.push(column.to_string());
        }
    }

    let fallback = Scalar::from_text(spec.fallback.as_str());
    let mut matched = 0;
    let mut unmatched = 0;
    for row in working.rows_mut() {
        let key = row.get(&local_key).map(normalize).unwrap_or_default();
        match index.get(&key).filter(|_| !key.is_empty()) {
            Some(&lookup_row) => {
                matched += 1;
                for column in &columns {
                    row.insert(column.to_string(), spec.lookup.value(lookup_row, column).clone());
                }
            }
            None => {
                unmatched += 1;
                for column in &columns {
                    row.insert(column.to_string(), fallback.clone());
                }
            }
        }
    }

    store.commit(working);

    if !view.visible_fields.is_empty() {
        for column in &added_columns {
            if !view.visible_fields.contains(column) {
                view.visible_fields.push(column.clone());
            }
        }
    }
    for column in &added_columns {
        view.display_names.insert(column.clone(), column.clone());
    }

    info!(matched, unmatched, added = added_columns.len(), "Joined lookup table");
    let mut message = format!(
        "Joined {} columns: {} rows matched, {} unmatched.",
        columns.len(),
        matched,
        unmatched
    );
    if !skipped_columns.is_empty() {
        message.push_str(&format!(" Already present, not imported: {}.", skipped_columns.join(", ")));
    }
    JoinReport {
        message,
        matched,
        unmatched,
        added_columns,
        skipped_columns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use wb_core::{AnnotationStore, MemoryStore, WorkbenchSettings};
    use wb_data::RawTable;

    fn store() -> TabularStore {
        let raw = RawTable {
            fields: vec!["Email".into(), "Dept".into()],
            rows: vec![
                vec![Scalar::from(" Ann@X.com"), Scalar::from("IT")],
                vec![Scalar::from("bob@x.com"), Scalar::from("HR")],
                vec![Scalar::Empty, Scalar::from("HR")],
            ],
        };
        let mut store = TabularStore::new();
        let annotations = AnnotationStore::open(Arc::new(MemoryStore::new()));
        store.ingest(raw, "t.csv", &annotations, &WorkbenchSettings::default());
        store
    }

    fn lookup() -> Dataset {
        Dataset::from_records(
            vec!["mail".into(), "Manager".into(), "Dept".into()],
            vec![
                vec!["ann@x.com".into(), "Carol".into(), "Security".into()],
                vec!["ANN@x.com".into(), "Dave".into(), "Ops".into()],
            ],
        )
    }

    fn spec(lookup: &Dataset, case_sensitive: bool) -> JoinSpec<'_> {
        JoinSpec {
            local_key: "Email".into(),
            lookup,
            lookup_key: "mail".into(),
            columns: vec!["Manager".into(), "Dept".into(), "Missing".into()],
            case_sensitive,
            fallback: "unknown".into(),
        }
    }

    #[test]
    fn test_join_first_match_and_fallback() {
        let mut store = store();
        let mut view = ViewState::for_fields(store.dataset().unwrap().fields());
        let lookup = lookup();

        let report = join_lookup(&mut store, &mut view, &spec(&lookup, false));
        assert_eq!(report.matched, 1);
        assert_eq!(report.unmatched, 2);
        assert_eq!(report.added_columns, vec!["Manager"]);
        assert_eq!(report.skipped_columns, vec!["Dept"]);

        let ds = store.dataset().unwrap();
        assert_eq!(ds.fields().last().map(String::as_str), Some("Manager"));
        assert_eq!(ds.value(0, "Manager"), &Scalar::from("Carol"));
        assert_eq!(ds.value(1, "Manager"), &Scalar::from("unknown"));
        assert_eq!(ds.value(0, "Dept"), &Scalar::from("IT"));
        assert_eq!(ds.value(2, "Dept"), &Scalar::from("HR"));
        assert_eq!(view.visible_fields.last().map(String::as_str), Some("Manager"));
    }

    #[test]
    fn test_case_sensitive_join() {
        let mut store = store();
        let mut view = ViewState::for_fields(store.dataset().unwrap().fields());
        let lookup = lookup();
        let report = join_lookup(&mut store, &mut view, &spec(&lookup, true));
        assert_eq!(report.matched, 0);
        assert_eq!(report.unmatched, 3);
    }

    #[test]
    fn test_join_undo_and_view_prune() {
        let mut store = store();
        let before = store.dataset().unwrap().clone();
        let mut view = ViewState::for_fields(before.fields());
        let lookup = lookup();

        join_lookup(&mut store, &mut view, &spec(&lookup, false));
        assert!(store.restore_undo());
        assert_eq!(store.dataset().unwrap(), &before);

        view.prune(store.dataset().unwrap().fields());
        assert!(!view.visible_fields.iter().any(|f| f == "Manager"));
        assert!(!view.display_names.contains_key("Manager"));
    }

    #[test]
    fn test_missing_keys_are_no_ops() {
        let mut store = store();
        let mut view = ViewState::for_fields(store.dataset().unwrap().fields());
        let lookup = lookup();

        let mut bad = spec(&lookup, false);
        bad.local_key = "Nope".into();
        assert!(!join_lookup(&mut store, &mut view, &bad).is_change());

        let mut bad = spec(&lookup, false);
        bad.lookup_key = "Nope".into();
        assert!(!join_lookup(&mut store, &mut view, &bad).is_change());
        assert!(!store.has_undo());
    }

    #[test]
    fn test_join_never_overwrites_existing_columns() {
        let mut store = store();
        let before = store.dataset().unwrap().clone();
        let mut view = ViewState::for_fields(store.dataset().unwrap().fields());
        let lookup = Dataset::from_records(
            vec!["Email".into(), "Dept".into()],
            vec![vec!["ann@x.com".into(), "Security".into()]],
        );
        let mut only_existing = spec(&lookup, false);
        only_existing.lookup_key = "Email".into();
        only_existing.columns = vec!["Email".into(), "Dept".into()];

        let report = join_lookup(&mut store, &mut view, &only_existing);
        assert!(!report.is_change());
        assert_eq!(report.skipped_columns, vec!["Email", "Dept"]);
        assert!(!store.has_undo());
        assert_eq!(store.dataset().unwrap(), &before);
    }
}
