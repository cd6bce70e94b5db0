use tracing::info;

use wb_data::TabularStore;

use crate::{TransformOutcome, NO_DATASET};

/// Remove the selected rows from the dataset. Undoable.
pub fn hide_selected_rows(store: &mut TabularStore) -> TransformOutcome {
    let selected = store.selected_rows();
    let Some(current) = store.dataset() else {
        return TransformOutcome::skipped(NO_DATASET);
    };
    if selected.is_empty() {
        return TransformOutcome::skipped("No rows selected.");
    }

    let rows = current
        .rows()
        .iter()
        .enumerate()
        .filter(|(index, _)| selected.binary_search(index).is_err())
        .map(|(_, row)| row.clone())
        .collect();

    let mut working = current.clone();
    working.replace_rows(rows);
    let removed = current.row_count() - working.row_count();
    store.commit(working);
    store.clear_selection();

    info!(removed, "Hid selected rows");
    TransformOutcome::changed(removed, format!("Removed {} selected rows.", removed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use wb_core::{AnnotationStore, MemoryStore, Scalar, WorkbenchSettings};
    use wb_data::RawTable;

    #[test]
    fn test_hide_and_undo() {
        let raw = RawTable {
            fields: vec!["k".into()],
            rows: (0..4).map(|i| vec![Scalar::from(i as i64)]).collect(),
        };
        let mut store = TabularStore::new();
        let annotations = AnnotationStore::open(Arc::new(MemoryStore::new()));
        store.ingest(raw, "t.csv", &annotations, &WorkbenchSettings::default());
        let before = store.dataset().unwrap().clone();

        assert!(!hide_selected_rows(&mut store).is_change());

        store.select_row(1);
        store.select_row(3);
        let outcome = hide_selected_rows(&mut store);
        assert_eq!(outcome.changed, 2);

        let ds = store.dataset().unwrap();
        assert_eq!(ds.value(0, "k"), &Scalar::from(0_i64));
        assert_eq!(ds.value(1, "k"), &Scalar::from(2_i64));
        assert!(store.selected_rows().is_empty());

        assert!(store.restore_undo());
        assert_eq!(store.dataset().unwrap(), &before);
    }
}
