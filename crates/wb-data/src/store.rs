//! Tabular store: the single owner of the loaded dataset
//!
//! All mutations go through here. Destructive operations snapshot the
//! dataset into a one-level [`UndoSlot`] before touching it.

use std::collections::BTreeSet;

use tracing::{debug, info};

use wb_core::{AnnotationStore, Dataset, Row, Scalar, WorkbenchSettings};

use crate::sources::RawTable;

/// Holds at most one prior dataset snapshot
#[derive(Debug, Default)]
pub struct UndoSlot {
    snapshot: Option<Dataset>,
}

impl UndoSlot {
    /// Replace the slot content with a copy of `dataset`
    pub fn store(&mut self, dataset: &Dataset) {
        self.snapshot = Some(dataset.clone());
    }

    /// Keep an owned dataset as the snapshot
    pub fn put(&mut self, dataset: Dataset) {
        self.snapshot = Some(dataset);
    }

    /// Take the snapshot out, leaving the slot empty
    pub fn take(&mut self) -> Option<Dataset> {
        self.snapshot.take()
    }

    pub fn clear(&mut self) {
        self.snapshot = None;
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.is_none()
    }
}

/// Outcome of an ingest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub rows: usize,
    pub columns: usize,
    pub hydrated_notes: usize,
}

/// Outcome of a single cell edit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellUpdate {
    /// The cell was written
    pub applied: bool,
    /// Annotation key written back, for note-column edits
    pub annotation_key: Option<String>,
}

/// The authoritative holder of the dataset
#[derive(Debug, Default)]
pub struct TabularStore {
    dataset: Option<Dataset>,
    source_name: String,
    undo: UndoSlot,
    selection: BTreeSet<usize>,
}

impl TabularStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    /// Mutable access for in-place transforms
    pub fn dataset_mut(&mut self) -> Option<&mut Dataset> {
        self.dataset.as_mut()
    }

    pub fn is_loaded(&self) -> bool {
        self.dataset.is_some()
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Replace the dataset wholesale with a decoded table.
    ///
    /// Ensures the note column exists, hydrates it from stored annotations
    /// and resets undo and selection.
    pub fn ingest(
        &mut self,
        raw: RawTable,
        source_name: &str,
        annotations: &AnnotationStore,
        settings: &WorkbenchSettings,
    ) -> IngestReport {
        let mut dataset = raw.into_dataset();
        let note_column = settings.note_column.as_str();
        dataset.append_field(note_column);

        let mut hydrated_notes = 0;
        for row in dataset.rows_mut() {
            let Some(key) = settings.annotation_key.key_for(row) else {
                continue;
            };
            if let Some(note) = annotations.note_for(&key) {
                row.insert(note_column.to_string(), Scalar::from_text(note));
                hydrated_notes += 1;
            }
        }

        let report = IngestReport {
            rows: dataset.row_count(),
            columns: dataset.fields().len(),
            hydrated_notes,
        };

        info!(
            source = source_name,
            rows = report.rows,
            columns = report.columns,
            hydrated = hydrated_notes,
            "Ingested dataset"
        );

        self.dataset = Some(dataset);
        self.source_name = source_name.to_string();
        self.undo.clear();
        self.selection.clear();

        report
    }

    /// Update one cell in place. Edits to the note column are written back to
    /// the annotation store when the row has a composite key.
    pub fn mutate_cell(
        &mut self,
        row: usize,
        field: &str,
        value: Scalar,
        annotations: &mut AnnotationStore,
        settings: &WorkbenchSettings,
    ) -> CellUpdate {
        let Some(dataset) = self.dataset.as_mut() else {
            return CellUpdate::default();
        };

        let note = value.as_display();
        if !dataset.set_value(row, field, value) {
            return CellUpdate::default();
        }

        let mut update = CellUpdate {
            applied: true,
            annotation_key: None,
        };

        if field == settings.note_column {
            if let Some(key) = dataset.rows().get(row).and_then(|r| settings.annotation_key.key_for(r)) {
                annotations.upsert(&key, &note);
                update.annotation_key = Some(key);
            }
        }

        update
    }

    /// Copy the current dataset into the undo slot. Returns false when
    /// nothing is loaded.
    pub fn snapshot_for_undo(&mut self) -> bool {
        match &self.dataset {
            Some(dataset) => {
                self.undo.store(dataset);
                true
            }
            None => false,
        }
    }

    /// Swap the undo snapshot back in. A second call without an intervening
    /// snapshot is a no-op returning false.
    pub fn restore_undo(&mut self) -> bool {
        match self.undo.take() {
            Some(snapshot) => {
                debug!(rows = snapshot.row_count(), "Restored undo snapshot");
                self.dataset = Some(snapshot);
                self.selection.clear();
                true
            }
            None => false,
        }
    }

    /// Install a transformed copy of the dataset. The replaced dataset becomes
    /// the undo snapshot. Returns false when nothing is loaded.
    pub fn commit(&mut self, dataset: Dataset) -> bool {
        let Some(previous) = self.dataset.take() else {
            return false;
        };
        if previous.row_count() != dataset.row_count() {
            self.selection.clear();
        }
        debug!(
            before = previous.row_count(),
            after = dataset.row_count(),
            "Committed transformed dataset"
        );
        self.undo.put(previous);
        self.dataset = Some(dataset);
        true
    }

    pub fn has_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    /// Replace every row. Callers snapshot for undo first.
    pub fn replace_rows(&mut self, rows: Vec<Row>) {
        if let Some(dataset) = self.dataset.as_mut() {
            dataset.replace_rows(rows);
            self.selection.clear();
        }
    }

    /// Mark a row as selected
    pub fn select_row(&mut self, row: usize) -> bool {
        let in_range = self.dataset.as_ref().map(|d| row < d.row_count()).unwrap_or(false);
        if in_range {
            self.selection.insert(row);
        }
        in_range
    }

    pub fn deselect_row(&mut self, row: usize) {
        self.selection.remove(&row);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Selected row indices in ascending order
    pub fn selected_rows(&self) -> Vec<usize> {
        self.selection.iter().copied().collect()
    }

    /// Drop the dataset entirely
    pub fn clear(&mut self) {
        self.dataset = None;
        self.source_name.clear();
        self.undo.clear();
        self.selection.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use wb_core::MemoryStore;

    fn raw(fields: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|v| Scalar::from_text(*v)).collect())
                .collect(),
        }
    }

    fn annotations() -> AnnotationStore {
        AnnotationStore::open(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_ingest_adds_note_column() {
        let mut store = TabularStore::new();
        let settings = WorkbenchSettings::default();
        let report = store.ingest(raw(&["Email"], &[&["a@x.com"]]), "f.csv", &annotations(), &settings);

        assert_eq!(report.columns, 2);
        let ds = store.dataset().unwrap();
        assert_eq!(ds.fields(), &["Email", "StatusNote"]);
        assert_eq!(ds.value(0, "StatusNote"), &Scalar::Empty);
        assert_eq!(store.source_name(), "f.csv");
    }

    #[test]
    fn test_ingest_hydrates_notes() {
        let settings = WorkbenchSettings::default();
        let mut notes = annotations();
        notes.upsert("a@x.com::2024-01-01", "Reported");

        let mut store = TabularStore::new();
        let report = store.ingest(
            raw(
                &["Email", "Due Date", "StatusNote"],
                &[&["A@X.com", "2024-01-01", "old"], &["b@x.com", "2024-01-01", "kept"], &["", "2024-01-01", ""]],
            ),
            "f.csv",
            &notes,
            &settings,
        );

        assert_eq!(report.hydrated_notes, 1);
        let ds = store.dataset().unwrap();
        assert_eq!(ds.fields().len(), 3);
        assert_eq!(ds.value(0, "StatusNote"), &Scalar::from("Reported"));
        assert_eq!(ds.value(1, "StatusNote"), &Scalar::from("kept"));
    }

    #[test]
    fn test_note_edit_writes_back() {
        let settings = WorkbenchSettings::default();
        let mut notes = annotations();
        let mut store = TabularStore::new();
        store.ingest(
            raw(&["Email", "Due Date"], &[&["a@x.com", "2024-01-01"], &["", ""]]),
            "f.csv",
            &notes,
            &settings,
        );

        let update = store.mutate_cell(0, "StatusNote", Scalar::from("Clicked"), &mut notes, &settings);
        assert!(update.applied);
        assert_eq!(update.annotation_key.as_deref(), Some("a@x.com::2024-01-01"));
        assert_eq!(notes.note_for("a@x.com::2024-01-01"), Some("Clicked"));

        let update = store.mutate_cell(1, "StatusNote", Scalar::from("x"), &mut notes, &settings);
        assert!(update.applied);
        assert!(update.annotation_key.is_none());
        assert_eq!(notes.len(), 1);

        let update = store.mutate_cell(9, "StatusNote", Scalar::from("x"), &mut notes, &settings);
        assert!(!update.applied);
    }

    #[test]
    fn test_undo_is_single_level() {
        let settings = WorkbenchSettings::default();
        let mut store = TabularStore::new();
        store.ingest(raw(&["k"], &[&["1"], &["2"]]), "f.csv", &annotations(), &settings);
        let before = store.dataset().unwrap().clone();

        assert!(store.snapshot_for_undo());
        store.replace_rows(vec![]);
        assert_eq!(store.dataset().unwrap().row_count(), 0);

        assert!(store.restore_undo());
        assert_eq!(store.dataset().unwrap(), &before);
        assert!(!store.restore_undo());
        assert_eq!(store.dataset().unwrap(), &before);
    }

    #[test]
    fn test_commit_keeps_previous_for_undo() {
        let settings = WorkbenchSettings::default();
        let mut store = TabularStore::new();
        assert!(!store.commit(Dataset::default()));

        store.ingest(raw(&["k"], &[&["1"], &["2"]]), "f.csv", &annotations(), &settings);
        let before = store.dataset().unwrap().clone();
        store.select_row(1);

        let mut next = before.clone();
        next.replace_rows(vec![next.rows()[0].clone()]);
        assert!(store.commit(next));
        assert_eq!(store.dataset().unwrap().row_count(), 1);
        assert!(store.selected_rows().is_empty());

        assert!(store.restore_undo());
        assert_eq!(store.dataset().unwrap(), &before);
    }

    #[test]
    fn test_ingest_clears_undo_and_selection() {
        let settings = WorkbenchSettings::default();
        let mut store = TabularStore::new();
        store.ingest(raw(&["k"], &[&["1"]]), "f.csv", &annotations(), &settings);
        store.snapshot_for_undo();
        assert!(store.select_row(0));
        assert!(!store.select_row(4));

        store.ingest(raw(&["k"], &[&["1"]]), "f.csv", &annotations(), &settings);
        assert!(!store.has_undo());
        assert!(store.selected_rows().is_empty());
    }
}
