//! The workbench session
//!
//! One explicit object owns the dataset, the view state, annotations and
//! presets. Operations return an [`OperationStatus`] line instead of failing;
//! exports return a [`SessionError`] because they also produce bytes.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use wb_core::events::{events, EventBus};
use wb_core::{
    compose_key, AnnotationStore, DataSessionProvider, Dataset, ExportScope, KeyValueStore, Scalar, SessionSnapshot,
    Summary, WorkbenchSettings,
};
use wb_data::{open_source, DataError, DatasetLoader, FileConfig, NullConfig, RawTable, TableSource, TabularStore};
use wb_presets::{PresetRegistry, ValueMapping};
use wb_transform::{CleanupOp, CleanupTarget, JoinSpec, KeepPolicy, TransformOutcome};
use wb_views::{
    group_and_count, preview, render, suggested_file_name, ExportError, ExportFormat, ExportTable, FilterState, Preview,
    RowFilter, SearchScope, SortState, ViewState, DATA_SHEET, SUMMARY_SHEET,
};

use crate::config::AppConfig;

const NO_DATASET: &str = "No dataset loaded.";

/// Outcome line shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationStatus {
    pub ok: bool,
    pub message: String,
}

impl OperationStatus {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Errors from operations that produce output
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No dataset loaded")]
    NoDataset,

    #[error("No summary has been computed")]
    NoSummary,

    #[error("Column \"{0}\" does not exist")]
    UnknownColumn(String),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Data(#[from] DataError),
}

/// Encoded export ready to be written or downloaded
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub file_name: String,
    pub format: ExportFormat,
    pub bytes: Vec<u8>,
}

/// Join parameters; the lookup table is supplied separately
#[derive(Debug, Clone, Default)]
pub struct JoinOptions {
    pub local_key: String,
    pub lookup_key: String,
    pub columns: Vec<String>,
    pub case_sensitive: bool,
    pub fallback: String,
}

/// All state for one workbench
pub struct WorkbenchSession {
    id: Uuid,
    settings: WorkbenchSettings,
    null_config: NullConfig,
    delimiter: u8,
    store: TabularStore,
    view: ViewState,
    sort: SortState,
    filter: FilterState,
    annotations: AnnotationStore,
    presets: PresetRegistry,
    loader: DatasetLoader,
    last_summary: Option<Summary>,
    events: EventBus,
}

impl WorkbenchSession {
    /// Build a session from configuration, opening its storage backend
    pub fn new(config: &AppConfig) -> Self {
        let mut session = Self::with_backend(
            config.settings.clone(),
            config.null_handling.clone(),
            config.storage.open(),
        );
        session.delimiter = config.delimiter_byte();
        session
    }

    /// Build a session over an already opened backend
    pub fn with_backend(
        settings: WorkbenchSettings,
        null_config: NullConfig,
        backend: Arc<dyn KeyValueStore>,
    ) -> Self {
        let id = Uuid::new_v4();
        let annotations = AnnotationStore::open(backend.clone());
        let presets = PresetRegistry::open(backend);
        debug!(session = %id, notes = annotations.len(), "Created workbench session");

        Self {
            id,
            settings,
            null_config,
            delimiter: b',',
            store: TabularStore::new(),
            view: ViewState::default(),
            sort: SortState::default(),
            filter: FilterState::default(),
            annotations,
            presets,
            loader: DatasetLoader::new(),
            last_summary: None,
            events: EventBus::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn settings(&self) -> &WorkbenchSettings {
        &self.settings
    }

    pub fn set_export_scope(&mut self, scope: ExportScope) {
        self.settings.export_scope = scope;
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.store.dataset()
    }

    pub fn source_name(&self) -> &str {
        self.store.source_name()
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn sort(&self) -> &SortState {
        &self.sort
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn summary(&self) -> Option<&Summary> {
        self.last_summary.as_ref()
    }

    pub fn annotations(&self) -> &AnnotationStore {
        &self.annotations
    }

    pub fn presets(&self) -> &PresetRegistry {
        &self.presets
    }

    pub fn presets_mut(&mut self) -> &mut PresetRegistry {
        &mut self.presets
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn loader(&self) -> &DatasetLoader {
        &self.loader
    }

    pub fn has_undo(&self) -> bool {
        self.store.has_undo()
    }

    /// File configuration for a path using the session's parsing settings
    pub fn file_config(&self, path: &Path) -> FileConfig {
        FileConfig::new(path)
            .with_null_config(self.null_config.clone())
            .with_delimiter(self.delimiter)
    }

    // Loading

    /// Decode and ingest a CSV or spreadsheet file
    pub async fn load_path(&mut self, path: &Path) -> OperationStatus {
        let source = open_source(self.file_config(path));
        self.load_source(source.as_ref()).await
    }

    /// Decode and ingest any table source. Rejected while another load is
    /// in flight.
    pub async fn load_source(&mut self, source: &dyn TableSource) -> OperationStatus {
        let loader = self.loader.clone();
        let result = loader.load(source).await;
        self.finish_load(result, source.source_name())
    }

    /// Ingest a decode result. Failures keep the previous dataset.
    pub fn finish_load(&mut self, result: Result<RawTable, DataError>, source_name: &str) -> OperationStatus {
        match result {
            Ok(raw) => self.ingest_raw(raw, source_name),
            Err(e) => {
                warn!(session = %self.id, source = source_name, "Load failed: {}", e);
                self.events.publish(events::DatasetLoadFailed {
                    source_name: source_name.to_string(),
                    error: e.to_string(),
                });
                OperationStatus::failure(format!("Failed to load {}: {}", source_name, e))
            }
        }
    }

    /// Replace the dataset and reset every view component
    pub fn ingest_raw(&mut self, raw: RawTable, source_name: &str) -> OperationStatus {
        let report = self.store.ingest(raw, source_name, &self.annotations, &self.settings);
        let fields = self.current_fields();

        self.view.reset_for(&fields);
        self.sort.reset();
        self.filter.clear();
        self.last_summary = None;

        self.events.publish(events::DatasetLoaded {
            source_name: source_name.to_string(),
            row_count: report.rows,
            column_count: report.columns,
            hydrated_notes: report.hydrated_notes,
        });

        let mut message = format!(
            "Loaded {} rows and {} columns from {}.",
            report.rows, report.columns, source_name
        );
        if report.hydrated_notes > 0 {
            message.push_str(&format!(" Restored {} saved notes.", report.hydrated_notes));
        }
        if let Some(preset) = self.presets.suggest(&fields) {
            message.push_str(&format!(" Suggested preset: {}.", preset.label));
        }

        info!(session = %self.id, source = source_name, rows = report.rows, "Dataset ready");
        OperationStatus::success(message)
    }

    // Editing

    /// Edit one cell. Note-column edits are written back to the annotation
    /// store when the row has a composite key.
    pub fn set_cell(&mut self, row: usize, column: &str, value: &str) -> OperationStatus {
        let field = match self.resolve(column) {
            Ok(field) => field,
            Err(status) => return status,
        };

        let update = self.store.mutate_cell(
            row,
            &field,
            Scalar::from_text(value),
            &mut self.annotations,
            &self.settings,
        );
        if !update.applied {
            return OperationStatus::failure(format!("Row {} does not exist.", row));
        }

        let mut message = format!("Updated row {} {}.", row, self.view.display_name(&field));
        if let Some(key) = update.annotation_key {
            if self.annotations.is_degraded() {
                message.push_str(" Storage is unavailable; the note is kept for this session only.");
            }
            self.events.publish(events::AnnotationSaved { key });
        }

        self.refresh_summary();
        OperationStatus::success(message)
    }

    /// Save a note for a person and campaign, updating any loaded rows with
    /// the same key
    pub fn annotate(&mut self, person: &str, campaign: &str, note: &str) -> OperationStatus {
        let Some(key) = compose_key(person, campaign) else {
            return OperationStatus::failure("A person identifier and a campaign are both required.");
        };

        self.annotations.upsert(&key, note);

        let note_column = self.settings.note_column.clone();
        let key_config = self.settings.annotation_key.clone();
        let mut rows = 0;
        if let Some(dataset) = self.store.dataset_mut() {
            for row in dataset.rows_mut() {
                if key_config.key_for(row).as_deref() == Some(key.as_str()) {
                    row.insert(note_column.clone(), Scalar::from_text(note));
                    rows += 1;
                }
            }
        }

        self.events.publish(events::AnnotationSaved { key: key.clone() });
        self.refresh_summary();

        let mut message = format!("Saved note for {} ({} loaded rows).", key, rows);
        if self.annotations.is_degraded() {
            message.push_str(" Storage is unavailable; the note is kept for this session only.");
        }
        OperationStatus::success(message)
    }

    pub fn select_row(&mut self, row: usize) -> bool {
        self.store.select_row(row)
    }

    pub fn clear_selection(&mut self) {
        self.store.clear_selection();
    }

    // View

    pub fn set_sort(&mut self, sort: SortState) {
        self.sort = sort;
    }

    /// Header click behaviour: same column flips, new column sorts ascending
    pub fn toggle_sort(&mut self, column: &str) -> OperationStatus {
        match self.resolve(column) {
            Ok(field) => {
                self.sort.toggle(&field);
                OperationStatus::success(format!("Sorted by {}.", self.view.display_name(&field)))
            }
            Err(status) => status,
        }
    }

    pub fn set_search(&mut self, text: &str, scope: SearchScope) {
        self.filter.search_text = text.to_string();
        self.filter.scope = scope;
    }

    /// Add a row filter; the column may be a key or a display name
    pub fn add_row_filter(&mut self, mut filter: RowFilter) -> OperationStatus {
        match self.resolve(&filter.field) {
            Ok(field) => {
                filter.field = field;
                self.filter.row_filters.push(filter);
                OperationStatus::success(format!("{} row filters active.", self.filter.row_filters.len()))
            }
            Err(status) => status,
        }
    }

    pub fn clear_filters(&mut self) {
        self.filter.clear();
    }

    pub fn apply_column_changes(&mut self, visible: &[String], names: &[(String, String)]) -> OperationStatus {
        let Some(dataset) = self.store.dataset() else {
            return OperationStatus::failure(NO_DATASET);
        };
        self.view.apply_column_changes(dataset, visible, names);
        OperationStatus::success(format!(
            "{} of {} columns visible.",
            self.view.effective_fields(dataset).len(),
            dataset.fields().len()
        ))
    }

    /// First rows of the filtered, sorted view
    pub fn preview(&self) -> Option<Preview> {
        let dataset = self.store.dataset()?;
        Some(preview(
            dataset,
            &self.view,
            &self.sort,
            &self.filter,
            self.settings.preview_rows,
        ))
    }

    // Transforms

    pub fn apply_value_mapping(&mut self, mapping: &ValueMapping) -> OperationStatus {
        let protected = self.protected_columns();
        let outcome = wb_transform::apply_value_mapping(&mut self.store, &self.view, mapping, &protected);
        self.after_transform("value mapping", outcome)
    }

    /// Run a preset by id and install its row filters
    pub fn apply_preset(&mut self, id: &str) -> OperationStatus {
        let Some(preset) = self.presets.get(id).cloned() else {
            return OperationStatus::failure(format!("Unknown preset \"{}\".", id));
        };

        let protected = self.protected_columns();
        let report = wb_transform::apply_preset(&mut self.store, &mut self.view, &mut self.sort, &preset, &protected);
        if !report.applied {
            return OperationStatus::failure(report.message);
        }

        self.last_summary = None;
        self.filter.row_filters = preset.row_filters.clone();

        if report.changed_cells() > 0 {
            self.events.publish(events::DatasetMutated {
                operation: format!("preset {}", preset.id),
                changed: report.changed_cells(),
            });
        }
        self.events.publish(events::PresetApplied {
            preset_id: preset.id.clone(),
            preset_label: preset.label.clone(),
        });

        OperationStatus::success(report.message)
    }

    pub fn deduplicate(&mut self, key_column: &str, policy: KeepPolicy) -> OperationStatus {
        let outcome = wb_transform::deduplicate(&mut self.store, &self.view, key_column, policy);
        self.after_transform("deduplicate", outcome)
    }

    /// Clean up one column or every visible column. Protected columns and
    /// the note column are never touched.
    pub fn cleanup(&mut self, target: &CleanupTarget, op: CleanupOp) -> OperationStatus {
        let protected = self.protected_columns();
        let outcome = wb_transform::cleanup_column(&mut self.store, &self.view, target, op, &protected);
        self.after_transform("cleanup", outcome)
    }

    /// Join columns from an already loaded lookup table
    pub fn join_dataset(&mut self, lookup: &Dataset, options: &JoinOptions) -> OperationStatus {
        if !self.store.is_loaded() {
            return OperationStatus::failure(NO_DATASET);
        }
        let spec = JoinSpec {
            local_key: options.local_key.clone(),
            lookup,
            lookup_key: options.lookup_key.clone(),
            columns: options.columns.clone(),
            case_sensitive: options.case_sensitive,
            fallback: options.fallback.clone(),
        };
        let report = wb_transform::join_lookup(&mut self.store, &mut self.view, &spec);
        if !report.is_change() {
            return OperationStatus::failure(report.message);
        }
        self.events.publish(events::DatasetMutated {
            operation: "join".into(),
            changed: report.matched + report.unmatched,
        });
        self.refresh_summary();
        OperationStatus::success(report.message)
    }

    /// Decode a lookup file and join it. The main dataset is not replaced.
    pub async fn join_lookup(&mut self, path: &Path, options: &JoinOptions) -> OperationStatus {
        let source = open_source(self.file_config(path));
        match source.read_table().await {
            Ok(raw) => {
                let lookup = raw.into_dataset();
                self.join_dataset(&lookup, options)
            }
            Err(e) => OperationStatus::failure(format!("Failed to load lookup {}: {}", source.source_name(), e)),
        }
    }

    pub fn hide_selected_rows(&mut self) -> OperationStatus {
        let outcome = wb_transform::hide_selected_rows(&mut self.store);
        self.after_transform("hide rows", outcome)
    }

    /// Restore the snapshot taken before the last destructive operation
    pub fn undo(&mut self) -> OperationStatus {
        if !self.store.restore_undo() {
            return OperationStatus::failure("Nothing to undo.");
        }

        let fields = self.current_fields();
        self.view.prune(&fields);
        self.refresh_summary();

        let row_count = self.store.dataset().map(Dataset::row_count).unwrap_or(0);
        self.events.publish(events::UndoRestored { row_count });
        OperationStatus::success(format!("Restored previous state ({} rows).", row_count))
    }

    // Summary and export

    /// Group-and-count over the whole dataset
    pub fn run_summary(&mut self, column: &str) -> OperationStatus {
        let field = match self.resolve(column) {
            Ok(field) => field,
            Err(status) => return status,
        };
        let summary = self.store.dataset().and_then(|d| group_and_count(d, &field));
        match summary {
            Some(summary) => {
                let message = format!(
                    "{} distinct values of {} across {} rows.",
                    summary.rows.len(),
                    self.view.display_name(&field),
                    summary.total()
                );
                self.last_summary = Some(summary);
                OperationStatus::success(message)
            }
            None => OperationStatus::failure(NO_DATASET),
        }
    }

    /// Encode the projected dataset using the configured export scope
    pub fn export_view(&self, format: ExportFormat) -> Result<ExportArtifact, SessionError> {
        let dataset = self.store.dataset().ok_or(SessionError::NoDataset)?;
        let table = ExportTable::from_view(dataset, &self.view, &self.sort, &self.filter, self.settings.export_scope);
        let bytes = render(&table, format, DATA_SHEET, self.export_title())?;

        info!(session = %self.id, %format, rows = table.rows.len(), "Exported view");
        Ok(ExportArtifact {
            file_name: suggested_file_name(self.source_name(), "", format),
            format,
            bytes,
        })
    }

    /// Encode the last summary as `[label, Count]`
    pub fn export_summary(&self, format: ExportFormat) -> Result<ExportArtifact, SessionError> {
        let summary = self
            .last_summary
            .as_ref()
            .filter(|s| !s.rows.is_empty())
            .ok_or(SessionError::NoSummary)?;
        let label = self.view.display_name(&summary.field);
        let table = ExportTable::from_summary(summary, label);
        let title = format!("{}: {}", self.export_title(), label);
        let bytes = render(&table, format, SUMMARY_SHEET, &title)?;

        Ok(ExportArtifact {
            file_name: suggested_file_name(self.source_name(), "summary", format),
            format,
            bytes,
        })
    }

    // Helpers

    fn export_title(&self) -> &str {
        match self.source_name() {
            "" => "SecOps Workbench",
            name => name,
        }
    }

    fn current_fields(&self) -> Vec<String> {
        self.store
            .dataset()
            .map(|d| d.fields().to_vec())
            .unwrap_or_default()
    }

    /// Configured protected columns plus the note column
    fn protected_columns(&self) -> Vec<String> {
        let mut protected = self.settings.protected_columns.clone();
        if !protected.contains(&self.settings.note_column) {
            protected.push(self.settings.note_column.clone());
        }
        protected
    }

    /// Resolve a column by key or display name
    fn resolve(&self, column: &str) -> Result<String, OperationStatus> {
        let dataset = self
            .store
            .dataset()
            .ok_or_else(|| OperationStatus::failure(NO_DATASET))?;
        self.view
            .resolve_field(dataset, column)
            .ok_or_else(|| OperationStatus::failure(format!("Column \"{}\" does not exist.", column)))
    }

    fn after_transform(&mut self, operation: &str, outcome: TransformOutcome) -> OperationStatus {
        if !self.store.is_loaded() {
            return OperationStatus::failure(outcome.message);
        }
        if outcome.is_change() {
            self.events.publish(events::DatasetMutated {
                operation: operation.to_string(),
                changed: outcome.changed,
            });
            self.refresh_summary();
        }
        OperationStatus::success(outcome.message)
    }

    /// Recompute the cached summary after the rows changed
    fn refresh_summary(&mut self) {
        if let Some(field) = self.last_summary.as_ref().map(|s| s.field.clone()) {
            self.last_summary = self.store.dataset().and_then(|d| group_and_count(d, &field));
        }
    }
}

impl DataSessionProvider for WorkbenchSession {
    fn current_session_data(&self) -> Option<SessionSnapshot> {
        let dataset = self.store.dataset()?;
        Some(SessionSnapshot {
            fields: dataset.fields().to_vec(),
            rows: dataset.rows().to_vec(),
            visible_fields: self.view.effective_fields(dataset).to_vec(),
            display_names: self.view.display_names.clone(),
            source_name: self.source_name().to_string(),
        })
    }

    fn compute_group_and_count(&self, field: &str) -> Option<Summary> {
        let dataset = self.store.dataset()?;
        let field = self.view.resolve_field(dataset, field)?;
        group_and_count(dataset, &field)
    }
}

/// A session shared between tasks
#[derive(Clone)]
pub struct SharedSession {
    inner: Arc<RwLock<WorkbenchSession>>,
}

impl SharedSession {
    pub fn new(session: WorkbenchSession) -> Self {
        Self {
            inner: Arc::new(RwLock::new(session)),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, WorkbenchSession> {
        self.inner.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, WorkbenchSession> {
        self.inner.write()
    }

    /// Load a file without holding the session lock while decoding
    pub async fn load_path(&self, path: &Path) -> OperationStatus {
        let source = open_source(self.read().file_config(path));
        self.load_source(source.as_ref()).await
    }

    /// Decode outside the lock, then ingest under the write lock. A second
    /// load started while one is decoding is rejected.
    pub async fn load_source(&self, source: &dyn TableSource) -> OperationStatus {
        let loader = self.read().loader().clone();
        let result = loader.load(source).await;
        self.write().finish_load(result, source.source_name())
    }

    /// Read-only handle for consumers such as the report builder
    pub fn reader(&self) -> SessionReader {
        SessionReader {
            inner: self.inner.clone(),
        }
    }
}

impl DataSessionProvider for SharedSession {
    fn current_session_data(&self) -> Option<SessionSnapshot> {
        self.read().current_session_data()
    }

    fn compute_group_and_count(&self, field: &str) -> Option<Summary> {
        self.read().compute_group_and_count(field)
    }
}

/// Provider-only view of a [`SharedSession`]
#[derive(Clone)]
pub struct SessionReader {
    inner: Arc<RwLock<WorkbenchSession>>,
}

impl DataSessionProvider for SessionReader {
    fn current_session_data(&self) -> Option<SessionSnapshot> {
        self.inner.read().current_session_data()
    }

    fn compute_group_and_count(&self, field: &str) -> Option<Summary> {
        self.inner.read().compute_group_and_count(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wb_core::MemoryStore;

    fn session() -> WorkbenchSession {
        WorkbenchSession::with_backend(
            WorkbenchSettings::default(),
            NullConfig::default(),
            Arc::new(MemoryStore::new()),
        )
    }

    fn raw(fields: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|v| Scalar::from_text(*v)).collect())
                .collect(),
        }
    }

    #[test]
    fn test_operations_without_dataset() {
        let mut session = session();
        assert!(!session.set_cell(0, "Email", "x").ok);
        assert!(!session.run_summary("Email").ok);
        assert!(!session.undo().ok);
        assert!(!session.deduplicate("Email", KeepPolicy::First).ok);
        assert!(matches!(session.export_view(ExportFormat::Csv), Err(SessionError::NoDataset)));
        assert!(session.preview().is_none());
        assert!(session.current_session_data().is_none());
    }

    #[test]
    fn test_failed_load_keeps_dataset() {
        let mut session = session();
        session.ingest_raw(raw(&["Email"], &[&["a@x.com"]]), "first.csv");

        let status = session.finish_load(Err(DataError::MissingHeader), "broken.csv");
        assert!(!status.ok);
        assert!(status.message.contains("broken.csv"));
        assert_eq!(session.source_name(), "first.csv");
        assert_eq!(session.dataset().unwrap().row_count(), 1);
    }

    #[test]
    fn test_summary_refreshes_after_edit() {
        let mut session = session();
        session.ingest_raw(raw(&["Dept"], &[&["IT"], &["HR"], &["IT"]]), "t.csv");
        assert!(session.run_summary("Dept").ok);
        assert_eq!(session.summary().unwrap().rows[0].count, 2);

        session.set_cell(1, "Dept", "IT");
        assert_eq!(session.summary().unwrap().rows[0].count, 3);

        assert!(session.apply_preset("phisherLike").ok);
        assert!(session.summary().is_none());
    }

    #[test]
    fn test_annotate_updates_loaded_rows() {
        let mut session = session();
        session.ingest_raw(
            raw(
                &["Email", "Due Date"],
                &[&["Ann@x.com", "2024-03-01"], &["bob@x.com", "2024-03-01"]],
            ),
            "t.csv",
        );

        let status = session.annotate(" ann@X.com ", "2024-03-01", "Reported phish");
        assert!(status.ok);
        let ds = session.dataset().unwrap();
        assert_eq!(ds.value(0, "StatusNote"), &Scalar::from("Reported phish"));
        assert_eq!(ds.value(1, "StatusNote"), &Scalar::Empty);
        assert_eq!(
            session.annotations().note_for("ann@x.com::2024-03-01"),
            Some("Reported phish")
        );

        assert!(!session.annotate("", "2024-03-01", "x").ok);
    }

    #[test]
    fn test_provider_uses_display_names() {
        let mut session = session();
        session.ingest_raw(raw(&["Custom Field 1"], &[&["a"], &["a"]]), "t.csv");
        session.apply_column_changes(
            &["Custom Field 1".to_string()],
            &[("Custom Field 1".to_string(), "SBU".to_string())],
        );

        let snapshot = session.current_session_data().unwrap();
        assert_eq!(snapshot.visible_fields, vec!["Custom Field 1"]);
        assert_eq!(snapshot.display_name("Custom Field 1"), "SBU");

        let summary = session.compute_group_and_count("SBU").unwrap();
        assert_eq!(summary.field, "Custom Field 1");
        assert_eq!(summary.rows[0].count, 2);
    }

    #[test]
    fn test_mapping_skips_protected_identity_columns() {
        let mut session = session();
        session.ingest_raw(raw(&["Email", "Dept"], &[&["ann@x.com", "IT"]]), "t.csv");

        let mut mapping = ValueMapping::new();
        mapping.insert(
            "Email".into(),
            [("ann@x.com".to_string(), "REDACTED".to_string())].into_iter().collect(),
        );
        let status = session.apply_value_mapping(&mapping);
        assert!(status.message.contains("Email"));
        assert!(!session.has_undo());

        mapping.insert("Dept".into(), [("IT".to_string(), "Tech".to_string())].into_iter().collect());
        assert!(session.apply_value_mapping(&mapping).ok);

        let ds = session.dataset().unwrap();
        assert_eq!(ds.value(0, "Email"), &Scalar::from("ann@x.com"));
        assert_eq!(ds.value(0, "Dept"), &Scalar::from("Tech"));
    }
}
