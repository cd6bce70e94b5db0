use tracing::{info, warn};

use wb_core::{Dataset, Scalar};
use wb_data::TabularStore;
use wb_presets::ValueMapping;
use wb_views::ViewState;

use crate::{TransformOutcome, NO_DATASET};

/// One `from -> to` rule
enum Rule<'a> {
    Exact(&'a str),
    Prefix(&'a str),
}

impl<'a> Rule<'a> {
    fn parse(from: &'a str) -> Self {
        match from.strip_suffix('*') {
            Some(prefix) => Rule::Prefix(prefix),
            None => Rule::Exact(from),
        }
    }

    /// An exact `""` rule matches empty cells; a prefix rule never does
    fn matches(&self, cell: &Scalar) -> bool {
        match self {
            Rule::Exact(needle) => cell.as_display() == *needle,
            Rule::Prefix(needle) => !cell.is_empty() && cell.as_display().starts_with(needle),
        }
    }
}

/// Counts from one pass of [`map_values`]
#[derive(Debug, Default)]
pub(crate) struct MappingPass {
    pub changed: usize,
    /// Columns that resolved and were mapped
    pub resolved: usize,
    /// Columns that resolved to a protected field and were left alone
    pub protected: Vec<String>,
}

/// Replace matching cells in the mapped columns.
///
/// Columns resolve by raw key first, then by display name; unresolved columns
/// are skipped, and so are columns listed in `protected`. Rules run in order,
/// so a later rule sees the output of an earlier one.
pub fn apply_value_mapping(
    store: &mut TabularStore,
    view: &ViewState,
    mapping: &ValueMapping,
    protected: &[String],
) -> TransformOutcome {
    let Some(current) = store.dataset() else {
        return TransformOutcome::skipped(NO_DATASET);
    };

    let mut working = current.clone();
    let pass = map_values(&mut working, view, mapping, protected);

    if pass.resolved == 0 {
        if !pass.protected.is_empty() {
            return TransformOutcome::skipped(format!("Protected columns left unchanged: {}.", pass.protected.join(", ")));
        }
        return TransformOutcome::skipped("None of the mapped columns exist in this dataset.");
    }
    if pass.changed == 0 {
        return TransformOutcome::skipped("No cells matched the mapping rules.");
    }

    store.commit(working);
    info!(changed = pass.changed, columns = pass.resolved, "Applied value mapping");

    let mut message = format!("Updated {} cells.", pass.changed);
    if !pass.protected.is_empty() {
        message.push_str(&format!(" Protected columns left unchanged: {}.", pass.protected.join(", ")));
    }
    TransformOutcome::changed(pass.changed, message)
}

/// Apply `mapping` in place, never touching a `protected` field
pub(crate) fn map_values(dataset: &mut Dataset, view: &ViewState, mapping: &ValueMapping, protected: &[String]) -> MappingPass {
    let mut pass = MappingPass::default();

    for (column, rules) in mapping {
        let Some(field) = view.resolve_field(dataset, column) else {
            continue;
        };
        if protected.contains(&field) {
            warn!(column = %field, "Skipping value mapping on protected column");
            if !pass.protected.contains(&field) {
                pass.protected.push(field);
            }
            continue;
        }
        pass.resolved += 1;

        for (from, to) in rules {
            let rule = Rule::parse(from);
            let replacement = Scalar::from_text(to.as_str());
            for row in dataset.rows_mut() {
                let Some(cell) = row.get_mut(&field) else {
                    continue;
                };
                if rule.matches(cell) && *cell != replacement {
                    *cell = replacement.clone();
                    pass.changed += 1;
                }
            }
        }
    }

    pass
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use wb_core::{AnnotationStore, MemoryStore, WorkbenchSettings};
    use wb_data::RawTable;

    fn store(values: &[&str]) -> TabularStore {
        let mut store = TabularStore::new();
        let raw = RawTable {
            fields: vec!["colX".into(), "other".into()],
            rows: values
                .iter()
                .map(|v| vec![Scalar::from_text(*v), Scalar::from("A")])
                .collect(),
        };
        let annotations = AnnotationStore::open(Arc::new(MemoryStore::new()));
        store.ingest(raw, "t.csv", &annotations, &WorkbenchSettings::default());
        store
    }

    fn mapping(column: &str, rules: &[(&str, &str)]) -> ValueMapping {
        let mut mapping = ValueMapping::new();
        mapping.insert(
            column.to_string(),
            rules.iter().map(|(f, t)| (f.to_string(), t.to_string())).collect(),
        );
        mapping
    }

    fn column(store: &TabularStore, field: &str) -> Vec<String> {
        let ds = store.dataset().unwrap();
        (0..ds.row_count()).map(|r| ds.value(r, field).as_display()).collect()
    }

    #[test]
    fn test_exact_mapping_touches_only_matches() {
        let mut store = store(&["A", "AB", "a", "", "A"]);
        let view = ViewState::for_fields(store.dataset().unwrap().fields());

        let outcome = apply_value_mapping(&mut store, &view, &mapping("colX", &[("A", "B")]), &[]);
        assert_eq!(outcome.changed, 2);
        assert_eq!(column(&store, "colX"), vec!["B", "AB", "a", "", "B"]);
        assert_eq!(column(&store, "other"), vec!["A"; 5]);
    }

    #[test]
    fn test_prefix_mapping() {
        let mut store = store(&["ABC123", "XAB", "AB", "ab1"]);
        let view = ViewState::for_fields(store.dataset().unwrap().fields());

        let outcome = apply_value_mapping(&mut store, &view, &mapping("colX", &[("AB*", "Z")]), &[]);
        assert_eq!(outcome.changed, 2);
        assert_eq!(column(&store, "colX"), vec!["Z", "XAB", "Z", "ab1"]);
    }

    #[test]
    fn test_display_name_resolution() {
        let mut store = store(&["2101 Centerstone of Indiana - North"]);
        let mut view = ViewState::for_fields(store.dataset().unwrap().fields());
        view.rename("colX", "SBU");

        let outcome = apply_value_mapping(
            &mut store,
            &view,
            &mapping("SBU", &[("2101 Centerstone of Indiana*", "Indiana")]),
            &[],
        );
        assert_eq!(outcome.changed, 1);
        assert_eq!(column(&store, "colX"), vec!["Indiana"]);
    }

    #[test]
    fn test_unresolved_column_is_a_no_op() {
        let mut store = store(&["A"]);
        let view = ViewState::for_fields(store.dataset().unwrap().fields());
        let outcome = apply_value_mapping(&mut store, &view, &mapping("missing", &[("A", "B")]), &[]);
        assert!(!outcome.is_change());
        assert!(!store.has_undo());

        let mut empty = TabularStore::new();
        let outcome = apply_value_mapping(&mut empty, &view, &mapping("colX", &[("A", "B")]), &[]);
        assert_eq!(outcome.message, NO_DATASET);
    }

    #[test]
    fn test_mapping_is_undoable() {
        let mut store = store(&["A", "C"]);
        let before = store.dataset().unwrap().clone();
        let view = ViewState::for_fields(before.fields());

        apply_value_mapping(&mut store, &view, &mapping("colX", &[("A", "B")]), &[]);
        assert!(store.restore_undo());
        assert_eq!(store.dataset().unwrap(), &before);
    }

    #[test]
    fn test_protected_columns_are_never_mapped() {
        let mut store = store(&["ann@x.com", "bob@x.com"]);
        let mut view = ViewState::for_fields(store.dataset().unwrap().fields());
        view.rename("colX", "Email");
        let protected = vec!["colX".to_string()];

        let outcome = apply_value_mapping(
            &mut store,
            &view,
            &mapping("Email", &[("ann@x.com", "REDACTED")]),
            &protected,
        );
        assert!(!outcome.is_change());
        assert!(outcome.message.contains("colX"));
        assert!(!store.has_undo());
        assert_eq!(column(&store, "colX"), vec!["ann@x.com", "bob@x.com"]);

        let mut both = mapping("colX", &[("ann@x.com", "REDACTED")]);
        both.insert("other".into(), [("A".to_string(), "Z".to_string())].into_iter().collect());
        let outcome = apply_value_mapping(&mut store, &view, &both, &protected);
        assert_eq!(outcome.changed, 2);
        assert_eq!(column(&store, "colX"), vec!["ann@x.com", "bob@x.com"]);
        assert_eq!(column(&store, "other"), vec!["Z", "Z"]);
    }

    #[test]
    fn test_explicit_empty_rule_fills_empty_cells() {
        let mut store = store(&["A", "", "  "]);
        let view = ViewState::for_fields(store.dataset().unwrap().fields());

        let outcome = apply_value_mapping(&mut store, &view, &mapping("colX", &[("", "none")]), &[]);
        assert_eq!(outcome.changed, 1);
        assert_eq!(column(&store, "colX"), vec!["A", "none", "  "]);

        let outcome = apply_value_mapping(&mut store, &view, &mapping("colX", &[("*", "all")]), &[]);
        assert_eq!(outcome.changed, 3);
    }
}
