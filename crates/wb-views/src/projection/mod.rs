//! View projection: which columns are shown, under which labels, and which
//! rows survive the current search, filters and sort. Nothing here mutates
//! the dataset.

pub mod filter;
pub mod sort;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use wb_core::Dataset;

use self::filter::FilterState;
use self::sort::{sorted_rows, SortState};

/// Column visibility, display names and the active preset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewState {
    /// Visible fields in dataset order; empty means every field
    pub visible_fields: Vec<String>,
    /// Field key to rendered label
    pub display_names: IndexMap<String, String>,
    pub active_preset: Option<String>,
}

impl ViewState {
    /// Default view for a freshly ingested field list
    pub fn for_fields(fields: &[String]) -> Self {
        let mut view = Self::default();
        view.reset_for(fields);
        view
    }

    /// Every field visible under its own name, no preset
    pub fn reset_for(&mut self, fields: &[String]) {
        self.visible_fields = fields.to_vec();
        self.display_names = fields.iter().map(|f| (f.clone(), f.clone())).collect();
        self.active_preset = None;
    }

    /// Drop visible fields and display names that no longer exist. Used after
    /// an undo or any other wholesale replacement of the field list.
    pub fn prune(&mut self, fields: &[String]) {
        self.visible_fields.retain(|f| fields.contains(f));
        self.display_names.retain(|f, _| fields.contains(f));
    }

    /// Rendered label for a field, falling back to the key
    pub fn display_name<'a>(&'a self, field: &'a str) -> &'a str {
        self.display_names
            .get(field)
            .map(String::as_str)
            .filter(|label| !label.is_empty())
            .unwrap_or(field)
    }

    /// Show or hide one field, keeping the visible list in dataset order
    pub fn set_visible(&mut self, dataset: &Dataset, field: &str, visible: bool) {
        if !dataset.has_field(field) {
            return;
        }
        let mut wanted: Vec<&str> = self.effective_fields(dataset).iter().map(String::as_str).collect();
        wanted.retain(|f| *f != field);
        if visible {
            wanted.push(field);
        }
        self.visible_fields = dataset
            .fields()
            .iter()
            .filter(|f| wanted.contains(&f.as_str()))
            .cloned()
            .collect();
    }

    /// Set a display name; a blank label resets it to the key
    pub fn rename(&mut self, field: &str, label: &str) {
        let label = label.trim();
        let label = if label.is_empty() { field } else { label };
        self.display_names.insert(field.to_string(), label.to_string());
    }

    /// Apply a batch of column panel edits
    pub fn apply_column_changes(&mut self, dataset: &Dataset, visible: &[String], names: &[(String, String)]) {
        for (field, label) in names {
            self.rename(field, label);
        }
        self.visible_fields = dataset
            .fields()
            .iter()
            .filter(|f| visible.contains(f))
            .cloned()
            .collect();
    }

    /// Resolve a column reference: raw key first, then display name
    pub fn resolve_field(&self, dataset: &Dataset, column: &str) -> Option<String> {
        if dataset.has_field(column) {
            return Some(column.to_string());
        }
        self.display_names
            .iter()
            .find(|(field, label)| label.as_str() == column && dataset.has_field(field))
            .map(|(field, _)| field.clone())
    }

    /// Visible fields, or every field when none are selected
    pub fn effective_fields<'a>(&'a self, dataset: &'a Dataset) -> &'a [String] {
        if self.visible_fields.is_empty() {
            dataset.fields()
        } else {
            &self.visible_fields
        }
    }

    /// Display labels of the effective fields
    pub fn headers(&self, dataset: &Dataset) -> Vec<String> {
        self.effective_fields(dataset)
            .iter()
            .map(|f| self.display_name(f).to_string())
            .collect()
    }
}

/// Sorted row indices that pass `filter`.
///
/// Computed lazily on each call and never cached.
pub fn filtered_sorted_rows<'a>(
    dataset: &'a Dataset,
    view: &'a ViewState,
    sort: &SortState,
    filter: &'a FilterState,
) -> impl Iterator<Item = usize> + 'a {
    let fields = view.effective_fields(dataset);
    let order = sorted_rows(dataset, sort);
    order.into_iter().filter(move |&index| {
        dataset
            .rows()
            .get(index)
            .map(|row| filter.matches(row, fields))
            .unwrap_or(false)
    })
}

/// Rendered table preview
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preview {
    pub headers: Vec<String>,
    pub row_indices: Vec<usize>,
    pub cells: Vec<Vec<String>>,
    /// Rows passing the current filters
    pub total: usize,
    pub caption: String,
}

/// First `limit` rows of the filtered view with a caption
pub fn preview(dataset: &Dataset, view: &ViewState, sort: &SortState, filter: &FilterState, limit: usize) -> Preview {
    let fields = view.effective_fields(dataset);
    let matching: Vec<usize> = filtered_sorted_rows(dataset, view, sort, filter).collect();
    let total = matching.len();

    let row_indices: Vec<usize> = matching.into_iter().take(limit).collect();
    let cells = row_indices
        .iter()
        .map(|&row| fields.iter().map(|f| dataset.value(row, f).as_display()).collect())
        .collect();

    let caption = if total > limit {
        format!("Showing first {} rows of {} total.", limit, total)
    } else {
        format!("Showing all {} rows.", total)
    };

    Preview {
        headers: view.headers(dataset),
        row_indices,
        cells,
        total,
        caption,
    }
}

#[cfg(test)]
mod tests {
    use super::filter::{FilterOperator, RowFilter, SearchScope};
    use super::sort::SortDirection;
    use super::*;
    use wb_core::Scalar;

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn people() -> Dataset {
        Dataset::from_records(
            fields(&["Email", "Dept", "Loc"]),
            vec![
                vec!["c@x.com".into(), "IT".into(), "Denver".into()],
                vec!["a@x.com".into(), "HR".into(), Scalar::Empty],
                vec!["b@x.com".into(), "IT".into(), "Boston".into()],
            ],
        )
    }

    #[test]
    fn test_reset_and_effective_fields() {
        let ds = people();
        let mut view = ViewState::for_fields(ds.fields());
        assert_eq!(view.effective_fields(&ds), ds.fields());
        assert_eq!(view.display_name("Dept"), "Dept");

        view.visible_fields.clear();
        assert_eq!(view.effective_fields(&ds), ds.fields());
    }

    #[test]
    fn test_column_changes_keep_dataset_order() {
        let ds = people();
        let mut view = ViewState::for_fields(ds.fields());
        view.apply_column_changes(
            &ds,
            &fields(&["Loc", "Email"]),
            &[("Loc".into(), " Office ".into()), ("Email".into(), "".into())],
        );
        assert_eq!(view.visible_fields, fields(&["Email", "Loc"]));
        assert_eq!(view.headers(&ds), vec!["Email", "Office"]);

        view.set_visible(&ds, "Dept", true);
        assert_eq!(view.visible_fields, fields(&["Email", "Dept", "Loc"]));
        view.set_visible(&ds, "Email", false);
        assert_eq!(view.visible_fields, fields(&["Dept", "Loc"]));
        view.set_visible(&ds, "Nope", true);
        assert_eq!(view.visible_fields, fields(&["Dept", "Loc"]));
    }

    #[test]
    fn test_prune_drops_stale_fields() {
        let mut view = ViewState::for_fields(&fields(&["a", "b", "joined"]));
        view.rename("joined", "Joined");
        view.prune(&fields(&["a", "b"]));
        assert_eq!(view.visible_fields, fields(&["a", "b"]));
        assert!(!view.display_names.contains_key("joined"));
    }

    #[test]
    fn test_resolve_field() {
        let ds = people();
        let mut view = ViewState::for_fields(ds.fields());
        view.rename("Loc", "Office");
        assert_eq!(view.resolve_field(&ds, "Loc").as_deref(), Some("Loc"));
        assert_eq!(view.resolve_field(&ds, "Office").as_deref(), Some("Loc"));
        assert_eq!(view.resolve_field(&ds, "Nowhere"), None);
    }

    #[test]
    fn test_filtered_sorted_rows() {
        let ds = people();
        let view = ViewState::for_fields(ds.fields());
        let sort = SortState::by("Email", SortDirection::Ascending);
        let mut filter = FilterState::default();

        let all: Vec<usize> = filtered_sorted_rows(&ds, &view, &sort, &filter).collect();
        assert_eq!(all, vec![1, 2, 0]);

        filter.row_filters.push(RowFilter::new("Dept", FilterOperator::Equals, "it"));
        let it: Vec<usize> = filtered_sorted_rows(&ds, &view, &sort, &filter).collect();
        assert_eq!(it, vec![2, 0]);

        filter.search_text = "denver".into();
        filter.scope = SearchScope::Field("Loc".into());
        let denver: Vec<usize> = filtered_sorted_rows(&ds, &view, &sort, &filter).collect();
        assert_eq!(denver, vec![0]);
    }

    #[test]
    fn test_search_ignores_hidden_columns() {
        let ds = people();
        let mut view = ViewState::for_fields(ds.fields());
        view.set_visible(&ds, "Loc", false);
        let filter = FilterState {
            search_text: "boston".into(),
            ..Default::default()
        };
        assert_eq!(filtered_sorted_rows(&ds, &view, &SortState::default(), &filter).count(), 0);
    }

    #[test]
    fn test_preview_caption() {
        let ds = people();
        let view = ViewState::for_fields(ds.fields());
        let filter = FilterState::default();

        let short = preview(&ds, &view, &SortState::default(), &filter, 2);
        assert_eq!(short.caption, "Showing first 2 rows of 3 total.");
        assert_eq!(short.cells.len(), 2);
        assert_eq!(short.cells[1], vec!["a@x.com", "HR", ""]);

        let full = preview(&ds, &view, &SortState::default(), &filter, 100);
        assert_eq!(full.caption, "Showing all 3 rows.");
        assert_eq!(full.row_indices, vec![0, 1, 2]);
    }
}
