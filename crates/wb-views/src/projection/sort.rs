use serde::{Deserialize, Serialize};

use wb_core::{scalar_cmp, Dataset};

/// Sort direction for the active column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// Active sort; `field == None` keeps dataset order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub field: Option<String>,
    pub direction: SortDirection,
}

impl SortState {
    pub fn by(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: Some(field.into()),
            direction,
        }
    }

    /// Header click: same column flips the direction, a new column starts ascending
    pub fn toggle(&mut self, field: &str) {
        if self.field.as_deref() == Some(field) {
            self.direction = self.direction.flipped();
        } else {
            self.field = Some(field.to_string());
            self.direction = SortDirection::Ascending;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_active(&self) -> bool {
        self.field.is_some()
    }
}

/// Row indices of `dataset` in sort order.
///
/// The sort is stable in both directions: rows that compare equal keep their
/// dataset order. A sort field missing from the dataset leaves the order
/// untouched.
pub fn sorted_rows(dataset: &Dataset, sort: &SortState) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..dataset.row_count()).collect();

    let Some(field) = sort.field.as_deref().filter(|f| dataset.has_field(f)) else {
        return indices;
    };

    indices.sort_by(|&a, &b| {
        let ordering = scalar_cmp(dataset.value(a, field), dataset.value(b, field));
        match sort.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    });

    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use wb_core::Scalar;

    fn dataset(values: &[&str]) -> Dataset {
        Dataset::from_records(
            vec!["v".into(), "id".into()],
            values
                .iter()
                .enumerate()
                .map(|(i, v)| vec![Scalar::from_text(*v), Scalar::from(i as i64)])
                .collect(),
        )
    }

    #[test]
    fn test_natural_ascending() {
        let ds = dataset(&["item10", "item2", "Item1"]);
        let order = sorted_rows(&ds, &SortState::by("v", SortDirection::Ascending));
        assert_eq!(order, vec![2, 1, 0]);
    }

    #[test]
    fn test_descending_keeps_ties_in_dataset_order() {
        let ds = dataset(&["b", "a", "b", "a"]);
        let order = sorted_rows(&ds, &SortState::by("v", SortDirection::Descending));
        assert_eq!(order, vec![0, 2, 1, 3]);

        let order = sorted_rows(&ds, &SortState::by("v", SortDirection::Ascending));
        assert_eq!(order, vec![1, 3, 0, 2]);
    }

    #[test]
    fn test_unknown_field_is_identity() {
        let ds = dataset(&["b", "a"]);
        assert_eq!(sorted_rows(&ds, &SortState::by("zzz", SortDirection::Ascending)), vec![0, 1]);
        assert_eq!(sorted_rows(&ds, &SortState::default()), vec![0, 1]);
    }

    #[test]
    fn test_toggle() {
        let mut sort = SortState::default();
        sort.toggle("v");
        assert_eq!(sort, SortState::by("v", SortDirection::Ascending));
        sort.toggle("v");
        assert_eq!(sort.direction, SortDirection::Descending);
        sort.toggle("id");
        assert_eq!(sort, SortState::by("id", SortDirection::Ascending));
        sort.reset();
        assert!(!sort.is_active());
    }
}
