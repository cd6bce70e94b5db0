use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use wb_data::TabularStore;
use wb_views::ViewState;

use crate::{TransformOutcome, NO_DATASET};

/// Which occurrence of a duplicated key survives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeepPolicy {
    #[default]
    First,
    Last,
}

/// Drop rows whose key column repeats an earlier (or later) row.
///
/// Keys compare by their display string. Retained rows keep their relative
/// order.
pub fn deduplicate(store: &mut TabularStore, view: &ViewState, key_column: &str, policy: KeepPolicy) -> TransformOutcome {
    let Some(current) = store.dataset() else {
        return TransformOutcome::skipped(NO_DATASET);
    };
    let Some(field) = view.resolve_field(current, key_column) else {
        return TransformOutcome::skipped(format!("Column \"{}\" does not exist.", key_column));
    };

    let keys: Vec<String> = (0..current.row_count())
        .map(|row| current.value(row, &field).as_display())
        .collect();

    // Index of the surviving row for each key
    let mut survivor: AHashMap<&str, usize> = AHashMap::new();
    for (index, key) in keys.iter().enumerate() {
        match policy {
            KeepPolicy::First => {
                survivor.entry(key.as_str()).or_insert(index);
            }
            KeepPolicy::Last => {
                survivor.insert(key.as_str(), index);
            }
        }
    }

    let removed = keys.len() - survivor.len();
    if removed == 0 {
        return TransformOutcome::skipped("No duplicate rows found.");
    }

    let rows = current
        .rows()
        .iter()
        .zip(&keys)
        .enumerate()
        .filter(|(index, (_, key))| survivor.get(key.as_str()) == Some(index))
        .map(|(_, (row, _))| row.clone())
        .collect();

    let mut working = current.clone();
    working.replace_rows(rows);
    store.commit(working);

    info!(field = %field, removed, ?policy, "Removed duplicate rows");
    TransformOutcome::changed(
        removed,
        format!("Removed {} duplicate rows by \"{}\".", removed, view.display_name(&field)),
    )
}
