use serde::Serialize;
use tracing::{info, warn};

use wb_core::Scalar;
use wb_data::TabularStore;
use wb_presets::{Derived, Preset};
use wb_views::{SortState, ViewState};

use crate::mapping::map_values;
use crate::NO_DATASET;

/// What a preset run did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PresetReport {
    pub applied: bool,
    pub visible_fields: usize,
    /// Cells replaced by the value mapping
    pub mapped_cells: usize,
    /// Blank targets filled from a prefix table
    pub derived_cells: usize,
    /// Blank targets filled with a fallback constant
    pub fallback_cells: usize,
    pub message: String,
}

impl PresetReport {
    pub fn changed_cells(&self) -> usize {
        self.mapped_cells + self.derived_cells + self.fallback_cells
    }
}

/// Run a preset as four ordered stages.
///
/// 1. Visible fields become the preset's keep list (preset order) limited to
///    fields that exist.
/// 2. Renames are applied to display names.
/// 3. The value mapping runs.
/// 4. Each derivation rule fills targets that are still blank: prefix table
///    first, then the fallback constant.
///
/// Mapped values are never overwritten by a derivation, and derived values
/// always win over the fallback. Neither stage writes to a `protected` field.
/// Afterwards the preset is active and the sort is reset.
pub fn apply_preset(
    store: &mut TabularStore,
    view: &mut ViewState,
    sort: &mut SortState,
    preset: &Preset,
    protected: &[String],
) -> PresetReport {
    let Some(current) = store.dataset() else {
        return PresetReport {
            message: NO_DATASET.to_string(),
            ..Default::default()
        };
    };
    let mut working = current.clone();

    // Stage 1
    view.visible_fields = preset
        .keep_fields
        .iter()
        .filter(|f| working.has_field(f))
        .cloned()
        .collect();
    for field in working.fields() {
        if !view.display_names.contains_key(field) {
            view.display_names.insert(field.clone(), field.clone());
        }
    }

    // Stage 2
    for (from, to) in &preset.rename_fields {
        if working.has_field(from) {
            view.rename(from, to);
        }
    }

    // Stage 3
    let mapped = map_values(&mut working, view, &preset.value_mapping, protected);
    let mapped_cells = mapped.changed;

    // Stage 4
    let mut derived_cells = 0;
    let mut fallback_cells = 0;
    for rule in &preset.derivation {
        let Some(target) = rule.targets().find_map(|t| view.resolve_field(&working, t)) else {
            continue;
        };
        if protected.contains(&target) {
            warn!(column = %target, "Skipping derivation into protected column");
            continue;
        }
        let source = rule
            .source_field
            .as_deref()
            .and_then(|s| view.resolve_field(&working, s));

        for row in working.rows_mut() {
            if !row.get(&target).map(Scalar::is_blank).unwrap_or(true) {
                continue;
            }
            let source_value = source
                .as_ref()
                .and_then(|s| row.get(s))
                .map(Scalar::as_display);

            let Some(derived) = rule.derive(source_value.as_deref()) else {
                continue;
            };
            match derived {
                Derived::Prefix(_) => derived_cells += 1,
                Derived::Fallback(_) => fallback_cells += 1,
            }
            row.insert(target.clone(), Scalar::from_text(derived.value()));
        }
    }

    view.active_preset = Some(preset.id.clone());
    sort.reset();

    let report = PresetReport {
        applied: true,
        visible_fields: view.visible_fields.len(),
        mapped_cells,
        derived_cells,
        fallback_cells,
        message: format!(
            "Applied preset \"{}\": {} columns, {} mapped, {} derived, {} fallback.",
            preset.label,
            view.visible_fields.len(),
            mapped_cells,
            derived_cells,
            fallback_cells
        ),
    };

    if report.changed_cells() > 0 {
        store.commit(working);
    }

    info!(
        preset = %preset.id,
        mapped = mapped_cells,
        derived = derived_cells,
        fallback = fallback_cells,
        "Applied preset"
    );

    report
}
