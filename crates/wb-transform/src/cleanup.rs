use serde::{Deserialize, Serialize};
use tracing::info;

use wb_core::Scalar;
use wb_data::TabularStore;
use wb_views::ViewState;

use crate::{TransformOutcome, NO_DATASET};

/// String transform applied by [`cleanup_column`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CleanupOp {
    Trim,
    Uppercase,
    Lowercase,
    Titlecase,
    StripControlChars,
    ToNumericString,
}

impl CleanupOp {
    pub fn apply(&self, value: &str) -> String {
        match self {
            CleanupOp::Trim => value.trim().to_string(),
            CleanupOp::Uppercase => value.to_uppercase(),
            CleanupOp::Lowercase => value.to_lowercase(),
            CleanupOp::Titlecase => titlecase(value),
            CleanupOp::StripControlChars => value.chars().filter(|c| !c.is_control()).collect(),
            CleanupOp::ToNumericString => numeric_string(value).unwrap_or_else(|| value.to_string()),
        }
    }
}

/// Columns a cleanup runs over
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupTarget {
    /// One column, by key or display name
    Column(String),
    /// Every effective field except protected ones
    AllVisible,
}

/// Apply `op` to every non-empty cell in scope.
///
/// Protected columns are skipped even when named explicitly. Only cells
/// whose text actually changes are counted.
pub fn cleanup_column(
    store: &mut TabularStore,
    view: &ViewState,
    target: &CleanupTarget,
    op: CleanupOp,
    protected: &[String],
) -> TransformOutcome {
    let Some(current) = store.dataset() else {
        return TransformOutcome::skipped(NO_DATASET);
    };

    let columns: Vec<String> = match target {
        CleanupTarget::Column(column) => match view.resolve_field(current, column) {
            Some(field) if protected.contains(&field) => {
                return TransformOutcome::skipped(format!("Column \"{}\" is protected.", column));
            }
            Some(field) => vec![field],
            None => return TransformOutcome::skipped(format!("Column \"{}\" does not exist.", column)),
        },
        CleanupTarget::AllVisible => view
            .effective_fields(current)
            .iter()
            .filter(|f| !protected.contains(f))
            .cloned()
            .collect(),
    };

    let mut working = current.clone();
    let mut changed = 0;
    for row in working.rows_mut() {
        for field in &columns {
            let Some(cell) = row.get_mut(field) else {
                continue;
            };
            if cell.is_empty() {
                continue;
            }
            let before = cell.as_display();
            let after = op.apply(&before);
            if after != before {
                *cell = Scalar::from_text(after);
                changed += 1;
            }
        }
    }

    if changed == 0 {
        return TransformOutcome::skipped("Cleanup made no changes.");
    }

    store.commit(working);
    info!(?op, columns = columns.len(), changed, "Cleaned up cells");
    TransformOutcome::changed(changed, format!("Cleaned {} cells.", changed))
}

fn titlecase(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut at_word_start = true;
    for c in value.chars() {
        if c.is_whitespace() {
            at_word_start = true;
            out.push(c);
        } else if at_word_start {
            out.extend(c.to_uppercase());
            at_word_start = false;
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out
}

/// Digits with an optional leading minus and one decimal point, e.g.
/// `"$1,234.50"` becomes `"1234.50"`. `None` when there are no digits.
fn numeric_string(value: &str) -> Option<String> {
    let trimmed = value.trim();
    let negative = trimmed.starts_with('-') || (trimmed.starts_with('(') && trimmed.ends_with(')'));

    let mut out = String::new();
    let mut seen_point = false;
    for c in trimmed.chars() {
        if c.is_ascii_digit() {
            out.push(c);
        } else if c == '.' && !seen_point {
            seen_point = true;
            out.push(c);
        }
    }

    if !out.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    if out.starts_with('.') {
        out.insert(0, '0');
    }
    if out.ends_with('.') {
        out.pop();
    }
    if negative {
        out.insert(0, '-');
    }
    Some(out)
}
