//! Cell values
//!
//! Every cell in a dataset is a [`Scalar`]. Text and numbers keep their type
//! for comparison, but everything renders back to a plain string for display
//! and export.

use std::cmp::Ordering;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A row maps field keys to values. Key order is not meaningful, the
/// dataset's field list defines display order.
pub type Row = IndexMap<String, Scalar>;

/// A single cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Scalar {
    /// Missing, null or empty-string value
    #[default]
    Empty,
    /// Numeric value (spreadsheet numeric cells)
    Number(f64),
    /// Text value, never empty
    Text(String),
}

impl Scalar {
    /// Build a scalar from text; the empty string becomes [`Scalar::Empty`]
    pub fn from_text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() {
            Scalar::Empty
        } else {
            Scalar::Text(value)
        }
    }

    /// Build a numeric scalar
    pub fn from_number(value: f64) -> Self {
        Scalar::Number(value)
    }

    /// True for [`Scalar::Empty`]
    pub fn is_empty(&self) -> bool {
        matches!(self, Scalar::Empty)
    }

    /// True for empty values and whitespace-only text
    pub fn is_blank(&self) -> bool {
        match self {
            Scalar::Empty => true,
            Scalar::Text(s) => s.trim().is_empty(),
            Scalar::Number(_) => false,
        }
    }

    /// The display/export string for this value
    pub fn as_display(&self) -> String {
        match self {
            Scalar::Empty => String::new(),
            Scalar::Text(s) => s.clone(),
            Scalar::Number(n) => format_number(*n),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Empty => Ok(()),
            Scalar::Text(s) => f.write_str(s),
            Scalar::Number(n) => f.write_str(&format_number(*n)),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::from_text(value)
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::from_text(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Number(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Number(value as f64)
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Numeric-aware, case-insensitive string comparison.
///
/// Runs of ASCII digits compare by numeric value ("item2" < "item10"), other
/// characters compare case-insensitively. Equal strings under that rule fall
/// back to a plain comparison so the ordering stays total.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => break,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let l_run = take_digits(&mut left);
                let r_run = take_digits(&mut right);
                let ordering = compare_digit_runs(&l_run, &r_run);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            (Some(l), Some(r)) => {
                let ordering = l.to_lowercase().cmp(r.to_lowercase());
                if ordering != Ordering::Equal {
                    return ordering;
                }
                left.next();
                right.next();
            }
        }
    }

    a.cmp(b)
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.peek().copied() {
        if !c.is_ascii_digit() {
            break;
        }
        run.push(c);
        chars.next();
    }
    run
}

fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a_trimmed = a.trim_start_matches('0');
    let b_trimmed = b.trim_start_matches('0');
    a_trimmed
        .len()
        .cmp(&b_trimmed.len())
        .then_with(|| a_trimmed.cmp(b_trimmed))
}

/// Numeric value used for sorting: numbers and text that parses as a finite
/// number
fn sort_number(value: &Scalar) -> Option<f64> {
    match value {
        Scalar::Number(n) => Some(*n),
        Scalar::Text(s) => s.trim().parse::<f64>().ok(),
        Scalar::Empty => None,
    }
    .filter(|n| n.is_finite())
}

/// Total order for sorting a column.
///
/// Empty cells come first, then numeric values (numbers or numeric text) by
/// value, then the remaining text with [`natural_cmp`].
pub fn scalar_cmp(a: &Scalar, b: &Scalar) -> Ordering {
    match (a, b) {
        (Scalar::Empty, Scalar::Empty) => Ordering::Equal,
        (Scalar::Empty, _) => Ordering::Less,
        (_, Scalar::Empty) => Ordering::Greater,
        _ => match (sort_number(a), sort_number(b)) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => natural_cmp(&a.as_display(), &b.as_display()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_normalizes() {
        assert_eq!(Scalar::from_text(""), Scalar::Empty);
        assert_eq!(Scalar::from("abc"), Scalar::Text("abc".to_string()));
        assert!(Scalar::from_text("   ").is_blank());
        assert!(!Scalar::from_text("   ").is_empty());
    }

    #[test]
    fn test_number_display() {
        assert_eq!(Scalar::from_number(42.0).as_display(), "42");
        assert_eq!(Scalar::from_number(-3.5).as_display(), "-3.5");
        assert_eq!(Scalar::Empty.as_display(), "");
    }

    #[test]
    fn test_natural_cmp() {
        assert_eq!(natural_cmp("item2", "item10"), Ordering::Less);
        assert_eq!(natural_cmp("Alpha", "beta"), Ordering::Less);
        assert_eq!(natural_cmp("abc", "ABC"), Ordering::Greater);
        assert_eq!(natural_cmp("007", "7"), Ordering::Less);
        assert_eq!(natural_cmp("", "a"), Ordering::Less);
    }

    #[test]
    fn test_scalar_cmp_numbers() {
        assert_eq!(scalar_cmp(&Scalar::from(9.0), &Scalar::from(10.0)), Ordering::Less);
        assert_eq!(scalar_cmp(&Scalar::Empty, &Scalar::from("a")), Ordering::Less);
    }

    #[test]
    fn test_scalar_cmp_mixed_column_is_consistent() {
        let values = [
            Scalar::from(-10.0),
            Scalar::from(-5.0),
            Scalar::from("-7"),
            Scalar::from("-6x"),
            Scalar::from(" 2.5 "),
            Scalar::from("item2"),
            Scalar::Empty,
        ];
        let mut sorted = values.to_vec();
        sorted.sort_by(scalar_cmp);
        let shown: Vec<String> = sorted.iter().map(Scalar::as_display).collect();
        assert_eq!(shown, vec!["", "-10", "-7", "-5", " 2.5 ", "-6x", "item2"]);

        for a in &values {
            for b in &values {
                for c in &values {
                    if scalar_cmp(a, b) != Ordering::Greater && scalar_cmp(b, c) != Ordering::Greater {
                        assert_ne!(scalar_cmp(a, c), Ordering::Greater, "{:?} {:?} {:?}", a, b, c);
                    }
                }
            }
        }
    }
}
