//! Built-in presets. These are immutable and always listed first.

use once_cell::sync::Lazy;

use crate::model::{DerivationRule, Preset};

/// Id of the PhishER fail export preset
pub const PHISHER_LIKE_ID: &str = "phisherLike";

static BUILTIN_PRESETS: Lazy<Vec<Preset>> = Lazy::new(|| vec![phisher_like()]);

/// Every built-in preset
pub fn builtin_presets() -> &'static [Preset] {
    &BUILTIN_PRESETS
}

/// Look up a built-in preset by id
pub fn builtin(id: &str) -> Option<&'static Preset> {
    BUILTIN_PRESETS.iter().find(|p| p.id == id)
}

fn phisher_like() -> Preset {
    let region = DerivationRule {
        target_field: "Custom Field 1".into(),
        alternate_targets: vec!["SBU".into()],
        source_field: Some("Location".into()),
        prefix_table: [
            ("IN", "Indiana"),
            ("TN", "Tennessee"),
            ("IL", "Illinois"),
            ("FL", "Florida"),
            ("KY", "Kentucky"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect(),
        fallback: Some("blank".into()),
    };

    Preset::new(PHISHER_LIKE_ID, "PhishER Fail Export")
        .with_description("Show core identity + campaign fields and normalize SBU values.")
        .keep([
            "Email",
            "First Name",
            "Last Name",
            "Job Title",
            "Group",
            "Manager Name",
            "Manager Email",
            "Location",
            "Employee Number",
            "Content",
            "Department",
            "Custom Field 1",
        ])
        .rename("Employee Number", "EmployeeID")
        .rename("Custom Field 1", "SBU")
        .map_value("Custom Field 1", "2101 Centerstone of Indiana*", "Indiana")
        .derive(region)
}
