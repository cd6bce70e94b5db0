use crate::model::Preset;

/// Minimum score for a preset to be suggested
pub const SUGGESTION_THRESHOLD: f64 = 0.5;

/// Scores how well a preset fits a dataset
pub trait PresetMatcher: Send + Sync {
    /// Calculate how well the preset matches the given fields (0.0 to 1.0)
    fn match_score(&self, fields: &[String]) -> f64;
}

/// Share of the preset's keep list present in the dataset
#[derive(Debug, Clone, Copy)]
pub struct KeepFieldsMatcher<'a> {
    preset: &'a Preset,
}

impl<'a> KeepFieldsMatcher<'a> {
    pub fn new(preset: &'a Preset) -> Self {
        Self { preset }
    }
}

impl PresetMatcher for KeepFieldsMatcher<'_> {
    fn match_score(&self, fields: &[String]) -> f64 {
        let keep = &self.preset.keep_fields;
        if keep.is_empty() {
            return 0.0;
        }
        let present = keep.iter().filter(|k| fields.contains(k)).count();
        present as f64 / keep.len() as f64
    }
}

/// Score a preset against a field list
pub fn match_score(preset: &Preset, fields: &[String]) -> f64 {
    KeepFieldsMatcher::new(preset).match_score(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_score() {
        let preset = Preset::new("p", "P").keep(["a", "b", "c", "d"]);
        assert_eq!(match_score(&preset, &fields(&["a", "b", "x"])), 0.5);
        assert_eq!(match_score(&preset, &fields(&["a", "b", "c", "d"])), 1.0);
        assert_eq!(match_score(&Preset::new("e", "E"), &fields(&["a"])), 0.0);
    }
}
