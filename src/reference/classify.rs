use serde::{Deserialize, Serialize};

use super::CompoundClass;

/// Load-time rules that assign a [`CompoundClass`] to patterns without an explicit tag
///
/// A compound is `HighIntensity` when its formula is listed in
/// `high_intensity_formulas` or its display name contains one of
/// `high_intensity_names`; everything else is `Standard`. Matching is
/// case-sensitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassRules {
    /// Formulas that are always high-intensity
    pub high_intensity_formulas: Vec<String>,
    /// Name fragments marking high-intensity compounds
    pub high_intensity_names: Vec<String>,
}

impl Default for ClassRules {
    fn default() -> Self {
        // Trioctylphosphine and its oxide/selenide ligands
        Self {
            high_intensity_formulas: vec!["C24H52PSe".to_string()],
            high_intensity_names: vec!["TOP".to_string()],
        }
    }
}

impl ClassRules {
    /// Rules that classify everything as `Standard`
    pub fn none() -> Self {
        Self {
            high_intensity_formulas: Vec::new(),
            high_intensity_names: Vec::new(),
        }
    }

    /// Classify a compound by formula and display name
    pub fn classify(&self, formula: &str, name: &str) -> CompoundClass {
        let formula_hit = self.high_intensity_formulas.iter().any(|f| f == formula);
        let name_hit = self
            .high_intensity_names
            .iter()
            .any(|marker| !marker.is_empty() && name.contains(marker.as_str()));

        if formula_hit || name_hit {
            CompoundClass::HighIntensity
        } else {
            CompoundClass::Standard
        }
    }
}
