//! Loader for merged chemcalc JSON exports.
//!
//! ```json
//! {
//!   "formulas": [
//!     {
//!       "mf": "C18H35O2",
//!       "em": 283.2637,
//!       "nominalMass": 283,
//!       "xy": "283.2637, 100\r\n284.2670, 19.8",
//!       "_metadata": { "compound_name": "Oleic acid", "compound_class": "standard" }
//!     }
//!   ]
//! }
//! ```
//!
//! Each entry becomes one [`ReferencePattern`]. Entries whose peak list cannot be
//! parsed, or whose pattern fails [`ReferencePattern::check`], are recorded as
//! unavailable in the returned store; only an unreadable file is an error.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use log::{debug, info, warn};
use serde::Deserialize;

use super::{ClassRules, CompoundClass, ReferenceError, ReferencePattern, ReferencePeak, ReferenceStore};

#[derive(Debug, Deserialize)]
struct ChemcalcFile {
    #[serde(default)]
    formulas: Vec<ChemcalcEntry>,
}

#[derive(Debug, Deserialize)]
struct ChemcalcEntry {
    mf: Option<String>,
    em: Option<f64>,
    #[serde(rename = "nominalMass")]
    nominal_mass: Option<f64>,
    #[serde(default)]
    xy: String,
    #[serde(rename = "_metadata", default)]
    metadata: Option<ChemcalcMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct ChemcalcMetadata {
    compound_name: Option<String>,
    compound_class: Option<String>,
}

/// Load a chemcalc JSON file
pub fn load_chemcalc<P: AsRef<Path>>(path: P, rules: &ClassRules) -> Result<ReferenceStore, ReferenceError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    info!("Loading reference data from {}", path.display());
    from_reader(BufReader::new(file), rules)
}

/// Load chemcalc JSON from any reader
pub fn from_reader<R: Read>(reader: R, rules: &ClassRules) -> Result<ReferenceStore, ReferenceError> {
    let file: ChemcalcFile = serde_json::from_reader(reader)?;
    let mut store = ReferenceStore::new();

    for entry in file.formulas {
        let Some(formula) = entry.mf.filter(|f| !f.trim().is_empty()) else {
            warn!("Skipping reference entry without a formula");
            continue;
        };

        let metadata = entry.metadata.unwrap_or_default();
        let name = metadata.compound_name.unwrap_or_else(|| formula.clone());

        let peaks = match parse_xy(&formula, &entry.xy) {
            Ok(peaks) => peaks,
            Err(e) => {
                warn!("Skipping reference pattern {}: {}", formula, e);
                store.mark_unavailable(formula, e.to_string());
                continue;
            }
        };

        let class = resolve_class(&formula, &name, metadata.compound_class.as_deref(), rules);
        let mut pattern = ReferencePattern::new(formula, name, entry.em.unwrap_or(0.0), peaks)
            .with_class(class);
        pattern.nominal_mass = entry.nominal_mass;

        debug!(
            "Loaded {}: {} (m/z {:.4}, {} peaks, class {})",
            pattern.formula,
            pattern.name,
            pattern.target_mz,
            pattern.peaks.len(),
            pattern.class
        );
        store.insert_or_skip(pattern);
    }

    info!(
        "Loaded {} reference patterns ({} unavailable)",
        store.len(),
        store.unavailable().count()
    );
    Ok(store)
}

/// Explicit tag first, classification rules otherwise
fn resolve_class(formula: &str, name: &str, tag: Option<&str>, rules: &ClassRules) -> CompoundClass {
    match tag.map(str::parse::<CompoundClass>) {
        Some(Ok(class)) => class,
        Some(Err(e)) => {
            warn!("{} for {}; falling back to classification rules", e, formula);
            rules.classify(formula, name)
        }
        None => rules.classify(formula, name),
    }
}

/// Parse a chemcalc `xy` block of `mz, intensity` lines.
///
/// Blank lines and lines without exactly two fields are ignored; a field that is
/// not a number is an error for the whole pattern.
pub fn parse_xy(formula: &str, xy: &str) -> Result<Vec<ReferencePeak>, ReferenceError> {
    let mut peaks = Vec::new();

    for (i, line) in xy.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != 2 {
            continue;
        }

        let parse = |field: &str| {
            field.parse::<f64>().map_err(|e| ReferenceError::Parse {
                formula: formula.to_string(),
                line: i + 1,
                message: format!("'{}': {}", field, e),
            })
        };
        peaks.push(ReferencePeak::new(parse(fields[0])?, parse(fields[1])?));
    }

    if peaks.is_empty() {
        return Err(ReferenceError::EmptyPattern(formula.to_string()));
    }
    Ok(peaks)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_JSON: &str = r#"{
        "formulas": [
            {
                "mf": "C18H35O2",
                "em": 283.2637,
                "nominalMass": 283,
                "xy": "283.2637, 100\r\n284.2670, 19.8\r\n285.2704, 2.1",
                "_metadata": { "compound_name": "Oleic acid" }
            },
            {
                "mf": "C24H52PSe",
                "em": 451.2968,
                "xy": "449.2990, 18.0\r\n451.2968, 100\r\n452.3001, 26.4",
                "_metadata": { "compound_name": "TOPSe" }
            },
            {
                "mf": "C8H17",
                "em": 113.1325,
                "xy": "113.1325, 100",
                "_metadata": { "compound_name": "Octyl", "compound_class": "high_intensity" }
            },
            { "mf": "C2H6", "em": 30.04, "xy": "" },
            { "mf": "C3H8", "em": 44.06, "xy": "44.06, abc" },
            { "mf": "CH4", "xy": "16.03, 100" },
            { "em": 12.0, "xy": "12.0, 100" }
        ]
    }"#;

    #[test]
    fn test_load_chemcalc() {
        let store = from_reader(SAMPLE_JSON.as_bytes(), &ClassRules::default()).unwrap();

        assert_eq!(store.len(), 3);
        let oleic = store.get("C18H35O2").unwrap();
        assert_eq!(oleic.name, "Oleic acid");
        assert_eq!(oleic.peaks.len(), 3);
        assert_eq!(oleic.nominal_mass, Some(283.0));
        assert_eq!(oleic.class, CompoundClass::Standard);

        let topse = store.get("C24H52PSe").unwrap();
        assert_eq!(topse.class, CompoundClass::HighIntensity);
        assert_eq!(topse.main_peak().unwrap().mz, 451.2968);

        assert_eq!(store.get("C8H17").unwrap().class, CompoundClass::HighIntensity);
    }

    #[test]
    fn test_malformed_entries_are_unavailable() {
        let store = from_reader(SAMPLE_JSON.as_bytes(), &ClassRules::default()).unwrap();
        let unavailable: Vec<&str> = store.unavailable().map(|(f, _)| f).collect();
        assert_eq!(unavailable, vec!["C2H6", "C3H8", "CH4"]);
    }

    #[test]
    fn test_unknown_class_tag_falls_back() {
        let json = r#"{ "formulas": [ { "mf": "C1", "em": 12.0, "xy": "12.0, 1",
            "_metadata": { "compound_name": "TOP", "compound_class": "weird" } } ] }"#;
        let store = from_reader(json.as_bytes(), &ClassRules::default()).unwrap();
        assert_eq!(store.get("C1").unwrap().class, CompoundClass::HighIntensity);
    }

    #[test]
    fn test_parse_xy_skips_incomplete_lines() {
        let peaks = parse_xy("X", "100.0, 5\n\n101.0\n102.0, 1, 2\n103.0,7").unwrap();
        assert_eq!(peaks, vec![ReferencePeak::new(100.0, 5.0), ReferencePeak::new(103.0, 7.0)]);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(matches!(
            from_reader("not json".as_bytes(), &ClassRules::default()),
            Err(ReferenceError::JsonError(_))
        ));
    }
}
