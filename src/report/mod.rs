//! Flattening of per-sample results into report rows, and their writers.
//!
//! [`aggregate`] turns the `sample -> SampleResult` map into one [`ReportRow`] per
//! sample with a [`CompoundCell`] for every compound seen in any sample. The rows
//! feed the CSV writer; [`AnalysisReport`] keeps the full nested results for JSON;
//! [`ReportSummary`] condenses them for the console.

mod summary;
mod writer;

pub use summary::{CompoundSummary, ReportSummary};
pub use writer::{write_csv, write_csv_file, AnalysisReport};

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::sweep::SampleResult;

/// Errors that can occur while writing reports
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// I/O error during file operations
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error while writing CSV
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Error while serializing JSON
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Rows disagree on their compound columns
    #[error("Row for sample {sample} has {found} compounds, expected {expected}")]
    RaggedRows {
        /// Offending sample
        sample: String,
        /// Compounds in the first row
        expected: usize,
        /// Compounds in this row
        found: usize,
    },
}

/// One compound's values in a report row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompoundCell {
    /// Compound formula
    pub formula: String,
    /// Whether the compound was detected
    pub detected: bool,
    /// Scan of the optimal detection
    pub scan: Option<u32>,
    /// Retention time of the optimal detection (seconds)
    pub retention_time: Option<f64>,
    /// Observed m/z
    pub mz: Option<f64>,
    /// Observed intensity
    pub intensity: Option<f64>,
    /// Mass error against the target (ppm)
    pub mass_error_ppm: Option<f64>,
    /// Isotope matches of the optimal detection
    pub match_count: usize,
    /// Validation confidence of the optimal detection
    pub confidence: Option<f64>,
    /// Accepted candidates across the sweep
    pub detection_count: usize,
}

impl CompoundCell {
    fn absent(formula: &str) -> Self {
        Self {
            formula: formula.to_string(),
            detected: false,
            scan: None,
            retention_time: None,
            mz: None,
            intensity: None,
            mass_error_ppm: None,
            match_count: 0,
            confidence: None,
            detection_count: 0,
        }
    }
}

/// One sample's flattened results
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    /// Sample name
    pub sample: String,
    /// Sample group label
    pub group: Option<String>,
    /// One cell per compound, sorted by formula
    pub compounds: Vec<CompoundCell>,
}

/// Flatten sample results into rows.
///
/// Every row gets a cell for every compound seen in any sample, so the rows share
/// one column layout. Compounds missing from a sample are reported as absent.
pub fn aggregate(results: &BTreeMap<String, SampleResult>) -> Vec<ReportRow> {
    let formulas: BTreeSet<&str> = results
        .values()
        .flat_map(|r| r.compounds.keys().map(String::as_str))
        .collect();

    results
        .iter()
        .map(|(name, result)| ReportRow {
            sample: name.clone(),
            group: result.group.clone(),
            compounds: formulas
                .iter()
                .map(|formula| match result.compounds.get(*formula) {
                    Some(compound) => {
                        let optimal = compound.optimal.as_ref();
                        CompoundCell {
                            formula: formula.to_string(),
                            detected: compound.is_detected(),
                            scan: optimal.map(|o| o.scan),
                            retention_time: optimal.and_then(|o| o.retention_time),
                            mz: optimal.map(|o| o.candidate.mz),
                            intensity: optimal.map(|o| o.candidate.intensity),
                            mass_error_ppm: optimal.map(|o| o.validation.mass_error_ppm),
                            match_count: optimal.map_or(0, |o| o.validation.match_count),
                            confidence: optimal.map(|o| o.validation.confidence),
                            detection_count: compound.detection_count,
                        }
                    }
                    None => CompoundCell::absent(formula),
                })
                .collect(),
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::detection::{DetectionCandidate, PeakMode, ValidationOutcome};
    use crate::sweep::{CompoundResult, CompoundStatus, OptimalDetection};

    pub(crate) fn detected(formula: &str, scan: u32, intensity: f64, count: usize) -> CompoundResult {
        CompoundResult {
            formula: formula.to_string(),
            status: CompoundStatus::Detected,
            optimal: Some(OptimalDetection {
                scan,
                retention_time: Some(scan as f64 * 2.0),
                candidate: DetectionCandidate {
                    mz: 283.264,
                    intensity,
                    mass_error_ppm: 1.06,
                    window_points: 1,
                    mode: PeakMode::SimpleMax,
                },
                validation: ValidationOutcome {
                    is_valid: true,
                    match_count: 1,
                    required_matches: 1,
                    confidence: 1.0,
                    mass_accurate: true,
                    mass_error_ppm: 1.06,
                    main_peak_match: true,
                    matches: Vec::new(),
                    rejection: None,
                },
                refined: None,
            }),
            detection_count: count,
            candidate_count: count,
            rejected_count: 0,
        }
    }

    pub(crate) fn not_detected(formula: &str) -> CompoundResult {
        CompoundResult {
            formula: formula.to_string(),
            status: CompoundStatus::NotDetected,
            optimal: None,
            detection_count: 0,
            candidate_count: 2,
            rejected_count: 2,
        }
    }

    pub(crate) fn results() -> BTreeMap<String, SampleResult> {
        let mut a = BTreeMap::new();
        a.insert("C18H35O2".to_string(), detected("C18H35O2", 12, 4200.0, 3));
        a.insert("C24H52PSe".to_string(), not_detected("C24H52PSe"));

        let mut b = BTreeMap::new();
        b.insert("C18H35O2".to_string(), not_detected("C18H35O2"));

        let mut results = BTreeMap::new();
        results.insert(
            "S1".to_string(),
            SampleResult {
                name: "S1".to_string(),
                group: Some("batch-1".to_string()),
                compounds: a,
            },
        );
        results.insert(
            "S2".to_string(),
            SampleResult {
                name: "S2".to_string(),
                group: None,
                compounds: b,
            },
        );
        results
    }

    #[test]
    fn test_aggregate_rows() {
        let rows = aggregate(&results());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].sample, "S1");
        assert_eq!(rows[0].group.as_deref(), Some("batch-1"));

        let formulas: Vec<&str> = rows[0].compounds.iter().map(|c| c.formula.as_str()).collect();
        assert_eq!(formulas, vec!["C18H35O2", "C24H52PSe"]);

        let oleic = &rows[0].compounds[0];
        assert!(oleic.detected);
        assert_eq!(oleic.scan, Some(12));
        assert_eq!(oleic.retention_time, Some(24.0));
        assert_eq!(oleic.intensity, Some(4200.0));
        assert_eq!(oleic.confidence, Some(1.0));
        assert_eq!(oleic.detection_count, 3);
    }

    #[test]
    fn test_missing_compounds_are_absent() {
        let rows = aggregate(&results());
        let topse = &rows[1].compounds[1];
        assert_eq!(topse.formula, "C24H52PSe");
        assert!(!topse.detected);
        assert_eq!(topse.scan, None);
        assert_eq!(topse.match_count, 0);
        assert_eq!(topse.detection_count, 0);
    }

    #[test]
    fn test_aggregate_empty() {
        assert!(aggregate(&BTreeMap::new()).is_empty());
    }
}
