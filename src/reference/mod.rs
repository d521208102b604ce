//! # Reference Isotope Patterns
//!
//! Theoretical isotope envelopes, one per compound, against which observed peaks
//! are validated. Patterns are loaded once per run and shared read-only by every
//! sweep.
//!
//! Each pattern carries an explicit [`CompoundClass`] tag. The tag is assigned when
//! the pattern is loaded (from the reference file, or from [`ClassRules`]) and then
//! travels with the pattern as data; nothing downstream inspects compound names.
//!
//! ## Loaders
//!
//! - [`chemcalc`]: merged chemcalc JSON exports (`formulas[].xy` peak lists)
//! - [`table`]: two-column `mz,intensity` CSV tables for a single compound
//!
//! Patterns that fail the structural checks in [`ReferencePattern::check`] are not
//! loaded. The store remembers them as *unavailable* together with the reason, so
//! every sample can report them instead of silently dropping the compound.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use log::warn;
use serde::{Deserialize, Serialize};

pub mod chemcalc;
mod classify;
pub mod table;

pub use classify::ClassRules;

/// Errors raised while loading or checking reference patterns
#[derive(Debug, thiserror::Error)]
pub enum ReferenceError {
    /// I/O error reading a reference file
    #[error("Failed to read reference file: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON reference file could not be decoded
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// CSV reference table could not be decoded
    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    /// Required column missing from a reference table
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// Pattern has no peaks
    #[error("Reference pattern for {0} has no peaks")]
    EmptyPattern(String),

    /// Peak list is not sorted by m/z
    #[error("Reference pattern for {formula} is not sorted by m/z at peak {index}")]
    NonMonotonic {
        /// Compound formula
        formula: String,
        /// Index of the first out-of-order peak
        index: usize,
    },

    /// Peak intensity is negative or not finite
    #[error("Reference pattern for {formula} has an invalid intensity at peak {index}")]
    InvalidIntensity {
        /// Compound formula
        formula: String,
        /// Index of the offending peak
        index: usize,
    },

    /// Target m/z missing, zero or negative
    #[error("Reference pattern for {formula} has invalid target m/z {target}")]
    InvalidTarget {
        /// Compound formula
        formula: String,
        /// Offending target value
        target: f64,
    },

    /// A peak line could not be parsed
    #[error("Reference pattern for {formula}, line {line}: {message}")]
    Parse {
        /// Compound formula
        formula: String,
        /// 1-based line number within the peak list
        line: usize,
        /// What went wrong
        message: String,
    },

    /// Requested compound is not loaded
    #[error("Reference pattern unavailable for {formula}: {reason}")]
    Unavailable {
        /// Compound formula
        formula: String,
        /// Why the pattern is unavailable
        reason: String,
    },
}

/// Compound category that selects detection thresholds
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CompoundClass {
    /// Default thresholds
    #[default]
    Standard,
    /// Abundant ligands that need a higher intensity floor
    HighIntensity,
}

impl CompoundClass {
    /// All classes, in configuration order
    pub const ALL: [CompoundClass; 2] = [CompoundClass::Standard, CompoundClass::HighIntensity];

    /// Configuration key for this class
    pub fn as_str(&self) -> &'static str {
        match self {
            CompoundClass::Standard => "standard",
            CompoundClass::HighIntensity => "high_intensity",
        }
    }
}

impl fmt::Display for CompoundClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompoundClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "standard" | "default" => Ok(CompoundClass::Standard),
            "high_intensity" | "high" => Ok(CompoundClass::HighIntensity),
            other => Err(format!("unknown compound class '{}'", other)),
        }
    }
}

/// One theoretical isotope peak
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferencePeak {
    /// Theoretical m/z
    pub mz: f64,
    /// Relative abundance on an arbitrary scale
    pub intensity: f64,
}

impl ReferencePeak {
    /// Create a reference peak
    pub fn new(mz: f64, intensity: f64) -> Self {
        Self { mz, intensity }
    }
}

/// Theoretical isotope envelope of one compound
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferencePattern {
    /// Molecular formula, used as the compound identifier
    pub formula: String,
    /// Display name
    pub name: String,
    /// Canonical (monoisotopic) target m/z
    pub target_mz: f64,
    /// Nominal mass, when the source provides one
    pub nominal_mass: Option<f64>,
    /// Threshold class assigned at load time
    pub class: CompoundClass,
    /// Isotope peaks, sorted by m/z
    pub peaks: Vec<ReferencePeak>,
}

impl ReferencePattern {
    /// Create a `Standard` class pattern
    pub fn new(
        formula: impl Into<String>,
        name: impl Into<String>,
        target_mz: f64,
        peaks: Vec<ReferencePeak>,
    ) -> Self {
        Self {
            formula: formula.into(),
            name: name.into(),
            target_mz,
            nominal_mass: None,
            class: CompoundClass::Standard,
            peaks,
        }
    }

    /// Set the threshold class
    pub fn with_class(mut self, class: CompoundClass) -> Self {
        self.class = class;
        self
    }

    /// Check the structural invariants of a loadable pattern.
    ///
    /// A pattern must have a positive target, at least one peak, peaks sorted by
    /// m/z, and finite non-negative intensities with a positive maximum.
    pub fn check(&self) -> Result<(), ReferenceError> {
        if !(self.target_mz.is_finite() && self.target_mz > 0.0) {
            return Err(ReferenceError::InvalidTarget {
                formula: self.formula.clone(),
                target: self.target_mz,
            });
        }
        if self.peaks.is_empty() {
            return Err(ReferenceError::EmptyPattern(self.formula.clone()));
        }
        for (index, peak) in self.peaks.iter().enumerate() {
            if !peak.intensity.is_finite() || peak.intensity < 0.0 || !peak.mz.is_finite() {
                return Err(ReferenceError::InvalidIntensity {
                    formula: self.formula.clone(),
                    index,
                });
            }
            if index > 0 && peak.mz < self.peaks[index - 1].mz {
                return Err(ReferenceError::NonMonotonic {
                    formula: self.formula.clone(),
                    index,
                });
            }
        }
        if self.max_intensity().map_or(true, |max| max <= 0.0) {
            return Err(ReferenceError::EmptyPattern(self.formula.clone()));
        }
        Ok(())
    }

    /// Largest peak intensity
    pub fn max_intensity(&self) -> Option<f64> {
        self.peaks
            .iter()
            .map(|p| p.intensity)
            .fold(None, |acc, v| match acc {
                Some(max) if max >= v => Some(max),
                _ => Some(v),
            })
    }

    /// The most abundant peak (first one on ties)
    pub fn main_peak(&self) -> Option<&ReferencePeak> {
        let mut best: Option<&ReferencePeak> = None;
        for peak in &self.peaks {
            match best {
                Some(b) if b.intensity >= peak.intensity => {}
                _ => best = Some(peak),
            }
        }
        best
    }

    /// Peaks paired with their intensity relative to the pattern maximum (0..=1).
    ///
    /// Empty when the pattern has no positive maximum.
    pub fn normalized(&self) -> impl Iterator<Item = (&ReferencePeak, f64)> + '_ {
        let max = self.max_intensity().filter(|m| *m > 0.0);
        self.peaks
            .iter()
            .filter(move |_| max.is_some())
            .map(move |p| (p, p.intensity / max.unwrap_or(1.0)))
    }
}

/// Read-only collection of reference patterns keyed by formula
#[derive(Debug, Clone, Default)]
pub struct ReferenceStore {
    patterns: BTreeMap<String, ReferencePattern>,
    unavailable: BTreeMap<String, String>,
}

impl ReferenceStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a pattern after checking it.
    ///
    /// A later pattern with the same formula replaces the earlier one.
    pub fn insert(&mut self, pattern: ReferencePattern) -> Result<(), ReferenceError> {
        pattern.check()?;
        self.unavailable.remove(&pattern.formula);
        if self.patterns.contains_key(&pattern.formula) {
            log::debug!("Replacing reference pattern for {}", pattern.formula);
        }
        self.patterns.insert(pattern.formula.clone(), pattern);
        Ok(())
    }

    /// Insert a pattern, or record it as unavailable when the check fails
    pub fn insert_or_skip(&mut self, pattern: ReferencePattern) -> bool {
        let formula = pattern.formula.clone();
        match self.insert(pattern) {
            Ok(()) => true,
            Err(e) => {
                warn!("Skipping reference pattern {}: {}", formula, e);
                self.mark_unavailable(formula, e.to_string());
                false
            }
        }
    }

    /// Record a compound whose pattern could not be loaded
    pub fn mark_unavailable(&mut self, formula: impl Into<String>, reason: impl Into<String>) {
        let formula = formula.into();
        if !self.patterns.contains_key(&formula) {
            self.unavailable.insert(formula, reason.into());
        }
    }

    /// Look up a loaded pattern
    pub fn get(&self, formula: &str) -> Option<&ReferencePattern> {
        self.patterns.get(formula)
    }

    /// Look up a pattern, explaining why it is missing
    pub fn lookup(&self, formula: &str) -> Result<&ReferencePattern, ReferenceError> {
        self.patterns.get(formula).ok_or_else(|| ReferenceError::Unavailable {
            formula: formula.to_string(),
            reason: self
                .unavailable
                .get(formula)
                .cloned()
                .unwrap_or_else(|| "not present in reference data".to_string()),
        })
    }

    /// Loaded patterns, ordered by formula
    pub fn patterns(&self) -> impl Iterator<Item = &ReferencePattern> {
        self.patterns.values()
    }

    /// Unavailable compounds with the reason, ordered by formula
    pub fn unavailable(&self) -> impl Iterator<Item = (&str, &str)> {
        self.unavailable.iter().map(|(f, r)| (f.as_str(), r.as_str()))
    }

    /// Number of loaded patterns
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// True when no pattern is loaded
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Merge another store into this one
    pub fn extend(&mut self, other: ReferenceStore) {
        for (formula, reason) in other.unavailable {
            self.mark_unavailable(formula, reason);
        }
        for pattern in other.patterns.into_values() {
            self.insert_or_skip(pattern);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(peaks: &[(f64, f64)]) -> ReferencePattern {
        ReferencePattern::new(
            "C18H35O2",
            "Oleic acid",
            283.2637,
            peaks.iter().map(|&(mz, i)| ReferencePeak::new(mz, i)).collect(),
        )
    }

    #[test]
    fn test_main_peak_and_normalization() {
        let p = pattern(&[(283.2637, 100.0), (284.2670, 20.0), (285.2700, 2.0)]);
        assert_eq!(p.main_peak().unwrap().mz, 283.2637);
        let rel: Vec<f64> = p.normalized().map(|(_, r)| r).collect();
        assert_eq!(rel, vec![1.0, 0.2, 0.02]);
    }

    #[test]
    fn test_main_peak_first_on_tie() {
        let p = pattern(&[(100.0, 50.0), (101.0, 50.0)]);
        assert_eq!(p.main_peak().unwrap().mz, 100.0);
    }

    #[test]
    fn test_check_rejects_malformed() {
        assert!(matches!(pattern(&[]).check(), Err(ReferenceError::EmptyPattern(_))));
        assert!(matches!(
            pattern(&[(101.0, 1.0), (100.0, 1.0)]).check(),
            Err(ReferenceError::NonMonotonic { index: 1, .. })
        ));
        assert!(matches!(
            pattern(&[(100.0, -1.0)]).check(),
            Err(ReferenceError::InvalidIntensity { index: 0, .. })
        ));
        assert!(matches!(pattern(&[(100.0, 0.0)]).check(), Err(ReferenceError::EmptyPattern(_))));

        let mut bad_target = pattern(&[(100.0, 1.0)]);
        bad_target.target_mz = 0.0;
        assert!(matches!(bad_target.check(), Err(ReferenceError::InvalidTarget { .. })));
    }

    #[test]
    fn test_store_records_unavailable() {
        let mut store = ReferenceStore::new();
        assert!(store.insert_or_skip(pattern(&[(283.2637, 100.0)])));
        let mut empty = pattern(&[]);
        empty.formula = "C24H51P".to_string();
        assert!(!store.insert_or_skip(empty));

        assert_eq!(store.len(), 1);
        assert!(store.get("C18H35O2").is_some());
        let unavailable: Vec<_> = store.unavailable().collect();
        assert_eq!(unavailable.len(), 1);
        assert_eq!(unavailable[0].0, "C24H51P");
        assert!(matches!(
            store.lookup("C24H51P"),
            Err(ReferenceError::Unavailable { .. })
        ));
    }

    #[test]
    fn test_class_parsing() {
        assert_eq!("high_intensity".parse::<CompoundClass>(), Ok(CompoundClass::HighIntensity));
        assert_eq!("High-Intensity".parse::<CompoundClass>(), Ok(CompoundClass::HighIntensity));
        assert_eq!("standard".parse::<CompoundClass>(), Ok(CompoundClass::Standard));
        assert!("mystery".parse::<CompoundClass>().is_err());
    }
}
