//! Scan sweeps: best detection of each compound across a sample.
//!
//! A sweep walks a sample's spectra once per compound in ascending scan order,
//! locates and validates a candidate in every spectrum, and keeps the accepted
//! candidate with the highest intensity. Equal intensities keep the earlier scan.
//!
//! ```
//! use isodetect::detection::DetectionConfig;
//! use isodetect::reference::{ReferencePattern, ReferencePeak};
//! use isodetect::spectrum::{SampleSpectra, Spectrum};
//! use isodetect::sweep::{sweep, CompoundStatus};
//!
//! let pattern = ReferencePattern::new(
//!     "C18H35O2",
//!     "Oleic acid",
//!     283.2637,
//!     vec![ReferencePeak::new(283.2637, 100.0), ReferencePeak::new(284.2670, 19.8)],
//! );
//! let spectra = SampleSpectra::new(
//!     "S1",
//!     vec![Spectrum::new(1, Some(60.0), vec![283.264], vec![4200.0]).unwrap()],
//! );
//!
//! let result = sweep(&spectra, &pattern, &DetectionConfig::default());
//! assert_eq!(result.status, CompoundStatus::Detected);
//! assert_eq!(result.detection_count, 1);
//! ```

use std::collections::BTreeMap;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::detection::{
    locate, locate_above_floor, validate_with_settings, DetectionCandidate, DetectionConfig,
    ValidationOutcome,
};
use crate::reference::{ReferencePattern, ReferenceStore};
use crate::spectrum::{SampleSpectra, Spectrum};

/// Final state of one (sample, compound) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompoundStatus {
    /// At least one candidate was accepted
    Detected,
    /// The sweep finished without an accepted candidate
    NotDetected,
    /// No usable reference pattern
    PatternUnavailable,
}

impl std::fmt::Display for CompoundStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompoundStatus::Detected => write!(f, "detected"),
            CompoundStatus::NotDetected => write!(f, "not detected"),
            CompoundStatus::PatternUnavailable => write!(f, "pattern unavailable"),
        }
    }
}

/// The accepted candidate with the highest intensity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimalDetection {
    /// Scan the candidate came from
    pub scan: u32,
    /// Retention time of that scan (seconds)
    pub retention_time: Option<f64>,
    /// The sweep-time candidate
    pub candidate: DetectionCandidate,
    /// Its validation
    pub validation: ValidationOutcome,
    /// Narrow-window re-location on the same scan
    pub refined: Option<DetectionCandidate>,
}

/// Outcome of sweeping one compound across one sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundResult {
    /// Compound formula
    pub formula: String,
    /// Final state
    pub status: CompoundStatus,
    /// Best accepted detection
    pub optimal: Option<OptimalDetection>,
    /// Number of accepted candidates
    pub detection_count: usize,
    /// Number of spectra that produced a candidate
    pub candidate_count: usize,
    /// Number of candidates that failed validation
    pub rejected_count: usize,
}

impl CompoundResult {
    /// Result for a compound without a usable pattern
    pub fn unavailable(formula: impl Into<String>) -> Self {
        Self {
            formula: formula.into(),
            status: CompoundStatus::PatternUnavailable,
            optimal: None,
            detection_count: 0,
            candidate_count: 0,
            rejected_count: 0,
        }
    }

    /// True when the compound was detected
    pub fn is_detected(&self) -> bool {
        self.status == CompoundStatus::Detected
    }
}

/// Per-compound results of one sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleResult {
    /// Sample name
    pub name: String,
    /// Optional group label
    pub group: Option<String>,
    /// Formula to result
    pub compounds: BTreeMap<String, CompoundResult>,
}

impl SampleResult {
    /// Number of detected compounds
    pub fn detected_count(&self) -> usize {
        self.compounds.values().filter(|c| c.is_detected()).count()
    }
}

/// Sweep one compound across a sample
pub fn sweep(spectra: &SampleSpectra, pattern: &ReferencePattern, config: &DetectionConfig) -> CompoundResult {
    let settings = config.settings_for(pattern.class);

    let mut best: Option<OptimalDetection> = None;
    let mut best_spectrum: Option<&Spectrum> = None;
    let mut detection_count = 0;
    let mut candidate_count = 0;
    let mut rejected_count = 0;

    for spectrum in spectra.spectra() {
        let Some(candidate) = locate_above_floor(
            spectrum.mz(),
            spectrum.intensity(),
            pattern.target_mz,
            settings.mz_tolerance,
            settings.intensity_threshold,
        ) else {
            continue;
        };
        candidate_count += 1;

        let validation = validate_with_settings(&candidate, pattern, config, &settings);
        if !validation.is_valid {
            rejected_count += 1;
            continue;
        }
        detection_count += 1;

        let better = best
            .as_ref()
            .map_or(true, |b| candidate.intensity > b.candidate.intensity);
        if better {
            best = Some(OptimalDetection {
                scan: spectrum.scan,
                retention_time: spectrum.retention_time,
                candidate,
                validation,
                refined: None,
            });
            best_spectrum = Some(spectrum);
        }
    }

    // Refine on the selected spectrum itself; scan ids may repeat
    if let (Some(optimal), Some(spectrum)) = (best.as_mut(), best_spectrum) {
        optimal.refined = locate(
            spectrum.mz(),
            spectrum.intensity(),
            pattern.target_mz,
            config.refine_tolerance,
            &config.true_peak,
        );
    }

    let status = if best.is_some() {
        CompoundStatus::Detected
    } else {
        CompoundStatus::NotDetected
    };

    match &best {
        Some(optimal) => debug!(
            "{} in {}: scan {} m/z {:.4} intensity {:.0} ({} detections)",
            pattern.formula,
            spectra.name,
            optimal.scan,
            optimal.candidate.mz,
            optimal.candidate.intensity,
            detection_count
        ),
        None => debug!(
            "{} in {}: not detected ({} candidates rejected)",
            pattern.formula, spectra.name, rejected_count
        ),
    }

    CompoundResult {
        formula: pattern.formula.clone(),
        status,
        optimal: best,
        detection_count,
        candidate_count,
        rejected_count,
    }
}

/// Sweep every compound of the store across one sample.
///
/// Compounds the store marks as unavailable appear with
/// [`CompoundStatus::PatternUnavailable`].
pub fn analyze_sample(spectra: &SampleSpectra, store: &ReferenceStore, config: &DetectionConfig) -> SampleResult {
    let mut compounds = BTreeMap::new();

    for pattern in store.patterns() {
        compounds.insert(pattern.formula.clone(), sweep(spectra, pattern, config));
    }
    for (formula, _) in store.unavailable() {
        compounds.insert(formula.to_string(), CompoundResult::unavailable(formula));
    }

    let result = SampleResult {
        name: spectra.name.clone(),
        group: spectra.group.clone(),
        compounds,
    };
    info!(
        "Sample {}: {} spectra, {}/{} compounds detected",
        result.name,
        spectra.len(),
        result.detected_count(),
        store.len()
    );
    result
}

/// Analyze many samples, one task per sample.
///
/// Runs on the rayon pool with the `parallel` feature. Samples sharing a name keep
/// the result of the later one.
pub fn analyze_samples(
    samples: &[SampleSpectra],
    store: &ReferenceStore,
    config: &DetectionConfig,
) -> BTreeMap<String, SampleResult> {
    #[cfg(feature = "parallel")]
    let results: Vec<SampleResult> = {
        use rayon::prelude::*;
        samples
            .par_iter()
            .map(|sample| analyze_sample(sample, store, config))
            .collect()
    };

    #[cfg(not(feature = "parallel"))]
    let results: Vec<SampleResult> = samples
        .iter()
        .map(|sample| analyze_sample(sample, store, config))
        .collect();

    let mut by_name = BTreeMap::new();
    for result in results {
        if by_name.contains_key(&result.name) {
            warn!("Duplicate sample name {}; keeping the later one", result.name);
        }
        by_name.insert(result.name.clone(), result);
    }
    by_name
}
