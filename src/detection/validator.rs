use std::fmt;

use serde::{Deserialize, Serialize};

use super::{mass_error_ppm, DetectionCandidate, DetectionConfig, ResolvedSettings};
use crate::reference::ReferencePattern;

/// Why a candidate was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// The reference pattern has no usable peaks
    PatternUnavailable,
    /// Candidate intensity is below the class threshold
    IntensityBelowThreshold,
    /// Mass error is at or above the configured bound
    MassErrorTooLarge,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::PatternUnavailable => write!(f, "pattern unavailable"),
            Rejection::IntensityBelowThreshold => write!(f, "intensity below threshold"),
            Rejection::MassErrorTooLarge => write!(f, "mass error too large"),
        }
    }
}

/// A reference peak matched by the shifted candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakMatch {
    /// Theoretical m/z of the reference peak
    pub reference_mz: f64,
    /// Reference m/z moved by the candidate's shift
    pub expected_mz: f64,
    /// Normalized intensity of the reference peak (0..=1)
    pub relative_intensity: f64,
    /// `candidate.mz - expected_mz` (Da)
    pub mz_error: f64,
}

/// Result of validating one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    /// Whether the candidate counts as a detection
    pub is_valid: bool,
    /// Number of main-peak matches
    pub match_count: usize,
    /// Required match count reported alongside
    pub required_matches: usize,
    /// 1.0 with a main-peak match, 0.5 otherwise
    pub confidence: f64,
    /// Mass error below the configured bound
    pub mass_accurate: bool,
    /// Mass error relative to the pattern's target m/z (ppm)
    pub mass_error_ppm: f64,
    /// Whether the main reference peak was matched
    pub main_peak_match: bool,
    /// Matched reference peaks
    pub matches: Vec<PeakMatch>,
    /// Reason for rejection, if any
    pub rejection: Option<Rejection>,
}

impl ValidationOutcome {
    fn unavailable(candidate: &DetectionCandidate, config: &DetectionConfig) -> Self {
        Self {
            is_valid: false,
            match_count: 0,
            required_matches: config.min_isotope_matches,
            confidence: 0.5,
            mass_accurate: false,
            mass_error_ppm: candidate.mass_error_ppm,
            main_peak_match: false,
            matches: Vec::new(),
            rejection: Some(Rejection::PatternUnavailable),
        }
    }
}

/// Validate a candidate against a reference pattern.
///
/// The pattern is shifted so its main peak lands on the candidate, then walked in
/// m/z order; the first peak (of at least `min_relative_intensity`) within
/// the class validation tolerance ends the walk and counts as a main-peak match when
/// its relative intensity reaches `main_peak_fraction`.
///
/// Acceptance only depends on the candidate intensity (at least the class
/// threshold) and the mass error against the pattern target (strictly below
/// `max_mass_error_ppm`). The match only raises the confidence.
pub fn validate(
    candidate: &DetectionCandidate,
    pattern: &ReferencePattern,
    config: &DetectionConfig,
) -> ValidationOutcome {
    let settings = config.settings_for(pattern.class);
    validate_with_settings(candidate, pattern, config, &settings)
}

/// [`validate`] with class thresholds already resolved, for callers that check
/// many candidates of the same pattern
pub fn validate_with_settings(
    candidate: &DetectionCandidate,
    pattern: &ReferencePattern,
    config: &DetectionConfig,
    settings: &ResolvedSettings,
) -> ValidationOutcome {
    let (main, max_intensity) = match (pattern.main_peak(), pattern.max_intensity()) {
        (Some(main), Some(max)) if max > 0.0 => (main, max),
        _ => return ValidationOutcome::unavailable(candidate, config),
    };

    let shift = candidate.mz - main.mz;

    let mut matches = Vec::new();
    for peak in &pattern.peaks {
        let relative = peak.intensity / max_intensity;
        if relative < config.min_relative_intensity {
            continue;
        }
        let expected_mz = peak.mz + shift;
        let mz_error = candidate.mz - expected_mz;
        if mz_error.abs() <= settings.validation_tolerance {
            if relative >= config.main_peak_fraction {
                matches.push(PeakMatch {
                    reference_mz: peak.mz,
                    expected_mz,
                    relative_intensity: relative,
                    mz_error,
                });
            }
            break;
        }
    }

    let main_peak_match = !matches.is_empty();
    let ppm = mass_error_ppm(candidate.mz, pattern.target_mz);
    let intensity_ok = candidate.intensity >= settings.intensity_threshold;
    let mass_accurate = ppm < config.max_mass_error_ppm;

    let rejection = if !intensity_ok {
        Some(Rejection::IntensityBelowThreshold)
    } else if !mass_accurate {
        Some(Rejection::MassErrorTooLarge)
    } else {
        None
    };

    ValidationOutcome {
        is_valid: rejection.is_none(),
        match_count: matches.len(),
        required_matches: config.min_isotope_matches,
        confidence: if main_peak_match { 1.0 } else { 0.5 },
        mass_accurate,
        mass_error_ppm: ppm,
        main_peak_match,
        matches,
        rejection,
    }
}
