//! Peak location and isotope-pattern validation.
//!
//! The pipeline for one spectrum and one compound:
//!
//! 1. [`locate`] / [`locate_above_floor`] pick the best peak inside an m/z window
//!    around the compound's target and return a [`DetectionCandidate`].
//! 2. [`validate`] checks the candidate against the compound's
//!    [`ReferencePattern`](crate::reference::ReferencePattern) and the thresholds
//!    of its class, producing a [`ValidationOutcome`].
//!
//! All thresholds come from [`DetectionConfig`].

mod config;
mod locator;
pub mod peaks;
mod validator;

pub use config::{ClassSettings, DetectionConfig, ResolvedSettings, TruePeakParams};
pub use locator::{locate, locate_above_floor, SWEEP_MIN_WINDOW_POINTS};
pub use validator::{validate, validate_with_settings, PeakMatch, Rejection, ValidationOutcome};

use serde::{Deserialize, Serialize};

/// How a candidate peak was picked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeakMode {
    /// Highest local maximum that passed the height, distance and prominence filters
    TruePeak,
    /// Global maximum of the window
    SimpleMax,
}

impl PeakMode {
    /// True for local-maximum picks ("corrected" peaks)
    pub fn is_corrected(&self) -> bool {
        matches!(self, PeakMode::TruePeak)
    }
}

/// A peak found near a target m/z in one spectrum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionCandidate {
    /// Observed m/z of the peak
    pub mz: f64,
    /// Observed intensity of the peak
    pub intensity: f64,
    /// Absolute mass error relative to the search target (ppm)
    pub mass_error_ppm: f64,
    /// Number of data points inside the search window
    pub window_points: usize,
    /// Picking mode
    pub mode: PeakMode,
}

/// Absolute mass error in ppm
#[inline]
pub fn mass_error_ppm(observed: f64, theoretical: f64) -> f64 {
    (observed - theoretical).abs() / theoretical * 1e6
}
