//! Detection parameters.
//!
//! All tolerances and thresholds of the engine live here instead of being scattered
//! as constants. The per-class table maps a [`CompoundClass`] to its m/z search
//! tolerance, intensity threshold and validation tolerance. Entries read from a
//! config file are merged over the built-in table, so overriding one class keeps
//! the defaults of the others.
//!
//! ```toml
//! [detection]
//! mz_tolerance = 0.3
//! max_mass_error_ppm = 300.0
//!
//! [detection.classes.high_intensity]
//! intensity_threshold = 2000.0
//! ```

use std::collections::BTreeMap;

use log::warn;
use serde::{Deserialize, Deserializer, Serialize};

use crate::reference::CompoundClass;

/// Parameters of the true-peak local-maxima search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TruePeakParams {
    /// The search only runs on windows with more points than this
    pub min_window_points: usize,
    /// Minimum height as a fraction of the window maximum
    pub height_fraction: f64,
    /// Minimum separation between accepted maxima, in data points
    pub min_distance: usize,
    /// Minimum prominence as a fraction of the window maximum
    pub prominence_fraction: f64,
}

impl Default for TruePeakParams {
    fn default() -> Self {
        Self {
            min_window_points: 3,
            height_fraction: 0.10,
            min_distance: 3,
            prominence_fraction: 0.05,
        }
    }
}

/// Per-class overrides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassSettings {
    /// Search half-window around the target (Da); global value when absent
    #[serde(default)]
    pub mz_tolerance: Option<f64>,
    /// Minimum accepted peak intensity
    pub intensity_threshold: f64,
    /// Isotope matching tolerance (Da); global value when absent
    #[serde(default)]
    pub validation_tolerance: Option<f64>,
}

impl ClassSettings {
    /// Settings that only set an intensity threshold
    pub fn with_threshold(intensity_threshold: f64) -> Self {
        Self {
            mz_tolerance: None,
            intensity_threshold,
            validation_tolerance: None,
        }
    }
}

/// Fully resolved thresholds for one class
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedSettings {
    /// Search half-window around the target (Da)
    pub mz_tolerance: f64,
    /// Minimum accepted peak intensity
    pub intensity_threshold: f64,
    /// Isotope matching tolerance (Da)
    pub validation_tolerance: f64,
}

/// Configuration of the locate / validate / sweep pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Default search half-window around the target m/z (Da)
    pub mz_tolerance: f64,
    /// Default tolerance when matching isotope peaks (Da)
    pub validation_tolerance: f64,
    /// Mass errors at or above this bound (ppm) are rejected
    pub max_mass_error_ppm: f64,
    /// Reported as the required match count
    pub min_isotope_matches: usize,
    /// Reference peaks below this relative intensity are ignored
    pub min_relative_intensity: f64,
    /// Relative intensity a reference peak needs to count as the main peak
    pub main_peak_fraction: f64,
    /// Half-window used when refining the optimal scan (Da)
    pub refine_tolerance: f64,
    /// Local-maxima search parameters
    pub true_peak: TruePeakParams,
    /// Class key (`standard`, `high_intensity`) to settings
    #[serde(deserialize_with = "merge_with_default_classes")]
    pub classes: BTreeMap<String, ClassSettings>,
}

fn default_classes() -> BTreeMap<String, ClassSettings> {
    let mut classes = BTreeMap::new();
    classes.insert(
        CompoundClass::Standard.as_str().to_string(),
        ClassSettings::with_threshold(1000.0),
    );
    classes.insert(
        CompoundClass::HighIntensity.as_str().to_string(),
        ClassSettings::with_threshold(2000.0),
    );
    classes
}

fn merge_with_default_classes<'de, D>(deserializer: D) -> Result<BTreeMap<String, ClassSettings>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut classes = default_classes();
    classes.extend(BTreeMap::<String, ClassSettings>::deserialize(deserializer)?);
    Ok(classes)
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            mz_tolerance: 0.3,
            validation_tolerance: 0.015,
            max_mass_error_ppm: 300.0,
            min_isotope_matches: 1,
            min_relative_intensity: 0.01,
            main_peak_fraction: 0.5,
            refine_tolerance: 0.1,
            true_peak: TruePeakParams::default(),
            classes: default_classes(),
        }
    }
}

impl DetectionConfig {
    /// Intensity threshold used when a class has no settings at all
    pub const FALLBACK_INTENSITY_THRESHOLD: f64 = 1000.0;

    /// Resolve the thresholds for a class.
    ///
    /// A class without its own entry falls back to the `standard` entry, and
    /// failing that to [`Self::FALLBACK_INTENSITY_THRESHOLD`]. Missing entries are
    /// reported once by [`Self::warn_on_issues`].
    pub fn settings_for(&self, class: CompoundClass) -> ResolvedSettings {
        let settings = self
            .classes
            .get(class.as_str())
            .or_else(|| self.classes.get(CompoundClass::Standard.as_str()));

        let intensity_threshold = settings
            .map(|s| s.intensity_threshold)
            .unwrap_or(Self::FALLBACK_INTENSITY_THRESHOLD);

        ResolvedSettings {
            mz_tolerance: settings
                .and_then(|s| s.mz_tolerance)
                .unwrap_or(self.mz_tolerance),
            intensity_threshold,
            validation_tolerance: settings
                .and_then(|s| s.validation_tolerance)
                .unwrap_or(self.validation_tolerance),
        }
    }

    /// Class keys in `classes` that name no known class
    pub fn unknown_classes(&self) -> Vec<&str> {
        self.classes
            .keys()
            .filter(|k| k.parse::<CompoundClass>().is_err())
            .map(String::as_str)
            .collect()
    }

    /// Log configuration problems that are tolerated by falling back to defaults
    pub fn warn_on_issues(&self) {
        for key in self.unknown_classes() {
            warn!("Ignoring settings for unknown compound class '{}'", key);
        }
        for class in CompoundClass::ALL {
            if !self.classes.contains_key(class.as_str()) {
                warn!("Compound class {} has no settings; defaults apply", class);
            }
        }
    }
}
