//! # isodetect - Isotope-Pattern Compound Detection
//!
//! `isodetect` finds specific compounds in mass-spectrometry scan series by matching
//! observed peaks against theoretical isotope patterns, and picks the single
//! best-supported detection of each compound in each sample.
//!
//! ## Pipeline
//!
//! - **Peak Locator** ([`detection::locate`], [`detection::locate_above_floor`]):
//!   windowed peak picking around a target m/z with a true-peak search and a
//!   simple-maximum fallback.
//! - **Pattern Validator** ([`detection::validate`]): intensity threshold per
//!   [`reference::CompoundClass`] plus a ppm mass-accuracy bound; a main-peak match
//!   against the shifted reference pattern raises the confidence.
//! - **Scan Sweeper** ([`sweep::sweep`], [`sweep::analyze_samples`]): one ordered
//!   pass per compound over a sample's scans, keeping the most intense accepted
//!   candidate.
//! - **Result Aggregator** ([`report::aggregate`]): one flat row per sample for
//!   the CSV writer, plus JSON and console summaries.
//!
//! ## Quick Start
//!
//! ```rust
//! use isodetect::prelude::*;
//!
//! let mut store = ReferenceStore::new();
//! store.insert(ReferencePattern::new(
//!     "C18H35O2",
//!     "Oleic acid",
//!     283.2637,
//!     vec![ReferencePeak::new(283.2637, 100.0), ReferencePeak::new(284.2670, 19.8)],
//! ))?;
//!
//! let sample = SampleSpectra::new(
//!     "sample_01",
//!     vec![
//!         Spectrum::new(1, Some(30.0), vec![282.0, 283.264, 284.267], vec![40.0, 2400.0, 480.0])?,
//!         Spectrum::new(2, Some(31.0), vec![282.0, 283.264, 284.267], vec![40.0, 5100.0, 990.0])?,
//!     ],
//! );
//!
//! let results = analyze_samples(&[sample], &store, &DetectionConfig::default());
//! let oleic = &results["sample_01"].compounds["C18H35O2"];
//! assert_eq!(oleic.detection_count, 2);
//! assert_eq!(oleic.optimal.as_ref().map(|o| o.scan), Some(2));
//!
//! let rows = aggregate(&results);
//! assert_eq!(rows.len(), 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Features
//!
//! - `mzml` (default): streaming mzML reader ([`mzml`])
//! - `parallel` (default): samples are analyzed on the rayon thread pool
//! - `colorized_output` (default): colored console summaries

#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

pub mod detection;
#[cfg(feature = "mzml")]
pub mod mzml;
pub mod reference;
pub mod report;
pub mod spectrum;
pub mod sweep;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::detection::{
        locate, locate_above_floor, validate, DetectionCandidate, DetectionConfig, PeakMode,
        Rejection, ValidationOutcome,
    };
    pub use crate::reference::{
        ClassRules, CompoundClass, ReferenceError, ReferencePattern, ReferencePeak, ReferenceStore,
    };
    pub use crate::report::{aggregate, AnalysisReport, ReportRow, ReportSummary};
    pub use crate::spectrum::{SampleSpectra, Spectrum, SpectrumError};
    pub use crate::sweep::{
        analyze_sample, analyze_samples, sweep, CompoundResult, CompoundStatus, OptimalDetection,
        SampleResult,
    };

    #[cfg(feature = "mzml")]
    pub use crate::mzml::{read_sample, MzMLError};
}
