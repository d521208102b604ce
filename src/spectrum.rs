//! Spectrum records consumed by the detection engine.
//!
//! A [`Spectrum`] is one scan: parallel m/z and intensity arrays plus the scan
//! identifier and retention time. A [`SampleSpectra`] is the ordered scan sequence
//! of one sample, which is what the sweep iterates.

use serde::{Deserialize, Serialize};

/// Errors raised when spectrum arrays violate the data model
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SpectrumError {
    /// m/z and intensity arrays differ in length
    #[error("Array length mismatch in scan {scan}: {mz_len} m/z values, {intensity_len} intensities")]
    LengthMismatch {
        /// Scan identifier
        scan: u32,
        /// Number of m/z values
        mz_len: usize,
        /// Number of intensity values
        intensity_len: usize,
    },

    /// An intensity is negative or not a finite number
    #[error("Invalid intensity {value} at index {index} in scan {scan}")]
    InvalidIntensity {
        /// Scan identifier
        scan: u32,
        /// Position in the intensity array
        index: usize,
        /// Offending value
        value: f64,
    },

    /// Scan identifiers must be positive
    #[error("Scan identifier must be positive")]
    InvalidScan,
}

/// One mass spectrum (scan)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spectrum {
    /// Native scan number, unique within a sample
    pub scan: u32,
    /// Retention time in seconds, if the source recorded one
    pub retention_time: Option<f64>,
    /// MS level (1 for survey scans)
    pub ms_level: u8,
    mz: Vec<f64>,
    intensity: Vec<f64>,
}

impl Spectrum {
    /// Build an MS1 spectrum, checking the array invariants.
    ///
    /// The m/z array is sorted ascending (carrying intensities along) if the
    /// source delivered it out of order.
    pub fn new(
        scan: u32,
        retention_time: Option<f64>,
        mz: Vec<f64>,
        intensity: Vec<f64>,
    ) -> Result<Self, SpectrumError> {
        if scan == 0 {
            return Err(SpectrumError::InvalidScan);
        }
        if mz.len() != intensity.len() {
            return Err(SpectrumError::LengthMismatch {
                scan,
                mz_len: mz.len(),
                intensity_len: intensity.len(),
            });
        }
        if let Some((index, &value)) = intensity
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite() || **v < 0.0)
        {
            return Err(SpectrumError::InvalidIntensity { scan, index, value });
        }

        let mut spectrum = Self {
            scan,
            retention_time,
            ms_level: 1,
            mz,
            intensity,
        };
        spectrum.ensure_sorted();
        Ok(spectrum)
    }

    /// Set the MS level
    pub fn with_ms_level(mut self, ms_level: u8) -> Self {
        self.ms_level = ms_level;
        self
    }

    /// Ascending m/z values
    pub fn mz(&self) -> &[f64] {
        &self.mz
    }

    /// Intensities, parallel to [`Spectrum::mz`]
    pub fn intensity(&self) -> &[f64] {
        &self.intensity
    }

    /// Number of data points
    pub fn len(&self) -> usize {
        self.mz.len()
    }

    /// True when the spectrum holds no data points
    pub fn is_empty(&self) -> bool {
        self.mz.is_empty()
    }

    fn ensure_sorted(&mut self) {
        if self.mz.windows(2).all(|w| w[0] <= w[1]) {
            return;
        }
        log::debug!("Scan {}: sorting {} unsorted m/z values", self.scan, self.mz.len());
        let mut pairs: Vec<(f64, f64)> = self
            .mz
            .iter()
            .copied()
            .zip(self.intensity.iter().copied())
            .collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (mz, intensity) = pairs.into_iter().unzip();
        self.mz = mz;
        self.intensity = intensity;
    }
}

/// The ordered scan sequence of one sample
#[derive(Debug, Clone, Default)]
pub struct SampleSpectra {
    /// Sample name used as the key in results
    pub name: String,
    /// Optional group label (e.g. a synthesis batch) carried into reports
    pub group: Option<String>,
    spectra: Vec<Spectrum>,
}

impl SampleSpectra {
    /// Collect a sample's spectra, stably ordered by ascending scan id.
    ///
    /// Stability keeps the source order for any repeated scan id, so the sweep's
    /// first-encountered tie break stays well defined.
    pub fn new(name: impl Into<String>, mut spectra: Vec<Spectrum>) -> Self {
        spectra.sort_by_key(|s| s.scan);
        Self {
            name: name.into(),
            group: None,
            spectra,
        }
    }

    /// Attach a group label
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Spectra in ascending scan order
    pub fn spectra(&self) -> &[Spectrum] {
        &self.spectra
    }

    /// Number of spectra
    pub fn len(&self) -> usize {
        self.spectra.len()
    }

    /// True when the sample has no spectra
    pub fn is_empty(&self) -> bool {
        self.spectra.is_empty()
    }

    /// Look up a spectrum by scan id
    pub fn get(&self, scan: u32) -> Option<&Spectrum> {
        self.spectra
            .binary_search_by_key(&scan, |s| s.scan)
            .ok()
            .map(|i| &self.spectra[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_length_mismatch() {
        let err = Spectrum::new(1, None, vec![100.0, 200.0], vec![1.0]).unwrap_err();
        assert!(matches!(err, SpectrumError::LengthMismatch { mz_len: 2, intensity_len: 1, .. }));
    }

    #[test]
    fn test_rejects_negative_intensity() {
        let err = Spectrum::new(3, None, vec![100.0, 200.0], vec![1.0, -5.0]).unwrap_err();
        assert_eq!(
            err,
            SpectrumError::InvalidIntensity { scan: 3, index: 1, value: -5.0 }
        );
    }

    #[test]
    fn test_rejects_zero_scan() {
        assert_eq!(
            Spectrum::new(0, None, vec![], vec![]).unwrap_err(),
            SpectrumError::InvalidScan
        );
    }

    #[test]
    fn test_sorts_unsorted_mz() {
        let spectrum = Spectrum::new(1, Some(1.5), vec![300.0, 100.0, 200.0], vec![3.0, 1.0, 2.0])
            .unwrap();
        assert_eq!(spectrum.mz(), &[100.0, 200.0, 300.0]);
        assert_eq!(spectrum.intensity(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_sample_orders_by_scan() {
        let spectra = vec![
            Spectrum::new(7, None, vec![], vec![]).unwrap(),
            Spectrum::new(2, None, vec![], vec![]).unwrap(),
            Spectrum::new(5, None, vec![], vec![]).unwrap(),
        ];
        let sample = SampleSpectra::new("S1", spectra);
        let scans: Vec<u32> = sample.spectra().iter().map(|s| s.scan).collect();
        assert_eq!(scans, vec![2, 5, 7]);
        assert_eq!(sample.get(5).map(|s| s.scan), Some(5));
        assert!(sample.get(6).is_none());
    }
}
