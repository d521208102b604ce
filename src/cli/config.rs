//! TOML configuration file support for batch runs.
//!
//! Instead of passing many CLI flags, a run can be described in a config file:
//!
//! ```toml
//! # isodetect.toml
//! [input]
//! paths = ["data/"]
//! reference = "merged_chemcalc.json"
//!
//! [output]
//! directory = "results"
//! json = true
//!
//! [detection]
//! max_mass_error_ppm = 250.0
//!
//! [detection.classes.high_intensity]
//! intensity_threshold = 2500.0
//!
//! [classification]
//! high_intensity_formulas = ["C24H52PSe"]
//!
//! [[samples]]
//! file = "data/QD_batch3.mzML"
//! name = "QD-3"
//! group = "batch-3"
//!
//! [[references]]
//! formula = "C16H31O2"
//! name = "Palmitic acid"
//! target_mz = 255.2324
//! csv = "patterns/palmitate.csv"
//! ```
//!
//! Relative paths are resolved against the directory holding the config file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use isodetect::detection::DetectionConfig;
use isodetect::reference::{ClassRules, CompoundClass};

/// Root configuration structure for isodetect.toml files.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Input locations.
    #[serde(default)]
    pub input: InputConfig,

    /// Output settings.
    #[serde(default)]
    pub output: OutputConfig,

    /// Detection parameters, passed to the library unchanged.
    #[serde(default)]
    pub detection: DetectionConfig,

    /// Load-time classification rules.
    #[serde(default)]
    pub classification: ClassRules,

    /// Samples with an explicit name or group.
    #[serde(default)]
    pub samples: Vec<SampleEntry>,

    /// Extra reference patterns read from CSV tables.
    #[serde(default)]
    pub references: Vec<ReferenceEntry>,
}

/// `[input]` table.
#[derive(Debug, Default, Deserialize)]
pub struct InputConfig {
    /// mzML files or directories.
    #[serde(default)]
    pub paths: Vec<PathBuf>,

    /// Chemcalc reference JSON.
    pub reference: Option<PathBuf>,
}

/// `[output]` table.
#[derive(Debug, Default, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving the CSV and JSON reports.
    pub directory: Option<PathBuf>,

    /// Write the JSON report next to the CSV.
    pub json: Option<bool>,
}

/// One `[[samples]]` entry.
#[derive(Debug, Deserialize)]
pub struct SampleEntry {
    /// mzML file.
    pub file: PathBuf,

    /// Sample name (defaults to the file stem).
    pub name: Option<String>,

    /// Sample group label.
    pub group: Option<String>,
}

/// One `[[references]]` entry.
#[derive(Debug, Deserialize)]
pub struct ReferenceEntry {
    /// Molecular formula.
    pub formula: String,

    /// Display name (defaults to the formula).
    pub name: Option<String>,

    /// Canonical target m/z.
    pub target_mz: f64,

    /// CSV table with `mz` and `intensity` columns.
    pub csv: PathBuf,

    /// Explicit threshold class; classification rules apply when omitted.
    pub class: Option<CompoundClass>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config = Self::from_str(&content)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }

    /// Make every relative path in the config relative to `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };

        self.input.paths.iter_mut().for_each(resolve);
        self.input.reference.iter_mut().for_each(resolve);
        self.output.directory.iter_mut().for_each(resolve);
        self.samples.iter_mut().for_each(|s| resolve(&mut s.file));
        self.references.iter_mut().for_each(|r| resolve(&mut r.csv));
    }
}
