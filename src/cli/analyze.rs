use anyhow::{Context, Result};
use log::{info, warn};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use isodetect::mzml::read_sample;
use isodetect::reference::{chemcalc, table, ReferenceStore};
use isodetect::report::{aggregate, write_csv_file, AnalysisReport, ReportSummary};
use isodetect::spectrum::SampleSpectra;
use isodetect::sweep::analyze_samples;

use super::{Config, DetectionOverrides};

/// Default output directory when neither the CLI nor the config names one
const DEFAULT_OUTPUT_DIR: &str = "compound_detection_results";

/// Report file stem inside the output directory
const REPORT_STEM: &str = "compound_detection";

/// An mzML file queued for analysis
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSource {
    pub path: PathBuf,
    pub name: String,
    pub group: Option<String>,
}

/// Detect reference compounds in a batch of mzML files
pub fn run(
    inputs: Vec<PathBuf>,
    reference: Option<PathBuf>,
    config_path: Option<PathBuf>,
    output: Option<PathBuf>,
    no_json: bool,
    overrides: DetectionOverrides,
) -> Result<()> {
    let config = match &config_path {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    let mut detection = config.detection.clone();
    overrides.apply(&mut detection);
    detection.warn_on_issues();

    let reference = reference
        .or_else(|| config.input.reference.clone())
        .context("No reference file given (use --reference or [input].reference)")?;
    let store = load_references(&reference, &config)?;
    if store.is_empty() {
        anyhow::bail!("No usable reference patterns in {}", reference.display());
    }

    let input_paths = if inputs.is_empty() {
        config.input.paths.clone()
    } else {
        inputs
    };
    let sources = collect_sources(&input_paths, &config)?;
    if sources.is_empty() {
        anyhow::bail!("No mzML files found in the given inputs");
    }

    let output_dir = output
        .or_else(|| config.output.directory.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
    let write_json = !no_json && config.output.json.unwrap_or(true);

    info!("isodetect - Compound Detection");
    info!("==============================");
    info!("Reference: {} ({} patterns)", reference.display(), store.len());
    info!("Samples:   {}", sources.len());
    info!("Output:    {}", output_dir.display());

    let samples = read_samples(&sources);
    if samples.is_empty() {
        anyhow::bail!("None of the {} input files could be read", sources.len());
    }

    let start = std::time::Instant::now();
    let results = analyze_samples(&samples, &store, &detection);
    info!(
        "Analyzed {} samples in {:.2}s",
        results.len(),
        start.elapsed().as_secs_f64()
    );

    std::fs::create_dir_all(&output_dir).with_context(|| {
        format!("Failed to create output directory: {}", output_dir.display())
    })?;

    let rows = aggregate(&results);
    let csv_path = output_dir.join(format!("{}.csv", REPORT_STEM));
    write_csv_file(&rows, &csv_path)
        .with_context(|| format!("Failed to write {}", csv_path.display()))?;
    info!("Wrote {}", csv_path.display());

    let summary = ReportSummary::from_results(&results);

    if write_json {
        let json_path = output_dir.join(format!("{}.json", REPORT_STEM));
        AnalysisReport::new(detection, results)
            .write_json_file(&json_path)
            .with_context(|| format!("Failed to write {}", json_path.display()))?;
        info!("Wrote {}", json_path.display());
    }

    print!("{}", summary.format_colored());

    Ok(())
}

/// Chemcalc JSON plus any CSV tables listed in the config
fn load_references(reference: &Path, config: &Config) -> Result<ReferenceStore> {
    let mut store = chemcalc::load_chemcalc(reference, &config.classification)
        .with_context(|| format!("Failed to load reference file: {}", reference.display()))?;

    for entry in &config.references {
        let name = entry.name.as_deref().unwrap_or(&entry.formula);
        let class = entry
            .class
            .unwrap_or_else(|| config.classification.classify(&entry.formula, name));

        match table::load_pattern_table(&entry.csv, &entry.formula, name, entry.target_mz, class) {
            Ok(pattern) => {
                store.insert_or_skip(pattern);
            }
            Err(e) => {
                warn!(
                    "Skipping reference table {} for {}: {}",
                    entry.csv.display(),
                    entry.formula,
                    e
                );
                store.mark_unavailable(entry.formula.clone(), e.to_string());
            }
        }
    }

    Ok(store)
}

/// Expand directories and merge in `[[samples]]` entries.
///
/// Config entries win over plain inputs for the same file. Order is by file path.
pub fn collect_sources(inputs: &[PathBuf], config: &Config) -> Result<Vec<SampleSource>> {
    let mut by_path: BTreeMap<PathBuf, SampleSource> = BTreeMap::new();

    for input in inputs {
        if input.is_dir() {
            let entries = std::fs::read_dir(input)
                .with_context(|| format!("Failed to read directory: {}", input.display()))?;
            for entry in entries {
                let path = entry?.path();
                if path.is_file() && is_mzml(&path) {
                    by_path
                        .entry(path.clone())
                        .or_insert_with(|| SampleSource::from_path(path));
                }
            }
        } else if input.is_file() {
            by_path
                .entry(input.clone())
                .or_insert_with(|| SampleSource::from_path(input.clone()));
        } else {
            anyhow::bail!("Input does not exist: {}", input.display());
        }
    }

    for entry in &config.samples {
        let mut source = SampleSource::from_path(entry.file.clone());
        if let Some(name) = &entry.name {
            source.name = name.clone();
        }
        source.group = entry.group.clone();
        by_path.insert(entry.file.clone(), source);
    }

    Ok(by_path.into_values().collect())
}

impl SampleSource {
    fn from_path(path: PathBuf) -> Self {
        let name = path
            .file_stem()
            .unwrap_or_default()
            .to_string_lossy()
            .into_owned();
        Self {
            path,
            name,
            group: None,
        }
    }
}

fn is_mzml(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("mzml"))
        .unwrap_or(false)
}

/// Read every source, skipping the ones that fail
fn read_samples(sources: &[SampleSource]) -> Vec<SampleSpectra> {
    #[cfg(feature = "parallel")]
    let results: Vec<Option<SampleSpectra>> = {
        use rayon::prelude::*;
        sources.par_iter().map(read_one).collect()
    };

    #[cfg(not(feature = "parallel"))]
    let results: Vec<Option<SampleSpectra>> = sources.iter().map(read_one).collect();

    results.into_iter().flatten().collect()
}

fn read_one(source: &SampleSource) -> Option<SampleSpectra> {
    match read_sample(&source.path, &source.name) {
        Ok(sample) => {
            info!(
                "Read {} ({} MS1 scans) from {}",
                source.name,
                sample.len(),
                source.path.display()
            );
            Some(match &source.group {
                Some(group) => sample.with_group(group.clone()),
                None => sample,
            })
        }
        Err(e) => {
            warn!("Skipping sample {}: {}", source.path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::config::SampleEntry;

    #[test]
    fn test_collect_sources() {
        let dir = tempfile::tempdir().unwrap();
        for file in ["b.mzML", "a.mzml", "notes.txt"] {
            std::fs::write(dir.path().join(file), "").unwrap();
        }

        let mut config = Config::default();
        config.samples.push(SampleEntry {
            file: dir.path().join("b.mzML"),
            name: Some("B-renamed".to_string()),
            group: Some("batch-2".to_string()),
        });

        let sources = collect_sources(&[dir.path().to_path_buf()], &config).unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].name, "a");
        assert_eq!(sources[0].group, None);
        assert_eq!(sources[1].name, "B-renamed");
        assert_eq!(sources[1].group.as_deref(), Some("batch-2"));
    }

    #[test]
    fn test_collect_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.mzML");
        assert!(collect_sources(&[missing], &Config::default()).is_err());
    }

    #[test]
    fn test_unreadable_sample_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.mzML");
        std::fs::write(&path, "<mzML><run><spectrumList><spectrum id=\"scan=1\">").unwrap();

        let sources = vec![
            SampleSource::from_path(path),
            SampleSource::from_path(dir.path().join("missing.mzML")),
        ];
        assert!(read_samples(&sources).is_empty());
    }
}
