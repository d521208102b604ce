use anyhow::{Context, Result};
use log::info;
use std::collections::BTreeMap;
use std::path::PathBuf;

use isodetect::detection::DetectionConfig;
use isodetect::reference::{CompoundClass, ReferencePattern, ReferencePeak, ReferenceStore};
use isodetect::report::{aggregate, write_csv_file, AnalysisReport, ReportSummary};
use isodetect::spectrum::{SampleSpectra, Spectrum};
use isodetect::sweep::{analyze_samples, SampleResult};

/// Compound used by the demo run
struct DemoCompound {
    formula: &'static str,
    name: &'static str,
    class: CompoundClass,
    /// (m/z, relative intensity) isotope peaks
    isotopes: &'static [(f64, f64)],
}

const DEMO_COMPOUNDS: &[DemoCompound] = &[
    DemoCompound {
        formula: "C18H35O2",
        name: "Oleic acid",
        class: CompoundClass::Standard,
        isotopes: &[(283.2643, 100.0), (284.2677, 19.9), (285.2710, 2.5)],
    },
    DemoCompound {
        formula: "C16H31O2",
        name: "Palmitic acid",
        class: CompoundClass::Standard,
        isotopes: &[(255.2330, 100.0), (256.2363, 17.7), (257.2397, 2.0)],
    },
    DemoCompound {
        formula: "C24H52PSe",
        name: "TOP-Se",
        class: CompoundClass::HighIntensity,
        isotopes: &[(449.2980, 47.9), (451.2974, 100.0), (452.3008, 26.6)],
    },
    DemoCompound {
        formula: "C20H39O2",
        name: "Arachidic acid",
        class: CompoundClass::Standard,
        isotopes: &[(311.2956, 100.0), (312.2990, 22.1)],
    },
];

/// Apex intensity of each compound in each demo sample; 0 means absent
const SAMPLE_AMPLITUDES: [(&str, &str, [f64; 4]); 3] = [
    ("demo_A", "control", [8.0e4, 2.5e4, 4.0e5, 0.0]),
    ("demo_B", "control", [6.5e4, 3.0e4, 3.5e5, 0.0]),
    ("demo_C", "treated", [1.6e3, 0.0, 1.5e3, 0.0]),
];

/// Relative intensities of the points across one centroid profile
const PROFILE_SHAPE: [(f64, f64); 5] = [(-0.008, 0.2), (-0.004, 0.6), (0.0, 1.0), (0.004, 0.6), (0.008, 0.2)];

/// Run the detection pipeline on generated spectra
pub fn run(output: Option<PathBuf>, scans: u32) -> Result<()> {
    info!("isodetect - Demo Run");
    info!("====================");

    if scans == 0 {
        anyhow::bail!("The demo needs at least one scan per sample");
    }

    let store = build_demo_store().context("Failed to build demo reference patterns")?;
    info!("Reference patterns: {}", store.len());

    let samples = generate_samples(scans)?;
    for sample in &samples {
        info!(
            "Generated {} ({} scans, {} points)",
            sample.name,
            sample.len(),
            sample.spectra().iter().map(|s| s.len()).sum::<usize>()
        );
    }

    let config = DetectionConfig::default();
    let results = analyze_samples(&samples, &store, &config);
    print_detections(&results);

    if let Some(dir) = output {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
        let csv_path = dir.join("compound_detection.csv");
        write_csv_file(&aggregate(&results), &csv_path)
            .with_context(|| format!("Failed to write {}", csv_path.display()))?;
        let json_path = dir.join("compound_detection.json");
        AnalysisReport::new(config, results.clone())
            .write_json_file(&json_path)
            .with_context(|| format!("Failed to write {}", json_path.display()))?;
        info!("Reports written to {}", dir.display());
    }

    let summary = ReportSummary::from_results(&results);
    print!("{}", summary.format_colored());

    Ok(())
}

fn build_demo_store() -> Result<ReferenceStore> {
    let mut store = ReferenceStore::new();
    for compound in DEMO_COMPOUNDS {
        let peaks = compound
            .isotopes
            .iter()
            .map(|&(mz, rel)| ReferencePeak::new(mz, rel))
            .collect();
        let target = compound
            .isotopes
            .iter()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|p| p.0)
            .unwrap_or_default();
        store.insert(
            ReferencePattern::new(compound.formula, compound.name, target, peaks).with_class(compound.class),
        )?;
    }
    Ok(store)
}

fn generate_samples(scans: u32) -> Result<Vec<SampleSpectra>> {
    SAMPLE_AMPLITUDES
        .iter()
        .enumerate()
        .map(|(index, (name, group, amplitudes))| {
            let spectra = (1..=scans)
                .map(|scan| generate_scan(index, scan, scans, amplitudes))
                .collect::<Result<Vec<_>>>()?;
            Ok(SampleSpectra::new(*name, spectra).with_group(*group))
        })
        .collect()
}

/// One MS1 scan: a flat noise floor plus profile peaks for each present compound
fn generate_scan(sample: usize, scan: u32, scans: u32, amplitudes: &[f64; 4]) -> Result<Spectrum> {
    let mut mz = Vec::new();
    let mut intensity = Vec::new();

    for step in 0..600u32 {
        mz.push(200.0 + step as f64 * 0.5);
        intensity.push(30.0 + ((step * 37 + scan * 11) % 90) as f64);
    }

    // Elution apex in the middle of the run, slightly later for each sample
    let apex = scans as f64 * (0.45 + 0.05 * sample as f64);
    let width = (scans as f64 / 6.0).max(1.0);
    let elution = (-0.5 * ((scan as f64 - apex) / width).powi(2)).exp();
    let mass_shift = 0.0004 * (sample as f64 + 1.0);

    for (compound, &amplitude) in DEMO_COMPOUNDS.iter().zip(amplitudes) {
        if amplitude <= 0.0 {
            continue;
        }
        for &(peak_mz, rel) in compound.isotopes {
            let height = amplitude * elution * rel / 100.0;
            for (offset, factor) in PROFILE_SHAPE {
                mz.push(peak_mz + mass_shift + offset);
                intensity.push(height * factor);
            }
        }
    }

    let retention_time = 30.0 + scan as f64 * 2.0;
    Spectrum::new(scan, Some(retention_time), mz, intensity)
        .with_context(|| format!("Failed to build demo scan {}", scan))
}

fn print_detections(results: &BTreeMap<String, SampleResult>) {
    for (name, sample) in results {
        println!("{} ({} of {} compounds)", name, sample.detected_count(), sample.compounds.len());
        for (formula, result) in &sample.compounds {
            match &result.optimal {
                Some(optimal) => println!(
                    "  {:<10} scan {:>3}  m/z {:.4}  intensity {:>10.0}  {:.1} ppm  ({} of {} scans)",
                    formula,
                    optimal.scan,
                    optimal.candidate.mz,
                    optimal.candidate.intensity,
                    optimal.candidate.mass_error_ppm,
                    result.detection_count,
                    result.candidate_count
                ),
                None => println!("  {:<10} {}", formula, result.status),
            }
        }
    }
}
