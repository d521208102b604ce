use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "colorized_output")]
use console::style;

use crate::sweep::{CompoundStatus, SampleResult};

/// Per-compound totals across all samples
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundSummary {
    /// Compound formula
    pub formula: String,
    /// Samples in which the compound was detected
    pub samples_detected: usize,
    /// Accepted candidates summed over samples
    pub total_detections: usize,
    /// Highest optimal intensity and the sample it came from
    pub best: Option<(String, f64)>,
    /// The compound had no usable reference pattern
    pub unavailable: bool,
}

/// Condensed view of a run for console output
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSummary {
    /// Number of samples analyzed
    pub sample_count: usize,
    /// One entry per compound, sorted by formula
    pub compounds: Vec<CompoundSummary>,
}

impl ReportSummary {
    /// Summarize sample results
    pub fn from_results(results: &BTreeMap<String, SampleResult>) -> Self {
        let mut by_formula: BTreeMap<&str, CompoundSummary> = BTreeMap::new();

        for (sample, result) in results {
            for (formula, compound) in &result.compounds {
                let entry = by_formula.entry(formula.as_str()).or_insert_with(|| CompoundSummary {
                    formula: formula.clone(),
                    samples_detected: 0,
                    total_detections: 0,
                    best: None,
                    unavailable: false,
                });

                entry.unavailable |= compound.status == CompoundStatus::PatternUnavailable;
                entry.total_detections += compound.detection_count;
                if compound.is_detected() {
                    entry.samples_detected += 1;
                }
                if let Some(optimal) = &compound.optimal {
                    let intensity = optimal.candidate.intensity;
                    if entry.best.as_ref().map_or(true, |(_, best)| intensity > *best) {
                        entry.best = Some((sample.clone(), intensity));
                    }
                }
            }
        }

        Self {
            sample_count: results.len(),
            compounds: by_formula.into_values().collect(),
        }
    }

    /// Number of compounds detected in at least one sample
    pub fn detected_compounds(&self) -> usize {
        self.compounds.iter().filter(|c| c.samples_detected > 0).count()
    }

    /// Format the summary with colors (requires console feature)
    pub fn format_colored(&self) -> String {
        #[cfg(feature = "colorized_output")]
        {
            use console::Emoji;

            static FOUND: Emoji<'_, '_> = Emoji("✓", "[+]");
            static MISSING: Emoji<'_, '_> = Emoji("✗", "[-]");
            static SKIPPED: Emoji<'_, '_> = Emoji("⚠", "[!]");

            let mut output = String::new();
            output.push_str(&format!("{}\n", style("Compound Detection Summary").bold().cyan()));
            output.push_str(&format!("{}\n", style("==========================").cyan()));
            output.push_str(&format!("{}: {}\n\n", style("Samples").bold(), self.sample_count));

            for compound in &self.compounds {
                if compound.unavailable {
                    output.push_str(&format!(
                        "[{}] {} - {}\n",
                        SKIPPED,
                        style(&compound.formula).yellow(),
                        style("pattern unavailable").yellow()
                    ));
                } else if compound.samples_detected > 0 {
                    output.push_str(&format!(
                        "[{}] {}: {}/{} samples, {} detections",
                        FOUND,
                        style(&compound.formula).green(),
                        compound.samples_detected,
                        self.sample_count,
                        compound.total_detections
                    ));
                    if let Some((sample, intensity)) = &compound.best {
                        output.push_str(&format!(", best {:.0} in {}", intensity, sample));
                    }
                    output.push('\n');
                } else {
                    output.push_str(&format!(
                        "[{}] {}: not detected\n",
                        MISSING,
                        style(&compound.formula).red()
                    ));
                }
            }

            output.push('\n');
            output.push_str(&format!(
                "{}: {} of {} compounds detected\n",
                style("Summary").bold(),
                style(self.detected_compounds()).green(),
                self.compounds.len()
            ));
            output
        }

        #[cfg(not(feature = "colorized_output"))]
        {
            format!("{}", self)
        }
    }
}

impl fmt::Display for ReportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Compound Detection Summary")?;
        writeln!(f, "==========================")?;
        writeln!(f, "Samples: {}", self.sample_count)?;
        writeln!(f)?;

        for compound in &self.compounds {
            if compound.unavailable {
                writeln!(f, "[⚠] {} - pattern unavailable", compound.formula)?;
            } else if compound.samples_detected > 0 {
                write!(
                    f,
                    "[✓] {}: {}/{} samples, {} detections",
                    compound.formula, compound.samples_detected, self.sample_count, compound.total_detections
                )?;
                if let Some((sample, intensity)) = &compound.best {
                    write!(f, ", best {:.0} in {}", intensity, sample)?;
                }
                writeln!(f)?;
            } else {
                writeln!(f, "[✗] {}: not detected", compound.formula)?;
            }
        }

        writeln!(f)?;
        writeln!(
            f,
            "Summary: {} of {} compounds detected",
            self.detected_compounds(),
            self.compounds.len()
        )
    }
}
