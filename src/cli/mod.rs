use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[cfg(feature = "mzml")]
mod analyze;
mod demo;
mod references;

mod config;

pub use config::Config;

/// isodetect - Isotope-Pattern Compound Detection
#[derive(Parser)]
#[command(name = "isodetect")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Detection settings that can be overridden from the command line.
#[derive(Debug, Default, Clone, clap::Args)]
pub struct DetectionOverrides {
    /// Search half-window around each target m/z (Da)
    #[arg(long, value_name = "DA")]
    pub mz_tolerance: Option<f64>,

    /// Reject candidates at or above this mass error (ppm)
    #[arg(long, value_name = "PPM")]
    pub max_ppm: Option<f64>,

    /// Isotope matching tolerance (Da)
    #[arg(long, value_name = "DA")]
    pub validation_tolerance: Option<f64>,
}

impl DetectionOverrides {
    /// Apply the set flags on top of a configuration.
    pub fn apply(&self, config: &mut isodetect::detection::DetectionConfig) {
        if let Some(tol) = self.mz_tolerance {
            config.mz_tolerance = tol;
        }
        if let Some(ppm) = self.max_ppm {
            config.max_mass_error_ppm = ppm;
        }
        if let Some(tol) = self.validation_tolerance {
            config.validation_tolerance = tol;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Detect reference compounds in mzML files
    #[cfg(feature = "mzml")]
    Analyze {
        /// mzML files or directories containing them
        #[arg(value_name = "INPUT")]
        inputs: Vec<PathBuf>,

        /// Chemcalc reference JSON
        #[arg(short = 'r', long, value_name = "FILE")]
        reference: Option<PathBuf>,

        /// Load settings from a TOML config file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Output directory for the CSV and JSON reports
        #[arg(short = 'o', long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Only write the CSV report
        #[arg(long)]
        no_json: bool,

        #[command(flatten)]
        overrides: DetectionOverrides,
    },

    /// List the compounds of a reference file
    References {
        /// Chemcalc reference JSON
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Load classification rules from a TOML config file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Run the detection pipeline on generated spectra
    Demo {
        /// Also write the reports to this directory
        #[arg(short = 'o', long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Scans per generated sample
        #[arg(long, default_value = "40")]
        scans: u32,
    },
}

impl Cli {
    /// Verbosity level from the number of `-v` flags
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

/// Initialize env_logger; `RUST_LOG` wins over the verbosity level
pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

/// Run the selected subcommand
pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        #[cfg(feature = "mzml")]
        Commands::Analyze {
            inputs,
            reference,
            config,
            output,
            no_json,
            overrides,
        } => analyze::run(inputs, reference, config, output, no_json, overrides),
        Commands::References { file, config } => references::run(file, config),
        Commands::Demo { output, scans } => demo::run(output, scans),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isodetect::detection::DetectionConfig;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_references() {
        let cli = Cli::try_parse_from(["isodetect", "-vv", "references", "ref.json"]).unwrap();
        assert_eq!(cli.verbosity(), 2);
        assert!(matches!(cli.command, Commands::References { .. }));
    }

    #[cfg(feature = "mzml")]
    #[test]
    fn test_parse_analyze() {
        let cli = Cli::try_parse_from([
            "isodetect",
            "analyze",
            "a.mzML",
            "data/",
            "--reference",
            "ref.json",
            "--max-ppm",
            "150",
            "--validation-tolerance",
            "0.01",
            "--no-json",
        ])
        .unwrap();

        match cli.command {
            Commands::Analyze {
                inputs,
                reference,
                no_json,
                overrides,
                ..
            } => {
                assert_eq!(inputs.len(), 2);
                assert_eq!(reference, Some(PathBuf::from("ref.json")));
                assert!(no_json);
                assert_eq!(overrides.max_ppm, Some(150.0));
                assert_eq!(overrides.mz_tolerance, None);
                assert_eq!(overrides.validation_tolerance, Some(0.01));
            }
            _ => panic!("expected analyze"),
        }
    }

    #[cfg(feature = "mzml")]
    #[test]
    fn test_override_flags_are_listed_in_help() {
        use clap::CommandFactory;
        let mut command = Cli::command();
        let analyze = command.find_subcommand_mut("analyze").unwrap();
        for id in ["mz_tolerance", "max_ppm", "validation_tolerance"] {
            let arg = analyze.get_arguments().find(|a| a.get_id() == id).unwrap();
            assert!(!arg.is_hide_set(), "{} is hidden", id);
        }
        let help = analyze.render_help().to_string();
        assert!(help.contains("--validation-tolerance"));
    }

    #[test]
    fn test_overrides_apply() {
        let mut config = DetectionConfig::default();
        DetectionOverrides {
            mz_tolerance: Some(0.2),
            max_ppm: None,
            validation_tolerance: Some(0.01),
        }
        .apply(&mut config);

        assert_eq!(config.mz_tolerance, 0.2);
        assert_eq!(config.max_mass_error_ppm, 300.0);
        assert_eq!(config.validation_tolerance, 0.01);
    }
}
