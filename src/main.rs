//! # isodetect
//!
//! Command-line front end for isotope-pattern compound detection.
//!
//! ## Usage
//!
//! ```bash
//! # Analyze a directory of mzML files against a chemcalc reference file
//! isodetect analyze data/ --reference merged_chemcalc.json --output results/
//!
//! # Inspect a reference file
//! isodetect references merged_chemcalc.json
//!
//! # Run the pipeline on generated data
//! isodetect demo
//! ```

use anyhow::Result;
use clap::Parser;

mod cli;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli::init_logging(cli.verbosity());
    cli::dispatch(cli)
}
