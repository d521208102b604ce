use anyhow::{Context, Result};
use std::path::PathBuf;

use isodetect::reference::{chemcalc, ClassRules, ReferenceStore};

use super::Config;

/// List the compounds of a chemcalc reference file
pub fn run(file: PathBuf, config: Option<PathBuf>) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {}", file.display());
    }

    let rules = match config {
        Some(path) => Config::from_file(&path)?.classification,
        None => ClassRules::default(),
    };

    let store = chemcalc::load_chemcalc(&file, &rules)
        .with_context(|| format!("Failed to load reference file: {}", file.display()))?;

    print!("{}", render(&file.display().to_string(), &store));
    Ok(())
}

fn render(source: &str, store: &ReferenceStore) -> String {
    let mut out = String::new();
    out.push_str("Reference Patterns\n");
    out.push_str("==================\n");
    out.push_str(&format!("File: {}\n", source));
    out.push_str(&format!("Compounds: {}\n\n", store.len()));

    out.push_str(&format!(
        "  {:<14} {:<28} {:<15} {:>11} {:>11} {:>6}\n",
        "Formula", "Name", "Class", "Target m/z", "Main m/z", "Peaks"
    ));
    for pattern in store.patterns() {
        let main_mz = pattern
            .main_peak()
            .map(|p| format!("{:.4}", p.mz))
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "  {:<14} {:<28} {:<15} {:>11.4} {:>11} {:>6}\n",
            pattern.formula,
            truncate(&pattern.name, 28),
            pattern.class.as_str(),
            pattern.target_mz,
            main_mz,
            pattern.peaks.len()
        ));
    }

    let unavailable: Vec<_> = store.unavailable().collect();
    if !unavailable.is_empty() {
        out.push_str(&format!("\nUnavailable ({}):\n", unavailable.len()));
        for (formula, reason) in unavailable {
            out.push_str(&format!("  {}: {}\n", formula, reason));
        }
    }

    out
}

fn truncate(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        name.to_string()
    } else {
        let kept: String = name.chars().take(width - 3).collect();
        format!("{}...", kept)
    }
}
