//! Single-compound isotope tables in CSV form.
//!
//! The table needs `mz` and `intensity` columns (header names are matched
//! case-insensitively, other columns are ignored):
//!
//! ```text
//! mz,intensity
//! 283.2637,100
//! 284.2670,19.8
//! ```

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use super::{CompoundClass, ReferenceError, ReferencePattern, ReferencePeak};

/// Read a pattern table from a file
pub fn load_pattern_table<P: AsRef<Path>>(
    path: P,
    formula: &str,
    name: &str,
    target_mz: f64,
    class: CompoundClass,
) -> Result<ReferencePattern, ReferenceError> {
    let file = File::open(path)?;
    read_pattern_table(BufReader::new(file), formula, name, target_mz, class)
}

/// Read a pattern table from any reader and check the resulting pattern
pub fn read_pattern_table<R: Read>(
    reader: R,
    formula: &str,
    name: &str,
    target_mz: f64,
    class: CompoundClass,
) -> Result<ReferencePattern, ReferenceError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| ReferenceError::MissingColumn(name.to_string()))
    };
    let mz_col = column("mz")?;
    let intensity_col = column("intensity")?;

    let mut peaks = Vec::new();
    for (i, record) in csv_reader.records().enumerate() {
        let record = record?;
        let field = |col: usize| -> Result<f64, ReferenceError> {
            let raw = record.get(col).unwrap_or_default();
            raw.parse().map_err(|e| ReferenceError::Parse {
                formula: formula.to_string(),
                line: i + 2,
                message: format!("'{}': {}", raw, e),
            })
        };
        peaks.push(ReferencePeak::new(field(mz_col)?, field(intensity_col)?));
    }

    let pattern = ReferencePattern::new(formula, name, target_mz, peaks).with_class(class);
    pattern.check()?;
    Ok(pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_table() {
        let csv = "MZ, Intensity, note\n283.2637,100,mono\n284.2670,19.8,\n";
        let pattern = read_pattern_table(
            csv.as_bytes(),
            "C18H35O2",
            "Oleic acid",
            283.2637,
            CompoundClass::Standard,
        )
        .unwrap();

        assert_eq!(pattern.peaks.len(), 2);
        assert_eq!(pattern.peaks[1], ReferencePeak::new(284.2670, 19.8));
    }

    #[test]
    fn test_missing_column() {
        let csv = "mass,abundance\n1,2\n";
        let err = read_pattern_table(csv.as_bytes(), "X", "X", 1.0, CompoundClass::Standard)
            .unwrap_err();
        assert!(matches!(err, ReferenceError::MissingColumn(c) if c == "mz"));
    }

    #[test]
    fn test_bad_number_reports_line() {
        let csv = "mz,intensity\n100.0,1\n101.0,lots\n";
        let err = read_pattern_table(csv.as_bytes(), "X", "X", 100.0, CompoundClass::Standard)
            .unwrap_err();
        assert!(matches!(err, ReferenceError::Parse { line: 3, .. }));
    }

    #[test]
    fn test_empty_table_is_malformed() {
        let csv = "mz,intensity\n";
        let err = read_pattern_table(csv.as_bytes(), "X", "X", 100.0, CompoundClass::Standard)
            .unwrap_err();
        assert!(matches!(err, ReferenceError::EmptyPattern(_)));
    }
}
