use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ReportError, ReportRow};
use crate::detection::DetectionConfig;
use crate::sweep::SampleResult;

const CELL_COLUMNS: [&str; 9] = [
    "detected",
    "optimal_scan",
    "optimal_rt",
    "optimal_mz",
    "optimal_intensity",
    "mass_error_ppm",
    "validation_matches",
    "validation_score",
    "total_detections",
];

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Write rows as a wide CSV table.
///
/// Columns are `Sample`, `Sample_Group`, then for every compound
/// `{formula}_detected`, `{formula}_optimal_scan`, `{formula}_optimal_rt`,
/// `{formula}_optimal_mz`, `{formula}_optimal_intensity`,
/// `{formula}_mass_error_ppm`, `{formula}_validation_matches`,
/// `{formula}_validation_score` and `{formula}_total_detections`. Absent values
/// are empty fields.
pub fn write_csv<W: Write>(rows: &[ReportRow], writer: W) -> Result<(), ReportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header = vec!["Sample".to_string(), "Sample_Group".to_string()];
    if let Some(first) = rows.first() {
        for cell in &first.compounds {
            header.extend(CELL_COLUMNS.iter().map(|c| format!("{}_{}", cell.formula, c)));
        }
    }
    csv_writer.write_record(&header)?;

    let expected = rows.first().map_or(0, |r| r.compounds.len());
    for row in rows {
        if row.compounds.len() != expected {
            return Err(ReportError::RaggedRows {
                sample: row.sample.clone(),
                expected,
                found: row.compounds.len(),
            });
        }

        let mut record = vec![row.sample.clone(), row.group.clone().unwrap_or_default()];
        for cell in &row.compounds {
            record.push(cell.detected.to_string());
            record.push(opt(cell.scan));
            record.push(opt(cell.retention_time));
            record.push(opt(cell.mz));
            record.push(opt(cell.intensity));
            record.push(opt(cell.mass_error_ppm));
            record.push(cell.match_count.to_string());
            record.push(opt(cell.confidence));
            record.push(cell.detection_count.to_string());
        }
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Write rows as CSV to a file
pub fn write_csv_file<P: AsRef<Path>>(rows: &[ReportRow], path: P) -> Result<(), ReportError> {
    let file = File::create(path)?;
    write_csv(rows, BufWriter::new(file))
}

/// Full results of a run, as written to JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Creation time of the report
    pub generated_at: DateTime<Utc>,
    /// Version of the tool that produced the report
    pub tool_version: String,
    /// Detection parameters used
    pub config: DetectionConfig,
    /// Results keyed by sample name
    pub samples: BTreeMap<String, SampleResult>,
}

impl AnalysisReport {
    /// Wrap results with the current time and crate version
    pub fn new(config: DetectionConfig, samples: BTreeMap<String, SampleResult>) -> Self {
        Self {
            generated_at: Utc::now(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            config,
            samples,
        }
    }

    /// Serialize as pretty JSON
    pub fn write_json<W: Write>(&self, writer: W) -> Result<(), ReportError> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Serialize as pretty JSON to a file
    pub fn write_json_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ReportError> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_json(&mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::aggregate;
    use crate::report::tests::results;

    #[test]
    fn test_csv_layout() {
        let rows = aggregate(&results());
        let mut out = Vec::new();
        write_csv(&rows, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        let header: Vec<&str> = lines[0].split(',').collect();
        assert_eq!(header.len(), 2 + 2 * CELL_COLUMNS.len());
        assert_eq!(&header[..4], &["Sample", "Sample_Group", "C18H35O2_detected", "C18H35O2_optimal_scan"]);
        assert_eq!(header[11], "C24H52PSe_detected");

        assert!(lines[1].starts_with("S1,batch-1,true,12,24,283.264,4200,1.06,1,1,3,false,,"));
        assert!(lines[2].starts_with("S2,,false,,,,,,0,,0,"));
    }

    #[test]
    fn test_csv_header_only_without_rows() {
        let mut out = Vec::new();
        write_csv(&[], &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Sample,Sample_Group\n");
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let mut rows = aggregate(&results());
        rows[1].compounds.pop();
        let err = write_csv(&rows, Vec::new()).unwrap_err();
        assert!(matches!(err, ReportError::RaggedRows { expected: 2, found: 1, .. }));
    }

    #[test]
    fn test_json_report() {
        let report = AnalysisReport::new(DetectionConfig::default(), results());
        let mut out = Vec::new();
        report.write_json(&mut out).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["tool_version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(value["config"]["max_mass_error_ppm"], 300.0);
        assert_eq!(value["samples"]["S1"]["compounds"]["C18H35O2"]["status"], "detected");
        assert_eq!(
            value["samples"]["S1"]["compounds"]["C18H35O2"]["optimal"]["candidate"]["mode"],
            "simple_max"
        );

        let parsed: AnalysisReport = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed.samples.len(), 2);
        let optimal = parsed.samples["S1"].compounds["C18H35O2"].optimal.as_ref().unwrap();
        assert_eq!(optimal.scan, 12);
    }
}
