//! Controlled vocabulary terms the spectrum reader understands.

/// A `<cvParam>` reduced to the fields the reader uses
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CvParam {
    /// Accession (e.g. `MS:1000511`)
    pub accession: String,
    /// Optional value
    pub value: Option<String>,
    /// Unit accession (e.g. `UO:0000031`)
    pub unit_accession: Option<String>,
}

impl CvParam {
    /// Get the value as f64 if possible
    pub fn value_as_f64(&self) -> Option<f64> {
        self.value.as_ref()?.trim().parse().ok()
    }

    /// Get the value as u8 if possible
    pub fn value_as_u8(&self) -> Option<u8> {
        self.value.as_ref()?.trim().parse().ok()
    }
}

/// PSI-MS and unit ontology accessions
#[allow(non_snake_case)]
pub mod MS_CV_ACCESSIONS {
    /// MS level
    pub const MS_LEVEL: &str = "MS:1000511";

    /// Scan start time (retention time)
    pub const SCAN_START_TIME: &str = "MS:1000016";

    /// 32-bit float
    pub const FLOAT_32_BIT: &str = "MS:1000521";

    /// 64-bit float
    pub const FLOAT_64_BIT: &str = "MS:1000523";

    /// zlib compression
    pub const ZLIB_COMPRESSION: &str = "MS:1000574";

    /// No compression
    pub const NO_COMPRESSION: &str = "MS:1000576";

    /// MS-Numpress linear prediction
    pub const NUMPRESS_LINEAR: &str = "MS:1002312";

    /// MS-Numpress positive integer
    pub const NUMPRESS_PIC: &str = "MS:1002313";

    /// MS-Numpress short logged float
    pub const NUMPRESS_SLOF: &str = "MS:1002314";

    /// m/z array
    pub const MZ_ARRAY: &str = "MS:1000514";

    /// Intensity array
    pub const INTENSITY_ARRAY: &str = "MS:1000515";

    /// Second
    pub const UNIT_SECOND: &str = "UO:0000010";

    /// Minute
    pub const UNIT_MINUTE: &str = "UO:0000031";

    /// Millisecond
    pub const UNIT_MILLISECOND: &str = "UO:0000028";
}

/// Convert a retention time to seconds based on its unit accession
pub fn normalize_retention_time(value: f64, unit_accession: Option<&str>) -> f64 {
    match unit_accession {
        Some(MS_CV_ACCESSIONS::UNIT_MINUTE) => value * 60.0,
        Some(MS_CV_ACCESSIONS::UNIT_MILLISECOND) => value / 1000.0,
        _ => value, // Default to seconds
    }
}

/// Scan number from a native spectrum id.
///
/// Understands `... scan=123 ...`, `S123` and bare integers. Returns `None` for
/// anything else and for scan 0.
pub fn parse_scan_number(id: &str) -> Option<u32> {
    let id = id.trim();
    let scan = if let Some(pos) = id.find("scan=") {
        let digits: String = id[pos + 5..].chars().take_while(char::is_ascii_digit).collect();
        digits.parse().ok()
    } else if let Some(rest) = id.strip_prefix('S') {
        rest.parse().ok()
    } else {
        id.parse().ok()
    };
    scan.filter(|&n| n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retention_time_units() {
        assert_eq!(normalize_retention_time(1.5, Some("UO:0000031")), 90.0);
        assert_eq!(normalize_retention_time(1500.0, Some("UO:0000028")), 1.5);
        assert_eq!(normalize_retention_time(42.0, Some("UO:0000010")), 42.0);
        assert_eq!(normalize_retention_time(42.0, None), 42.0);
    }

    #[test]
    fn test_scan_numbers() {
        assert_eq!(parse_scan_number("scan=12"), Some(12));
        assert_eq!(parse_scan_number("controllerType=0 controllerNumber=1 scan=345"), Some(345));
        assert_eq!(parse_scan_number("S77"), Some(77));
        assert_eq!(parse_scan_number("9"), Some(9));
        assert_eq!(parse_scan_number("scan=0"), None);
        assert_eq!(parse_scan_number("index=4"), None);
        assert_eq!(parse_scan_number(""), None);
    }

    #[test]
    fn test_cv_param_values() {
        let param = CvParam {
            accession: MS_CV_ACCESSIONS::MS_LEVEL.to_string(),
            value: Some("1".to_string()),
            unit_accession: None,
        };
        assert_eq!(param.value_as_u8(), Some(1));
        assert_eq!(param.value_as_f64(), Some(1.0));
    }
}
