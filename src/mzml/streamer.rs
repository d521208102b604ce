//! Pull parser over the `<spectrum>` elements of an mzML document.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::{debug, info, warn};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::binary::{BinaryDecodeError, BinaryDecoder, BinaryEncoding, CompressionType};
use super::cv_params::{normalize_retention_time, parse_scan_number, CvParam, MS_CV_ACCESSIONS};
use crate::spectrum::{SampleSpectra, Spectrum};

/// Errors that can occur during mzML parsing
#[derive(Debug, thiserror::Error)]
pub enum MzMLError {
    /// Error parsing XML
    #[error("XML parsing error: {0}")]
    XmlError(#[from] quick_xml::Error),

    /// I/O error during file operations
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error decoding binary data arrays
    #[error("Binary decode error in spectrum {id}: {source}")]
    BinaryError {
        /// Native id of the spectrum
        id: String,
        /// Underlying decode error
        #[source]
        source: BinaryDecodeError,
    },

    /// Invalid mzML document structure
    #[error("Invalid mzML structure: {0}")]
    InvalidStructure(String),

    /// UTF-8 encoding error in text content
    #[error("UTF-8 encoding error: {0}")]
    Utf8Error(#[from] std::str::Utf8Error),
}

/// One decoded `<spectrum>` element
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MzMLSpectrum {
    /// Position in the spectrum list
    pub index: usize,
    /// Native id (e.g. `controllerType=0 controllerNumber=1 scan=12`)
    pub id: String,
    /// MS level, when present
    pub ms_level: Option<u8>,
    /// Scan start time in seconds
    pub retention_time: Option<f64>,
    /// m/z array
    pub mz: Vec<f64>,
    /// Intensity array
    pub intensity: Vec<f64>,
}

impl MzMLSpectrum {
    /// Scan number from the native id
    pub fn scan_number(&self) -> Option<u32> {
        parse_scan_number(&self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ArrayKind {
    Mz,
    Intensity,
    Other,
}

#[derive(Debug)]
struct BinaryArrayContext {
    kind: ArrayKind,
    encoding: BinaryEncoding,
    compression: CompressionType,
    array_length: Option<usize>,
    base64_data: String,
}

impl BinaryArrayContext {
    fn new(array_length: Option<usize>) -> Self {
        Self {
            kind: ArrayKind::Other,
            encoding: BinaryEncoding::default(),
            compression: CompressionType::default(),
            array_length,
            base64_data: String::new(),
        }
    }

    fn apply(&mut self, param: &CvParam) {
        let accession = param.accession.as_str();
        if let Some(encoding) = BinaryEncoding::from_cv_accession(accession) {
            self.encoding = encoding;
        } else if let Some(compression) = CompressionType::from_cv_accession(accession) {
            self.compression = compression;
        } else if accession == MS_CV_ACCESSIONS::MZ_ARRAY {
            self.kind = ArrayKind::Mz;
        } else if accession == MS_CV_ACCESSIONS::INTENSITY_ARRAY {
            self.kind = ArrayKind::Intensity;
        }
    }
}

/// Streaming parser for mzML files
pub struct MzMLStreamer<R: BufRead> {
    reader: Reader<R>,
    spectrum_index: usize,
    finished: bool,
}

impl MzMLStreamer<BufReader<File>> {
    /// Open a file for streaming
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, MzMLError> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> MzMLStreamer<R> {
    /// Create a new streamer from a BufRead source
    pub fn new(reader: R) -> Self {
        let mut xml_reader = Reader::from_reader(reader);
        xml_reader.config_mut().trim_text(true);

        Self {
            reader: xml_reader,
            spectrum_index: 0,
            finished: false,
        }
    }

    /// Read the next spectrum from the stream
    pub fn next_spectrum(&mut self) -> Result<Option<MzMLSpectrum>, MzMLError> {
        if self.finished {
            return Ok(None);
        }

        let mut buf = Vec::new();
        loop {
            match self.reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    if e.name().as_ref() == b"spectrum" {
                        let start = e.into_owned();
                        let spectrum = self.parse_spectrum(&start)?;
                        self.spectrum_index += 1;
                        return Ok(Some(spectrum));
                    }
                }
                Ok(Event::End(ref e)) => {
                    if e.name().as_ref() == b"spectrumList" {
                        self.finished = true;
                        return Ok(None);
                    }
                }
                Ok(Event::Eof) => {
                    self.finished = true;
                    return Ok(None);
                }
                Err(e) => return Err(MzMLError::XmlError(e)),
                _ => {}
            }
            buf.clear();
        }
    }

    /// Iterate over all spectra
    pub fn spectra(self) -> SpectrumIterator<R> {
        SpectrumIterator { streamer: self }
    }

    fn parse_spectrum(&mut self, start_event: &BytesStart) -> Result<MzMLSpectrum, MzMLError> {
        let mut spectrum = MzMLSpectrum {
            index: get_attribute(start_event, "index")?
                .and_then(|s| s.parse().ok())
                .unwrap_or(self.spectrum_index),
            id: get_attribute(start_event, "id")?.unwrap_or_default(),
            ..MzMLSpectrum::default()
        };
        let default_array_length: Option<usize> = get_attribute(start_event, "defaultArrayLength")?
            .and_then(|s| s.parse().ok())
            .filter(|&n| n > 0);

        let mut depth = 1;
        let mut in_precursor_list = false;
        let mut in_binary = false;
        let mut current_array: Option<BinaryArrayContext> = None;
        let mut buf = Vec::new();

        loop {
            match self.reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => {
                    depth += 1;
                    match e.name().as_ref() {
                        b"cvParam" => {
                            let param = parse_cv_param(e)?;
                            Self::apply_cv_param(&mut spectrum, current_array.as_mut(), in_precursor_list, &param);
                        }
                        b"precursorList" => in_precursor_list = true,
                        b"binaryDataArray" => {
                            let length = get_attribute(e, "arrayLength")?
                                .and_then(|s| s.parse().ok())
                                .or(default_array_length);
                            current_array = Some(BinaryArrayContext::new(length));
                        }
                        b"binary" => in_binary = true,
                        _ => {}
                    }
                }
                Ok(Event::Empty(ref e)) => {
                    if e.name().as_ref() == b"cvParam" {
                        let param = parse_cv_param(e)?;
                        Self::apply_cv_param(&mut spectrum, current_array.as_mut(), in_precursor_list, &param);
                    }
                }
                Ok(Event::Text(ref t)) => {
                    if in_binary {
                        if let Some(ctx) = current_array.as_mut() {
                            ctx.base64_data.push_str(&t.unescape()?);
                        }
                    }
                }
                Ok(Event::End(ref e)) => {
                    depth -= 1;
                    match e.name().as_ref() {
                        b"spectrum" if depth == 0 => break,
                        b"precursorList" => in_precursor_list = false,
                        b"binary" => in_binary = false,
                        b"binaryDataArray" => {
                            if let Some(ctx) = current_array.take() {
                                Self::decode_array(&mut spectrum, ctx)?;
                            }
                        }
                        _ => {}
                    }
                }
                Ok(Event::Eof) => {
                    return Err(MzMLError::InvalidStructure(format!(
                        "Unexpected EOF in spectrum {}",
                        spectrum.id
                    )));
                }
                Err(e) => return Err(MzMLError::XmlError(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(spectrum)
    }

    fn apply_cv_param(
        spectrum: &mut MzMLSpectrum,
        array: Option<&mut BinaryArrayContext>,
        in_precursor_list: bool,
        param: &CvParam,
    ) {
        if let Some(ctx) = array {
            ctx.apply(param);
            return;
        }
        if in_precursor_list {
            return;
        }
        match param.accession.as_str() {
            MS_CV_ACCESSIONS::MS_LEVEL => spectrum.ms_level = param.value_as_u8(),
            MS_CV_ACCESSIONS::SCAN_START_TIME => {
                spectrum.retention_time = param
                    .value_as_f64()
                    .map(|rt| normalize_retention_time(rt, param.unit_accession.as_deref()));
            }
            _ => {}
        }
    }

    fn decode_array(spectrum: &mut MzMLSpectrum, ctx: BinaryArrayContext) -> Result<(), MzMLError> {
        if ctx.kind == ArrayKind::Other {
            return Ok(());
        }
        let values = BinaryDecoder::decode(&ctx.base64_data, ctx.encoding, ctx.compression, ctx.array_length)
            .map_err(|source| MzMLError::BinaryError {
                id: spectrum.id.clone(),
                source,
            })?;
        match ctx.kind {
            ArrayKind::Mz => spectrum.mz = values,
            ArrayKind::Intensity => spectrum.intensity = values,
            ArrayKind::Other => {}
        }
        Ok(())
    }
}

/// Iterator over spectra
pub struct SpectrumIterator<R: BufRead> {
    streamer: MzMLStreamer<R>,
}

impl<R: BufRead> Iterator for SpectrumIterator<R> {
    type Item = Result<MzMLSpectrum, MzMLError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.streamer.next_spectrum() {
            Ok(Some(spectrum)) => Some(Ok(spectrum)),
            Ok(None) => None,
            Err(e) => {
                // A parse error leaves the reader mid-element; stop here
                self.streamer.finished = true;
                Some(Err(e))
            }
        }
    }
}

/// Read the MS1 spectra of one sample from a file
pub fn read_sample<P: AsRef<Path>>(path: P, name: &str) -> Result<SampleSpectra, MzMLError> {
    let path = path.as_ref();
    info!("Reading {} from {}", name, path.display());
    read_sample_from(MzMLStreamer::open(path)?, name)
}

/// Read the MS1 spectra of one sample from any streamer.
///
/// Spectra of other MS levels, spectra without a positive scan number and spectra
/// whose arrays fail [`Spectrum::new`] are skipped; XML and decoding errors abort.
pub fn read_sample_from<R: BufRead>(streamer: MzMLStreamer<R>, name: &str) -> Result<SampleSpectra, MzMLError> {
    let mut spectra = Vec::new();
    let mut skipped_level = 0usize;
    let mut skipped_scan = 0usize;

    for raw in streamer.spectra() {
        let raw = raw?;
        if raw.ms_level != Some(1) {
            skipped_level += 1;
            continue;
        }
        let Some(scan) = raw.scan_number() else {
            debug!("Skipping spectrum '{}' without a scan number", raw.id);
            skipped_scan += 1;
            continue;
        };
        match Spectrum::new(scan, raw.retention_time, raw.mz, raw.intensity) {
            Ok(spectrum) => spectra.push(spectrum),
            Err(e) => warn!("Skipping spectrum '{}' in {}: {}", raw.id, name, e),
        }
    }

    info!(
        "{}: {} MS1 spectra ({} other MS levels, {} without scan number)",
        name,
        spectra.len(),
        skipped_level,
        skipped_scan
    );
    Ok(SampleSpectra::new(name, spectra))
}

/// Get an attribute value from an XML element
fn get_attribute(e: &BytesStart, name: &str) -> Result<Option<String>, MzMLError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|e| MzMLError::XmlError(quick_xml::Error::from(e)))?;
        if attr.key.as_ref() == name.as_bytes() {
            let value = std::str::from_utf8(&attr.value)?.to_string();
            return Ok(Some(value));
        }
    }
    Ok(None)
}

/// Parse a cvParam element
fn parse_cv_param(e: &BytesStart) -> Result<CvParam, MzMLError> {
    Ok(CvParam {
        accession: get_attribute(e, "accession")?.unwrap_or_default(),
        value: get_attribute(e, "value")?,
        unit_accession: get_attribute(e, "unitAccession")?,
    })
}
