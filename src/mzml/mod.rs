//! # mzML Spectrum Source
//!
//! Streaming reader for mzML files, the XML-based community standard for mass
//! spectrometry data defined by HUPO-PSI. Only what the detection pipeline needs
//! is extracted: MS level, scan start time and the m/z and intensity arrays.
//!
//! ## mzML Structure
//!
//! ```text
//! mzML
//! └── run
//!     └── spectrumList
//!         └── spectrum* (id="... scan=N")
//!             ├── cvParam (ms level)
//!             ├── scanList/scan/cvParam (scan start time)
//!             └── binaryDataArrayList
//!                 └── binaryDataArray*
//!                     ├── cvParam* (array kind, precision, compression)
//!                     └── binary (base64 data)
//! ```

mod binary;
mod cv_params;
mod streamer;

pub use binary::{BinaryDecodeError, BinaryDecoder, BinaryEncoding, CompressionType};
pub use cv_params::{normalize_retention_time, parse_scan_number, CvParam, MS_CV_ACCESSIONS};
pub use streamer::{read_sample, read_sample_from, MzMLError, MzMLSpectrum, MzMLStreamer, SpectrumIterator};
