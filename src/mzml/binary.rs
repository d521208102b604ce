//! Binary data array decoding.
//!
//! 1. Base64 decode the text
//! 2. Decompress if needed (zlib)
//! 3. Interpret bytes as little-endian float32 or float64

use std::io::Read;

use base64::prelude::*;
use byteorder::{LittleEndian, ReadBytesExt};
use flate2::read::ZlibDecoder;

use super::cv_params::MS_CV_ACCESSIONS;

/// Compression of a binary array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionType {
    /// No compression
    #[default]
    None,
    /// zlib compression
    Zlib,
    /// Any MS-Numpress scheme (not supported)
    Numpress,
}

impl CompressionType {
    /// Determine compression type from CV accession
    pub fn from_cv_accession(accession: &str) -> Option<Self> {
        match accession {
            MS_CV_ACCESSIONS::ZLIB_COMPRESSION => Some(CompressionType::Zlib),
            MS_CV_ACCESSIONS::NO_COMPRESSION => Some(CompressionType::None),
            MS_CV_ACCESSIONS::NUMPRESS_LINEAR
            | MS_CV_ACCESSIONS::NUMPRESS_PIC
            | MS_CV_ACCESSIONS::NUMPRESS_SLOF => Some(CompressionType::Numpress),
            _ => None,
        }
    }
}

/// Binary encoding precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BinaryEncoding {
    /// 32-bit floating point
    Float32,
    /// 64-bit floating point
    #[default]
    Float64,
}

impl BinaryEncoding {
    /// Determine encoding from CV accession
    pub fn from_cv_accession(accession: &str) -> Option<Self> {
        match accession {
            MS_CV_ACCESSIONS::FLOAT_32_BIT => Some(BinaryEncoding::Float32),
            MS_CV_ACCESSIONS::FLOAT_64_BIT => Some(BinaryEncoding::Float64),
            _ => None,
        }
    }

    /// Get the byte size per value
    pub fn byte_size(&self) -> usize {
        match self {
            BinaryEncoding::Float32 => 4,
            BinaryEncoding::Float64 => 8,
        }
    }
}

/// Errors that can occur during binary decoding
#[derive(Debug, thiserror::Error)]
pub enum BinaryDecodeError {
    /// Invalid Base64 text
    #[error("Base64 decode error: {0}")]
    Base64Error(#[from] base64::DecodeError),

    /// zlib stream could not be inflated
    #[error("Decompression error: {0}")]
    DecompressionError(#[from] std::io::Error),

    /// Decoded value count differs from the declared array length
    #[error("Invalid data length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Declared length
        expected: usize,
        /// Decoded length
        actual: usize,
    },

    /// Byte count is not a multiple of the value size
    #[error("Truncated array: {bytes} bytes is not a multiple of {value_size}")]
    Truncated {
        /// Decoded byte count
        bytes: usize,
        /// Bytes per value
        value_size: usize,
    },

    /// Compression scheme the decoder does not implement
    #[error("Unsupported compression: {0:?}")]
    UnsupportedCompression(CompressionType),
}

/// Decoder for mzML binary data arrays
pub struct BinaryDecoder;

impl BinaryDecoder {
    /// Decode a Base64-encoded array.
    ///
    /// `expected_length` comes from `defaultArrayLength`/`arrayLength`; pass `None`
    /// to skip the length check.
    pub fn decode(
        base64_data: &str,
        encoding: BinaryEncoding,
        compression: CompressionType,
        expected_length: Option<usize>,
    ) -> Result<Vec<f64>, BinaryDecodeError> {
        let trimmed = base64_data.trim();
        if trimmed.is_empty() {
            return match expected_length {
                Some(expected) if expected > 0 => Err(BinaryDecodeError::InvalidLength { expected, actual: 0 }),
                _ => Ok(Vec::new()),
            };
        }

        let decoded_bytes = BASE64_STANDARD.decode(trimmed)?;

        let bytes = match compression {
            CompressionType::None => decoded_bytes,
            CompressionType::Zlib => {
                let mut decoder = ZlibDecoder::new(&decoded_bytes[..]);
                let mut inflated = Vec::new();
                decoder.read_to_end(&mut inflated)?;
                inflated
            }
            CompressionType::Numpress => {
                return Err(BinaryDecodeError::UnsupportedCompression(compression));
            }
        };

        let values = Self::bytes_to_floats(&bytes, encoding)?;

        if let Some(expected) = expected_length {
            if values.len() != expected {
                return Err(BinaryDecodeError::InvalidLength {
                    expected,
                    actual: values.len(),
                });
            }
        }

        Ok(values)
    }

    fn bytes_to_floats(bytes: &[u8], encoding: BinaryEncoding) -> Result<Vec<f64>, BinaryDecodeError> {
        let value_size = encoding.byte_size();
        if bytes.len() % value_size != 0 {
            return Err(BinaryDecodeError::Truncated {
                bytes: bytes.len(),
                value_size,
            });
        }

        let count = bytes.len() / value_size;
        let mut values = Vec::with_capacity(count);
        let mut cursor = std::io::Cursor::new(bytes);

        match encoding {
            BinaryEncoding::Float32 => {
                for _ in 0..count {
                    values.push(cursor.read_f32::<LittleEndian>()? as f64);
                }
            }
            BinaryEncoding::Float64 => {
                for _ in 0..count {
                    values.push(cursor.read_f64::<LittleEndian>()?);
                }
            }
        }

        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_f64(values: &[f64]) -> String {
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        BASE64_STANDARD.encode(bytes)
    }

    #[test]
    fn test_decode_float64() {
        let data = encode_f64(&[100.0, 200.0]);
        let values = BinaryDecoder::decode(&data, BinaryEncoding::Float64, CompressionType::None, Some(2)).unwrap();
        assert_eq!(values, vec![100.0, 200.0]);
    }

    #[test]
    fn test_decode_float32() {
        let bytes: Vec<u8> = [283.25f32, 1200.0f32].iter().flat_map(|v| v.to_le_bytes()).collect();
        let data = BASE64_STANDARD.encode(bytes);
        let values = BinaryDecoder::decode(&data, BinaryEncoding::Float32, CompressionType::None, None).unwrap();
        assert_eq!(values, vec![283.25, 1200.0]);
    }

    #[test]
    fn test_decode_zlib() {
        use flate2::write::ZlibEncoder;
        use flate2::Compression;
        use std::io::Write;

        let values = [282.0, 283.26, 283.27, 284.0];
        let bytes: Vec<u8> = values.iter().flat_map(|v: &f64| v.to_le_bytes()).collect();
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&bytes).unwrap();
        let data = BASE64_STANDARD.encode(encoder.finish().unwrap());

        let decoded = BinaryDecoder::decode(&data, BinaryEncoding::Float64, CompressionType::Zlib, Some(4)).unwrap();
        assert_eq!(decoded, values.to_vec());
    }

    #[test]
    fn test_length_mismatch() {
        let data = encode_f64(&[1.0, 2.0, 3.0]);
        let err = BinaryDecoder::decode(&data, BinaryEncoding::Float64, CompressionType::None, Some(2)).unwrap_err();
        assert!(matches!(err, BinaryDecodeError::InvalidLength { expected: 2, actual: 3 }));
    }

    #[test]
    fn test_empty_array() {
        assert!(BinaryDecoder::decode("", BinaryEncoding::Float64, CompressionType::None, None)
            .unwrap()
            .is_empty());
        assert!(BinaryDecoder::decode(" ", BinaryEncoding::Float64, CompressionType::None, Some(3)).is_err());
    }

    #[test]
    fn test_numpress_unsupported() {
        let data = encode_f64(&[1.0]);
        let err = BinaryDecoder::decode(&data, BinaryEncoding::Float64, CompressionType::Numpress, None).unwrap_err();
        assert!(matches!(err, BinaryDecodeError::UnsupportedCompression(CompressionType::Numpress)));
        assert_eq!(
            CompressionType::from_cv_accession("MS:1002314"),
            Some(CompressionType::Numpress)
        );
    }
}
