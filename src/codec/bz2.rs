//! The `bzip2` codec.
//!
//! Applies a single-frame bzip2 stream per chunk.

use std::io::Read;

use derive_more::Display;
use serde::{Deserialize, Serialize};

use super::{Codec, CodecError, CompressionLevel, CompressorTraits};

/// Configuration parameters for the `bzip2` codec.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug, Display)]
#[serde(deny_unknown_fields)]
#[display("{}", serde_json::to_string(self).unwrap_or_default())]
pub struct Bz2CompressorConfiguration {
    /// The compression level.
    pub level: CompressionLevel,
}

/// A `bzip2` codec implementation.
#[derive(Clone, Debug)]
pub struct Bz2Codec {
    compression: bzip2::Compression,
}

impl Bz2Codec {
    /// Create a new `bzip2` codec.
    #[must_use]
    pub fn new(level: CompressionLevel) -> Self {
        Self {
            compression: bzip2::Compression::new(level.as_u32()),
        }
    }

    /// Create a new `bzip2` codec from configuration.
    #[must_use]
    pub fn new_with_configuration(configuration: &Bz2CompressorConfiguration) -> Self {
        Self::new(configuration.level)
    }
}

impl CompressorTraits for Bz2Codec {
    fn codec(&self) -> Codec {
        Codec::Bzip2
    }

    fn identifier(&self) -> &'static str {
        "bzip2"
    }

    fn encode(&self, decoded: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        let mut encoder = bzip2::read::BzEncoder::new(decoded.as_slice(), self.compression);
        let mut out: Vec<u8> = Vec::new();
        encoder.read_to_end(&mut out)?;
        Ok(out)
    }

    fn decode(&self, encoded: Vec<u8>, decoded_size: usize) -> Result<Vec<u8>, CodecError> {
        let mut decoder = bzip2::read::BzDecoder::new(encoded.as_slice());
        let mut out: Vec<u8> = Vec::with_capacity(decoded_size);
        decoder.read_to_end(&mut out)?;
        if out.len() == decoded_size {
            Ok(out)
        } else {
            Err(CodecError::UnexpectedChunkDecodedSize(
                out.len(),
                decoded_size,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON_VALID: &str = r#"{
        "level": 9
    }"#;

    #[test]
    fn codec_bz2_configuration_valid() {
        assert!(serde_json::from_str::<Bz2CompressorConfiguration>(JSON_VALID).is_ok());
    }

    #[test]
    fn codec_bz2_round_trip() {
        let elements: Vec<i64> = (0..32).collect();
        let bytes = bytemuck::cast_slice::<i64, u8>(&elements).to_vec();

        let configuration: Bz2CompressorConfiguration = serde_json::from_str(JSON_VALID).unwrap();
        let codec = Bz2Codec::new_with_configuration(&configuration);

        let encoded = codec.encode(bytes.clone()).unwrap();
        let decoded = codec.decode(encoded, bytes.len()).unwrap();
        assert_eq!(bytes, decoded);
    }
}
