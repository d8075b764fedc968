//! The `zlib` codec.
//!
//! Applies a single-frame zlib (deflate) stream per chunk.

use std::io::Read;

use derive_more::Display;
use serde::{Deserialize, Serialize};

use super::{Codec, CodecError, CompressionLevel, CompressorTraits};

/// Configuration parameters for the `zlib` codec.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug, Display)]
#[serde(deny_unknown_fields)]
#[display("{}", serde_json::to_string(self).unwrap_or_default())]
pub struct ZlibCompressorConfiguration {
    /// The compression level.
    pub level: CompressionLevel,
}

/// A `zlib` codec implementation.
#[derive(Clone, Debug)]
pub struct ZlibCodec {
    compression: flate2::Compression,
}

impl ZlibCodec {
    /// Create a new `zlib` codec.
    #[must_use]
    pub fn new(level: CompressionLevel) -> Self {
        Self {
            compression: flate2::Compression::new(level.as_u32()),
        }
    }

    /// Create a new `zlib` codec from configuration.
    #[must_use]
    pub fn new_with_configuration(configuration: &ZlibCompressorConfiguration) -> Self {
        Self::new(configuration.level)
    }
}

impl CompressorTraits for ZlibCodec {
    fn codec(&self) -> Codec {
        Codec::Zlib
    }

    fn identifier(&self) -> &'static str {
        "zlib"
    }

    fn encode(&self, decoded: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        let mut encoder = flate2::bufread::ZlibEncoder::new(decoded.as_slice(), self.compression);
        let mut out: Vec<u8> = Vec::new();
        encoder.read_to_end(&mut out)?;
        Ok(out)
    }

    fn decode(&self, encoded: Vec<u8>, decoded_size: usize) -> Result<Vec<u8>, CodecError> {
        let mut decoder = flate2::bufread::ZlibDecoder::new(encoded.as_slice());
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
