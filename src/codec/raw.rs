//! The `raw` codec.
//!
//! The identity codec; chunk bytes are stored as-is.

use super::{Codec, CodecError, CompressorTraits};

/// A `raw` codec implementation.
#[derive(Clone, Debug, Default)]
pub struct RawCodec;

impl RawCodec {
    /// Create a new `raw` codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl CompressorTraits for RawCodec {
    fn codec(&self) -> Codec {
        Codec::Raw
    }

    fn identifier(&self) -> &'static str {
        "raw"
    }

    fn encode(&self, decoded: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        Ok(decoded)
    }

    fn decode(&self, encoded: Vec<u8>, decoded_size: usize) -> Result<Vec<u8>, CodecError> {
        if encoded.len() == decoded_size {
            Ok(encoded)
        } else {
            Err(CodecError::UnexpectedChunkDecodedSize(
                encoded.len(),
                decoded_size,
            ))
        }
    }
}
