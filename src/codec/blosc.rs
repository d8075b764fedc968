//! The `blosc` codec.
//!
//! Stores each chunk in a [blosc](https://www.blosc.org/) container with a
//! configurable inner compressor, level, shuffle mode, typesize and block
//! size.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use super::{Codec, CodecError, CompressorTraits};

/// The inner compressor of the `blosc` codec.
#[derive(Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Debug, Display)]
#[serde(rename_all = "lowercase")]
pub enum BloscCompressor {
    /// The default blosc compressor.
    #[display("blosclz")]
    BloscLZ,
    /// LZ4.
    #[display("lz4")]
    LZ4,
    /// LZ4 high compression.
    #[display("lz4hc")]
    LZ4HC,
    /// Snappy.
    #[display("snappy")]
    Snappy,
    /// Zlib.
    #[display("zlib")]
    Zlib,
    /// Zstandard.
    #[display("zstd")]
    Zstd,
}

impl From<BloscCompressor> for blosc::Compressor {
    fn from(value: BloscCompressor) -> Self {
        match value {
            BloscCompressor::BloscLZ => blosc::Compressor::BloscLZ,
            BloscCompressor::LZ4 => blosc::Compressor::LZ4,
            BloscCompressor::LZ4HC => blosc::Compressor::LZ4HC,
            BloscCompressor::Snappy => blosc::Compressor::Snappy,
            BloscCompressor::Zlib => blosc::Compressor::Zlib,
            BloscCompressor::Zstd => blosc::Compressor::Zstd,
        }
    }
}

/// A compression level in `[0, 9]`; `0` disables the inner compressor.
#[derive(Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Debug)]
#[serde(try_from = "u32")]
pub struct BloscCompressionLevel(u32);

/// An invalid blosc compression level error.
#[derive(Copy, Clone, Debug, thiserror::Error)]
#[error("blosc compression level {_0} is out of range, must be in [0, 9]")]
pub struct BloscCompressionLevelError(u32);

impl TryFrom<u32> for BloscCompressionLevel {
    type Error = BloscCompressionLevelError;
    fn try_from(level: u32) -> Result<Self, Self::Error> {
        if level <= 9 {
            Ok(Self(level))
        } else {
            Err(BloscCompressionLevelError(level))
        }
    }
}

impl From<BloscCompressionLevel> for blosc::Clevel {
    fn from(value: BloscCompressionLevel) -> Self {
        match value.0 {
            0 => blosc::Clevel::None,
            1 => blosc::Clevel::L1,
            2 => blosc::Clevel::L2,
            3 => blosc::Clevel::L3,
            4 => blosc::Clevel::L4,
            5 => blosc::Clevel::L5,
            6 => blosc::Clevel::L6,
            7 => blosc::Clevel::L7,
            8 => blosc::Clevel::L8,
            _ => blosc::Clevel::L9,
        }
    }
}

/// Blosc shuffle modes, persisted numerically.
#[derive(Serialize_repr, Deserialize_repr, Copy, Clone, Eq, PartialEq, Debug)]
#[repr(u8)]
pub enum BloscShuffleMode {
    /// No shuffling.
    NoShuffle = 0,
    /// Byte-wise shuffling.
    Shuffle = 1,
    /// Bit-wise shuffling.
    BitShuffle = 2,
}

impl From<BloscShuffleMode> for blosc::ShuffleMode {
    fn from(value: BloscShuffleMode) -> Self {
        match value {
            BloscShuffleMode::NoShuffle => blosc::ShuffleMode::None,
            BloscShuffleMode::Shuffle => blosc::ShuffleMode::Byte,
            BloscShuffleMode::BitShuffle => blosc::ShuffleMode::Bit,
        }
    }
}

/// Configuration parameters for the `blosc` codec.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug, Display)]
#[serde(deny_unknown_fields)]
#[display("{}", serde_json::to_string(self).unwrap_or_default())]
pub struct BloscCompressorConfiguration {
    /// The inner compressor.
    pub cname: BloscCompressor,
    /// The compression level.
    pub clevel: BloscCompressionLevel,
    /// The shuffle mode.
    pub shuffle: BloscShuffleMode,
    /// The compression block size. Automatically determined if 0.
    #[serde(default)]
    pub blocksize: usize,
    /// The shuffle typesize. Defaults to the element size of the dataset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typesize: Option<usize>,
}

/// A `blosc` codec implementation.
#[derive(Clone, Debug)]
pub struct BloscCodec {
    configuration: BloscCompressorConfiguration,
    typesize: usize,
}

impl BloscCodec {
    /// Create a new `blosc` codec from configuration.
    ///
    /// `default_typesize` is used for shuffling when the configuration does
    /// not carry a typesize.
    #[must_use]
    pub fn new_with_configuration(
        configuration: &BloscCompressorConfiguration,
        default_typesize: usize,
    ) -> Self {
        let typesize = configuration.typesize.unwrap_or(default_typesize);
        Self {
            configuration: configuration.clone(),
            typesize,
        }
    }
}

impl CompressorTraits for BloscCodec {
    fn codec(&self) -> Codec {
        Codec::Blosc
    }

    fn identifier(&self) -> &'static str {
        "blosc"
    }

    fn encode(&self, decoded: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        let blocksize = if self.configuration.blocksize == 0 {
            None
        } else {
            Some(self.configuration.blocksize)
        };
        let context = blosc::Context::new()
            .compressor(self.configuration.cname.into())
            .map_err(|_| {
                CodecError::from(format!(
                    "blosc compressor {} is not supported",
                    self.configuration.cname
                ))
            })?
            .clevel(self.configuration.clevel.into())
            .shuffle(self.configuration.shuffle.into())
            .typesize(Some(self.typesize))
            .blocksize(blocksize);
        Ok(context.compress(decoded.as_slice()).into())
    }

    fn decode(&self, encoded: Vec<u8>, decoded_size: usize) -> Result<Vec<u8>, CodecError> {
        // NOTE: there is limited validation of blosc encoded data, see
        // https://github.com/Blosc/c-blosc/issues/229
        let out: Vec<u8> = unsafe { blosc::decompress_bytes(encoded.as_slice()) }
            .map_err(|_| CodecError::from("blosc decompression failed"))?;
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
