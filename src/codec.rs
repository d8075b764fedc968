//! Chunk compression codecs.
//!
//! A codec losslessly transforms the raw byte buffer of one chunk. The
//! dataset engine owns a single boxed [`CompressorTraits`] selected at
//! construction from the compressor configuration in the dataset metadata;
//! the configuration is immutable for the engine's lifetime.
//!
//! The `raw` codec is always available. The `zlib`, `bzip2` and `blosc`
//! codecs are gated behind crate features of the same name.

#[cfg(feature = "blosc")]
pub mod blosc;
#[cfg(feature = "bzip2")]
pub mod bz2;
pub mod raw;
#[cfg(feature = "zlib")]
pub mod zlib;

use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data_type::DataType;

#[cfg(feature = "blosc")]
pub use self::blosc::{BloscCodec, BloscCompressorConfiguration};
#[cfg(feature = "bzip2")]
pub use self::bz2::{Bz2Codec, Bz2CompressorConfiguration};
pub use self::raw::RawCodec;
#[cfg(feature = "zlib")]
pub use self::zlib::{ZlibCodec, ZlibCompressorConfiguration};

/// A codec tag.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Display)]
pub enum Codec {
    /// The identity codec.
    #[display("raw")]
    Raw,
    /// A zlib (deflate) stream.
    #[display("zlib")]
    Zlib,
    /// A bzip2 stream.
    #[display("bzip2")]
    Bzip2,
    /// A blosc container.
    #[display("blosc")]
    Blosc,
}

/// A codec error.
#[derive(Debug, Error)]
pub enum CodecError {
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// The decoded size of a chunk did not match what was expected.
    #[error("the size of a decoded chunk is {_0}, expected {_1}")]
    UnexpectedChunkDecodedSize(usize, usize),
    /// Other.
    #[error("{_0}")]
    Other(String),
}

impl From<&str> for CodecError {
    fn from(err: &str) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<String> for CodecError {
    fn from(err: String) -> Self {
        Self::Other(err)
    }
}

/// A compression level in `[1, 9]`.
#[derive(Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Debug)]
#[serde(try_from = "u32")]
pub struct CompressionLevel(u32);

/// An invalid compression level error.
#[derive(Copy, Clone, Debug, Error)]
#[error("compression level {_0} is out of range, must be in [1, 9]")]
pub struct CompressionLevelError(u32);

impl TryFrom<u32> for CompressionLevel {
    type Error = CompressionLevelError;
    fn try_from(level: u32) -> Result<Self, Self::Error> {
        if (1..=9).contains(&level) {
            Ok(Self(level))
        } else {
            Err(CompressionLevelError(level))
        }
    }
}

impl CompressionLevel {
    /// The level as a [`u32`].
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

/// Traits for a chunk compressor.
///
/// Compressors operate on contiguous byte buffers; element typing and byte
/// order are the engine's concern.
pub trait CompressorTraits: Send + Sync + core::fmt::Debug {
    /// The codec tag.
    fn codec(&self) -> Codec;

    /// The canonical codec name.
    fn identifier(&self) -> &'static str;

    /// Encode the bytes of one chunk.
    ///
    /// # Errors
    /// Returns a [`CodecError`] if encoding fails.
    fn encode(&self, decoded: Vec<u8>) -> Result<Vec<u8>, CodecError>;

    /// Decode the bytes of one chunk, reconstructing exactly `decoded_size`
    /// bytes.
    ///
    /// # Errors
    /// Returns a [`CodecError`] if decoding fails or the decoded length
    /// disagrees with `decoded_size`.
    fn decode(&self, encoded: Vec<u8>, decoded_size: usize) -> Result<Vec<u8>, CodecError>;
}

/// Configuration of a chunk compressor, as persisted in dataset metadata.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum CompressorConfiguration {
    /// The identity codec.
    Raw,
    /// The `zlib` codec.
    #[cfg(feature = "zlib")]
    Zlib(ZlibCompressorConfiguration),
    /// The `bzip2` codec.
    #[cfg(feature = "bzip2")]
    Bzip2(Bz2CompressorConfiguration),
    /// The `blosc` codec.
    #[cfg(feature = "blosc")]
    Blosc(BloscCompressorConfiguration),
}

impl CompressorConfiguration {
    /// The codec tag of the configuration.
    #[must_use]
    pub const fn codec(&self) -> Codec {
        match self {
            Self::Raw => Codec::Raw,
            #[cfg(feature = "zlib")]
            Self::Zlib(_) => Codec::Zlib,
            #[cfg(feature = "bzip2")]
            Self::Bzip2(_) => Codec::Bzip2,
            #[cfg(feature = "blosc")]
            Self::Blosc(_) => Codec::Blosc,
        }
    }

    /// Create a compressor from the configuration.
    ///
    /// `data_type` supplies the blosc typesize when the configuration leaves
    /// it unset; the other codecs ignore it.
    #[must_use]
    pub fn create_compressor(&self, data_type: DataType) -> Box<dyn CompressorTraits> {
        #[cfg(not(any(feature = "zlib", feature = "bzip2", feature = "blosc")))]
        let _ = data_type;
        match self {
            Self::Raw => Box::new(RawCodec::new()),
            #[cfg(feature = "zlib")]
            Self::Zlib(configuration) => Box::new(ZlibCodec::new_with_configuration(configuration)),
            #[cfg(feature = "bzip2")]
            Self::Bzip2(configuration) => Box::new(Bz2Codec::new_with_configuration(configuration)),
            #[cfg(feature = "blosc")]
            Self::Blosc(configuration) => Box::new(BloscCodec::new_with_configuration(
                configuration,
                data_type.size(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compression_level_bounds() {
        assert!(CompressionLevel::try_from(0).is_err());
        assert_eq!(CompressionLevel::try_from(5).unwrap().as_u32(), 5);
        assert!(CompressionLevel::try_from(10).is_err());
    }

    #[test]
    fn codec_tags() {
        assert_eq!(Codec::Raw.to_string(), "raw");
        assert_eq!(Codec::Zlib.to_string(), "zlib");
        assert_eq!(Codec::Bzip2.to_string(), "bzip2");
        assert_eq!(Codec::Blosc.to_string(), "blosc");
    }
}
