//! Dataset metadata.
//!
//! A dataset directory holds a single JSON metadata document describing the
//! global shape, chunk shape, data type, fill value and compressor. The
//! document differs by format:
//!
//! - **Zarr**: `.zarray`, with a NumPy-style dtype string and a
//!   `numcodecs`-style compressor object (`null` for the `raw` codec),
//! - **N5**: `attributes.json`, with plain data type names and a
//!   `compression` object tagged by `type`.
//!
//! Both documents convert to and from the format-independent
//! [`DatasetMetadata`] consumed by the dataset engine.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    chunk_grid::ChunkShape,
    codec::CompressorConfiguration,
    data_type::{DataType, UnsupportedDataTypeError},
    ArrayShape,
};

#[cfg(feature = "blosc")]
use crate::codec::BloscCompressorConfiguration;
#[cfg(feature = "bzip2")]
use crate::codec::Bz2CompressorConfiguration;
#[cfg(feature = "zlib")]
use crate::codec::ZlibCompressorConfiguration;

/// The on-disk format of a dataset.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Display)]
pub enum DataFormat {
    /// The Zarr (v2) format: flat `.`-separated chunk keys, headerless
    /// little-endian chunk files, `.zarray` metadata.
    #[display("zarr")]
    Zarr,
    /// The N5 format: nested chunk directories, headered big-endian chunk
    /// files, `attributes.json` metadata.
    #[display("n5")]
    N5,
}

impl DataFormat {
    /// The file name of the metadata document.
    #[must_use]
    pub const fn metadata_filename(&self) -> &'static str {
        match self {
            Self::Zarr => ".zarray",
            Self::N5 => "attributes.json",
        }
    }
}

/// A metadata error.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// The metadata document is malformed.
    #[error(transparent)]
    InvalidDocument(#[from] serde_json::Error),
    /// The data type is not supported.
    #[error(transparent)]
    UnsupportedDataType(#[from] UnsupportedDataTypeError),
    /// The chunk shape dimensionality does not match the array shape.
    #[error("chunk shape dimensionality {_0} does not match array dimensionality {_1}")]
    IncompatibleChunkShape(usize, usize),
    /// The array shape has a zero extent.
    #[error("array shape {_0:?} has a zero extent")]
    ZeroShapeExtent(ArrayShape),
    /// The chunk memory order is unsupported.
    #[error("unsupported chunk memory order, only C order is supported")]
    UnsupportedOrder,
}

/// The fill value of a dataset, as persisted in the metadata document.
///
/// Stored as a lossless numeric literal, one of the non-finite float names,
/// or `null` (interpreted as zero).
#[derive(Clone, PartialEq, Debug, Default)]
pub enum FillValueMetadata {
    /// No fill value.
    #[default]
    Null,
    /// NaN (not-a-number).
    NaN,
    /// Positive infinity.
    Infinity,
    /// Negative infinity.
    NegInfinity,
    /// A number.
    Number(serde_json::Number),
}

impl<'de> serde::Deserialize<'de> for FillValueMetadata {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum FillValueMetadataType {
            String(String),
            Number(serde_json::Number),
            Null,
        }
        let fill_value = FillValueMetadataType::deserialize(d)?;
        match fill_value {
            FillValueMetadataType::String(string) => match string.as_str() {
                "NaN" => Ok(Self::NaN),
                "Infinity" => Ok(Self::Infinity),
                "-Infinity" => Ok(Self::NegInfinity),
                _ => Err(serde::de::Error::custom("unsupported fill value")),
            },
            FillValueMetadataType::Number(number) => Ok(Self::Number(number)),
            FillValueMetadataType::Null => Ok(Self::Null),
        }
    }
}

impl Serialize for FillValueMetadata {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::NaN => serializer.serialize_str("NaN"),
            Self::Infinity => serializer.serialize_str("Infinity"),
            Self::NegInfinity => serializer.serialize_str("-Infinity"),
            Self::Number(number) => number.serialize(serializer),
        }
    }
}

/// The layout of bytes within each chunk of a Zarr array.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
pub enum ZarrOrder {
    /// Row-major order. The last dimension varies fastest.
    C,
    /// Column-major order. The first dimension varies fastest.
    F,
}

/// A `numcodecs`-style compressor object of a `.zarray` document.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(tag = "id", rename_all = "lowercase")]
pub enum ZarrCompressorMetadata {
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

/// A Zarr (v2) array metadata document.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct ZarrArrayMetadata {
    /// The Zarr storage specification version. Must be `2`.
    pub zarr_format: monostate::MustBe!(2u64),
    /// The length of each dimension of the array.
    pub shape: ArrayShape,
    /// The length of each dimension of a chunk.
    pub chunks: ChunkShape,
    /// The NumPy-style data type string.
    pub dtype: String,
    /// The compressor, or `null` for the `raw` codec.
    pub compressor: Option<ZarrCompressorMetadata>,
    /// The fill value.
    #[serde(default)]
    pub fill_value: FillValueMetadata,
    /// The layout of bytes within each chunk.
    pub order: ZarrOrder,
}

/// An N5 compression object of an `attributes.json` document.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum N5CompressionMetadata {
    /// The `raw` codec.
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

/// An N5 dataset attributes document.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct N5DatasetAttributes {
    /// The N5 format version.
    #[serde(default = "n5_version")]
    pub n5: String,
    /// The length of each dimension of the array.
    pub dimensions: ArrayShape,
    /// The length of each dimension of a chunk.
    #[serde(rename = "blockSize")]
    pub block_size: ChunkShape,
    /// The data type name.
    #[serde(rename = "dataType")]
    pub data_type: String,
    /// The compression.
    pub compression: N5CompressionMetadata,
    /// The fill value.
    #[serde(rename = "fillValue", default)]
    pub fill_value: FillValueMetadata,
}

fn n5_version() -> String {
    "2.0.0".to_string()
}

/// Format-independent dataset metadata.
#[derive(Clone, PartialEq, Debug)]
pub struct DatasetMetadata {
    /// The on-disk format.
    pub format: DataFormat,
    /// The length of each dimension of the array.
    pub shape: ArrayShape,
    /// The length of each dimension of a chunk.
    pub chunk_shape: ChunkShape,
    /// The data type.
    pub data_type: DataType,
    /// The fill value.
    pub fill_value: FillValueMetadata,
    /// The compressor configuration.
    pub compressor: CompressorConfiguration,
}

impl DatasetMetadata {
    /// Create new dataset metadata.
    ///
    /// # Errors
    /// Returns a [`MetadataError`] if the shapes are inconsistent.
    pub fn new(
        format: DataFormat,
        shape: ArrayShape,
        chunk_shape: ChunkShape,
        data_type: DataType,
        fill_value: FillValueMetadata,
        compressor: CompressorConfiguration,
    ) -> Result<Self, MetadataError> {
        let metadata = Self {
            format,
            shape,
            chunk_shape,
            data_type,
            fill_value,
            compressor,
        };
        metadata.validate()?;
        Ok(metadata)
    }

    /// Validate internal consistency.
    ///
    /// # Errors
    /// Returns a [`MetadataError`] if the chunk shape dimensionality does not
    /// match the array shape, or the array shape has a zero extent.
    pub fn validate(&self) -> Result<(), MetadataError> {
        if self.chunk_shape.len() != self.shape.len() {
            return Err(MetadataError::IncompatibleChunkShape(
                self.chunk_shape.len(),
                self.shape.len(),
            ));
        }
        if self.shape.iter().any(|&extent| extent == 0) {
            return Err(MetadataError::ZeroShapeExtent(self.shape.clone()));
        }
        Ok(())
    }

    /// Serialize to the metadata document of the dataset format.
    ///
    /// # Errors
    /// Returns a [`MetadataError`] if serialization fails.
    pub fn to_document(&self) -> Result<String, MetadataError> {
        let document = match self.format {
            DataFormat::Zarr => serde_json::to_string_pretty(&ZarrArrayMetadata::from(self))?,
            DataFormat::N5 => serde_json::to_string_pretty(&N5DatasetAttributes::from(self))?,
        };
        Ok(document)
    }

    /// Deserialize from the metadata document of `format`.
    ///
    /// # Errors
    /// Returns a [`MetadataError`] if the document is malformed or internally
    /// inconsistent.
    pub fn from_document(format: DataFormat, document: &str) -> Result<Self, MetadataError> {
        let metadata = match format {
            DataFormat::Zarr => {
                let document: ZarrArrayMetadata = serde_json::from_str(document)?;
                Self::try_from(document)?
            }
            DataFormat::N5 => {
                let document: N5DatasetAttributes = serde_json::from_str(document)?;
                Self::try_from(document)?
            }
        };
        metadata.validate()?;
        Ok(metadata)
    }
}

impl From<&DatasetMetadata> for ZarrArrayMetadata {
    fn from(metadata: &DatasetMetadata) -> Self {
        let compressor = match &metadata.compressor {
            CompressorConfiguration::Raw => None,
            #[cfg(feature = "zlib")]
            CompressorConfiguration::Zlib(configuration) => {
                Some(ZarrCompressorMetadata::Zlib(configuration.clone()))
            }
            #[cfg(feature = "bzip2")]
            CompressorConfiguration::Bzip2(configuration) => {
                Some(ZarrCompressorMetadata::Bzip2(configuration.clone()))
            }
            #[cfg(feature = "blosc")]
            CompressorConfiguration::Blosc(configuration) => {
                Some(ZarrCompressorMetadata::Blosc(configuration.clone()))
            }
        };
        Self {
            zarr_format: monostate::MustBe!(2u64),
            shape: metadata.shape.clone(),
            chunks: metadata.chunk_shape.clone(),
            dtype: metadata.data_type.zarr_dtype().to_string(),
            compressor,
            fill_value: metadata.fill_value.clone(),
            order: ZarrOrder::C,
        }
    }
}

impl From<ZarrCompressorMetadata> for CompressorConfiguration {
    fn from(compressor: ZarrCompressorMetadata) -> Self {
        match compressor {
            #[cfg(feature = "zlib")]
            ZarrCompressorMetadata::Zlib(configuration) => Self::Zlib(configuration),
            #[cfg(feature = "bzip2")]
            ZarrCompressorMetadata::Bzip2(configuration) => Self::Bzip2(configuration),
            #[cfg(feature = "blosc")]
            ZarrCompressorMetadata::Blosc(configuration) => Self::Blosc(configuration),
        }
    }
}

impl TryFrom<ZarrArrayMetadata> for DatasetMetadata {
    type Error = MetadataError;
    fn try_from(document: ZarrArrayMetadata) -> Result<Self, Self::Error> {
        if document.order != ZarrOrder::C {
            return Err(MetadataError::UnsupportedOrder);
        }
        let compressor = document
            .compressor
            .map_or(CompressorConfiguration::Raw, CompressorConfiguration::from);
        Ok(Self {
            format: DataFormat::Zarr,
            shape: document.shape,
            chunk_shape: document.chunks,
            data_type: DataType::from_zarr_dtype(&document.dtype)?,
            fill_value: document.fill_value,
            compressor,
        })
    }
}

impl From<&DatasetMetadata> for N5DatasetAttributes {
    fn from(metadata: &DatasetMetadata) -> Self {
        let compression = match &metadata.compressor {
            CompressorConfiguration::Raw => N5CompressionMetadata::Raw,
            #[cfg(feature = "zlib")]
            CompressorConfiguration::Zlib(configuration) => {
                N5CompressionMetadata::Zlib(configuration.clone())
            }
            #[cfg(feature = "bzip2")]
            CompressorConfiguration::Bzip2(configuration) => {
                N5CompressionMetadata::Bzip2(configuration.clone())
            }
            #[cfg(feature = "blosc")]
            CompressorConfiguration::Blosc(configuration) => {
                N5CompressionMetadata::Blosc(configuration.clone())
            }
        };
        Self {
            n5: n5_version(),
            dimensions: metadata.shape.clone(),
            block_size: metadata.chunk_shape.clone(),
            data_type: metadata.data_type.identifier().to_string(),
            compression,
            fill_value: metadata.fill_value.clone(),
        }
    }
}

impl TryFrom<N5DatasetAttributes> for DatasetMetadata {
    type Error = MetadataError;
    fn try_from(document: N5DatasetAttributes) -> Result<Self, Self::Error> {
        let compressor = match document.compression {
            N5CompressionMetadata::Raw => CompressorConfiguration::Raw,
            #[cfg(feature = "zlib")]
            N5CompressionMetadata::Zlib(configuration) => {
                CompressorConfiguration::Zlib(configuration)
            }
            #[cfg(feature = "bzip2")]
            N5CompressionMetadata::Bzip2(configuration) => {
                CompressorConfiguration::Bzip2(configuration)
            }
            #[cfg(feature = "blosc")]
            N5CompressionMetadata::Blosc(configuration) => {
                CompressorConfiguration::Blosc(configuration)
            }
        };
        Ok(Self {
            format: DataFormat::N5,
            shape: document.dimensions,
            chunk_shape: document.block_size,
            data_type: DataType::from_identifier(&document.data_type)?,
            fill_value: document.fill_value,
            compressor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "zlib")]
    #[test]
    fn metadata_zarr_document() {
        let json = r#"{
            "zarr_format": 2,
            "shape": [10000, 10000],
            "chunks": [1000, 1000],
            "dtype": "<i2",
            "compressor": {"id": "zlib", "level": 5},
            "fill_value": -1,
            "order": "C"
        }"#;
        let metadata = DatasetMetadata::from_document(DataFormat::Zarr, json).unwrap();
        assert_eq!(metadata.format, DataFormat::Zarr);
        assert_eq!(metadata.data_type, DataType::Int16);
        assert_eq!(metadata.shape, vec![10000, 10000]);
        assert_eq!(metadata.compressor.codec(), crate::codec::Codec::Zlib);

        let document = metadata.to_document().unwrap();
        let reread = DatasetMetadata::from_document(DataFormat::Zarr, &document).unwrap();
        assert_eq!(metadata, reread);
    }

    #[test]
    fn metadata_zarr_invalid_format_version() {
        let json = r#"{
            "zarr_format": 3,
            "shape": [10],
            "chunks": [5],
            "dtype": "<i2",
            "compressor": null,
            "fill_value": 0,
            "order": "C"
        }"#;
        assert!(DatasetMetadata::from_document(DataFormat::Zarr, json).is_err());
    }

    #[test]
    fn metadata_n5_document() {
        let json = r#"{
            "dimensions": [20, 20, 20],
            "blockSize": [13, 5, 9],
            "dataType": "float32",
            "compression": {"type": "raw"},
            "fillValue": "NaN"
        }"#;
        let metadata = DatasetMetadata::from_document(DataFormat::N5, json).unwrap();
        assert_eq!(metadata.format, DataFormat::N5);
        assert_eq!(metadata.data_type, DataType::Float32);
        assert_eq!(metadata.fill_value, FillValueMetadata::NaN);
        assert_eq!(metadata.compressor, CompressorConfiguration::Raw);

        let document = metadata.to_document().unwrap();
        let reread = DatasetMetadata::from_document(DataFormat::N5, &document).unwrap();
        assert_eq!(metadata, reread);
    }

    #[test]
    fn metadata_inconsistent_chunk_shape() {
        let json = r#"{
            "dimensions": [20, 20, 20],
            "blockSize": [13, 5],
            "dataType": "float32",
            "compression": {"type": "raw"}
        }"#;
        assert!(matches!(
            DatasetMetadata::from_document(DataFormat::N5, json),
            Err(MetadataError::IncompatibleChunkShape(2, 3))
        ));
    }

    #[test]
    fn metadata_zero_chunk_extent() {
        let json = r#"{
            "dimensions": [20, 20],
            "blockSize": [13, 0],
            "dataType": "float32",
            "compression": {"type": "raw"}
        }"#;
        assert!(matches!(
            DatasetMetadata::from_document(DataFormat::N5, json),
            Err(MetadataError::InvalidDocument(_))
        ));
    }

    #[test]
    fn metadata_unknown_compressor() {
        let json = r#"{
            "dimensions": [20, 20],
            "blockSize": [13, 5],
            "dataType": "float32",
            "compression": {"type": "lzma"}
        }"#;
        assert!(DatasetMetadata::from_document(DataFormat::N5, json).is_err());
    }
}
