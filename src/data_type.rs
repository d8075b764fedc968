//! Data types of dataset elements.
//!
//! Every dataset stores elements of a single numeric [`DataType`]. In-memory
//! buffers are typed through the [`Element`] trait, which ties a Rust scalar
//! type to its [`DataType`] tag and provides the conversions the chunk
//! read/write path needs (byte views, per-element byte swaps, fill value
//! parsing).

use thiserror::Error;

use crate::metadata::FillValueMetadata;

/// The data type of a dataset element.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum DataType {
    /// `int8` Integer in `[-2^7, 2^7-1]`.
    Int8,
    /// `int16` Integer in `[-2^15, 2^15-1]`.
    Int16,
    /// `int32` Integer in `[-2^31, 2^31-1]`.
    Int32,
    /// `int64` Integer in `[-2^63, 2^63-1]`.
    Int64,
    /// `uint8` Integer in `[0, 2^8-1]`.
    UInt8,
    /// `uint16` Integer in `[0, 2^16-1]`.
    UInt16,
    /// `uint32` Integer in `[0, 2^32-1]`.
    UInt32,
    /// `uint64` Integer in `[0, 2^64-1]`.
    UInt64,
    /// `float32` IEEE 754 single-precision floating point.
    Float32,
    /// `float64` IEEE 754 double-precision floating point.
    Float64,
}

/// An unsupported data type error.
#[derive(Debug, Error)]
#[error("unsupported data type {_0}")]
pub struct UnsupportedDataTypeError(String);

impl From<&str> for UnsupportedDataTypeError {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl DataType {
    /// Returns the identifier, e.g. `int8` or `float64`.
    ///
    /// This is also the `dataType` name persisted in N5 dataset attributes.
    #[must_use]
    pub const fn identifier(&self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }

    /// Returns the size in bytes of an element.
    #[must_use]
    pub const fn size(&self) -> usize {
        match self {
            Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
        }
    }

    /// Create a data type from its `identifier`.
    ///
    /// # Errors
    /// Returns [`UnsupportedDataTypeError`] if `identifier` is not recognised.
    pub fn from_identifier(identifier: &str) -> Result<Self, UnsupportedDataTypeError> {
        match identifier {
            "int8" => Ok(Self::Int8),
            "int16" => Ok(Self::Int16),
            "int32" => Ok(Self::Int32),
            "int64" => Ok(Self::Int64),
            "uint8" => Ok(Self::UInt8),
            "uint16" => Ok(Self::UInt16),
            "uint32" => Ok(Self::UInt32),
            "uint64" => Ok(Self::UInt64),
            "float32" => Ok(Self::Float32),
            "float64" => Ok(Self::Float64),
            _ => Err(identifier.into()),
        }
    }

    /// Returns the NumPy-style dtype string persisted in Zarr array metadata.
    ///
    /// Zarr chunk payloads are written little-endian, so multi-byte types
    /// carry the `<` prefix and single-byte types the `|` prefix.
    #[must_use]
    pub const fn zarr_dtype(&self) -> &'static str {
        match self {
            Self::Int8 => "|i1",
            Self::Int16 => "<i2",
            Self::Int32 => "<i4",
            Self::Int64 => "<i8",
            Self::UInt8 => "|u1",
            Self::UInt16 => "<u2",
            Self::UInt32 => "<u4",
            Self::UInt64 => "<u8",
            Self::Float32 => "<f4",
            Self::Float64 => "<f8",
        }
    }

    /// Create a data type from a NumPy-style Zarr dtype string.
    ///
    /// # Errors
    /// Returns [`UnsupportedDataTypeError`] if the dtype is not recognised.
    /// Big-endian (`>`-prefixed) dtypes are rejected; Zarr chunk payloads are
    /// little-endian here.
    pub fn from_zarr_dtype(dtype: &str) -> Result<Self, UnsupportedDataTypeError> {
        match dtype {
            "|i1" => Ok(Self::Int8),
            "<i2" => Ok(Self::Int16),
            "<i4" => Ok(Self::Int32),
            "<i8" => Ok(Self::Int64),
            "|u1" => Ok(Self::UInt8),
            "<u2" => Ok(Self::UInt16),
            "<u4" => Ok(Self::UInt32),
            "<u8" => Ok(Self::UInt64),
            "<f4" => Ok(Self::Float32),
            "<f8" => Ok(Self::Float64),
            _ => Err(dtype.into()),
        }
    }
}

impl core::fmt::Display for DataType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.identifier())
    }
}

/// The endianness of each element in a chunk payload, either `big` or `little`.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Endianness {
    /// Little endian.
    Little,
    /// Big endian.
    Big,
}

impl Endianness {
    /// Return true if the endianness matches the endianness of the CPU.
    #[must_use]
    pub fn is_native(self) -> bool {
        self == NATIVE_ENDIAN
    }
}

/// The endianness of the CPU.
pub const NATIVE_ENDIAN: Endianness = if cfg!(target_endian = "big") {
    Endianness::Big
} else {
    Endianness::Little
};

/// A scalar type usable as a dataset element.
///
/// Implemented for the signed/unsigned integers of widths 1, 2, 4 and 8 bytes
/// and the 4 and 8 byte floats. [`bytemuck::Pod`] supplies the contiguous
/// byte view used by the codec and chunk I/O layers.
pub trait Element: bytemuck::Pod + PartialEq + Send + Sync + 'static {
    /// The data type tag of this element type.
    const DATA_TYPE: DataType;

    /// Reverse the byte order of the element.
    #[must_use]
    fn swap_bytes(self) -> Self;

    /// Convert fill value metadata to an element value.
    ///
    /// Returns [`None`] if the metadata cannot represent this element type
    /// losslessly. A `null` fill value maps to zero.
    fn from_fill_value_metadata(metadata: &FillValueMetadata) -> Option<Self>;

    /// The fill value metadata representing `self`.
    fn to_fill_value_metadata(self) -> FillValueMetadata;
}

macro_rules! impl_element_int {
    ( $t:ty, $data_type:expr ) => {
        impl Element for $t {
            const DATA_TYPE: DataType = $data_type;

            fn swap_bytes(self) -> Self {
                <$t>::swap_bytes(self)
            }

            fn from_fill_value_metadata(metadata: &FillValueMetadata) -> Option<Self> {
                match metadata {
                    FillValueMetadata::Null => Some(0),
                    FillValueMetadata::Number(number) => {
                        if let Some(u) = number.as_u64() {
                            num::NumCast::from(u)
                        } else if let Some(i) = number.as_i64() {
                            num::NumCast::from(i)
                        } else {
                            None
                        }
                    }
                    _ => None,
                }
            }

            fn to_fill_value_metadata(self) -> FillValueMetadata {
                FillValueMetadata::Number(self.into())
            }
        }
    };
}

macro_rules! impl_element_float {
    ( $t:ty, $data_type:expr ) => {
        impl Element for $t {
            const DATA_TYPE: DataType = $data_type;

            fn swap_bytes(self) -> Self {
                <$t>::from_bits(self.to_bits().swap_bytes())
            }

            fn from_fill_value_metadata(metadata: &FillValueMetadata) -> Option<Self> {
                match metadata {
                    FillValueMetadata::Null => Some(0.0),
                    FillValueMetadata::NaN => Some(<$t>::NAN),
                    FillValueMetadata::Infinity => Some(<$t>::INFINITY),
                    FillValueMetadata::NegInfinity => Some(<$t>::NEG_INFINITY),
                    FillValueMetadata::Number(number) => {
                        number.as_f64().map(|f| f as $t)
                    }
                }
            }

            fn to_fill_value_metadata(self) -> FillValueMetadata {
                if self.is_nan() {
                    FillValueMetadata::NaN
                } else if self == <$t>::INFINITY {
                    FillValueMetadata::Infinity
                } else if self == <$t>::NEG_INFINITY {
                    FillValueMetadata::NegInfinity
                } else {
                    serde_json::Number::from_f64(f64::from(self))
                        .map_or(FillValueMetadata::Null, FillValueMetadata::Number)
                }
            }
        }
    };
}

impl_element_int!(i8, DataType::Int8);
impl_element_int!(i16, DataType::Int16);
impl_element_int!(i32, DataType::Int32);
impl_element_int!(i64, DataType::Int64);
impl_element_int!(u8, DataType::UInt8);
impl_element_int!(u16, DataType::UInt16);
impl_element_int!(u32, DataType::UInt32);
impl_element_int!(u64, DataType::UInt64);
impl_element_float!(f32, DataType::Float32);
impl_element_float!(f64, DataType::Float64);
