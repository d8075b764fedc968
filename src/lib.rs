//! A Rust library for chunked n-dimensional arrays stored on disk in the
//! [Zarr (v2)](https://zarr-specs.readthedocs.io/en/latest/v2/v2.0.html) or
//! [N5](https://github.com/saalfeldlab/n5) formats.
//!
//! An array is described by a global shape, a chunk shape, an element data
//! type, a fill value and a compression codec; its contents are materialized
//! as one (optionally compressed) file per chunk under a dataset directory.
//! The two formats differ in chunk file naming, chunk headers and payload
//! byte order, see [`metadata::DataFormat`].
//!
//! The central type is [`Dataset`], the engine mediating between typed
//! in-memory chunk buffers and on-disk chunk files. It exposes chunk-level
//! reads and writes, the chunk-grid geometry of hyper-rectangular requests,
//! and accessors over the immutable dataset configuration. Missing chunk
//! files read back as the fill value; that is a first-class state, not an
//! error.
//!
//! ## Example
//! ```
//! use zn5::dataset::Dataset;
//! use zn5::metadata::{DataFormat, DatasetMetadata, FillValueMetadata};
//! use zn5::codec::CompressorConfiguration;
//! use zn5::data_type::DataType;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let tmp = tempfile::TempDir::new()?;
//! let metadata = DatasetMetadata::new(
//!     DataFormat::N5,
//!     vec![20, 20],
//!     vec![10, 10].try_into()?,
//!     DataType::Float32,
//!     FillValueMetadata::Null,
//!     CompressorConfiguration::Raw,
//! )?;
//! let dataset = Dataset::<f32>::create(tmp.path().join("set.n5"), metadata)?;
//!
//! let chunk: Vec<f32> = (0..100).map(|i| i as f32).collect();
//! dataset.write_chunk(&[0, 1], &chunk)?;
//!
//! let mut read = vec![0.0f32; 100];
//! dataset.read_chunk(&[0, 1], &mut read)?;
//! assert_eq!(chunk, read);
//!
//! // unwritten chunks read back as the fill value
//! dataset.read_chunk(&[1, 1], &mut read)?;
//! assert_eq!(read, vec![0.0f32; 100]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Crate features
//! The `zlib`, `bzip2` and `blosc` codecs are gated behind crate features of
//! the same name, all enabled by default. The `raw` codec is always
//! available.

#![warn(unused_variables)]
#![warn(dead_code)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod chunk_grid;
pub mod chunk_io;
pub mod codec;
pub mod data_type;
pub mod dataset;
pub mod handle;
pub mod metadata;

/// An ND index to an element in an array.
pub type ArrayIndices = Vec<u64>;

/// The shape of an array.
pub type ArrayShape = Vec<u64>;

pub use crate::{
    chunk_grid::{ChunkGrid, ChunkRequestCoordinates, ChunkShape},
    data_type::{DataType, Element},
    dataset::{create_dataset, open_dataset, Dataset, DatasetTraits},
    handle::{ChunkHandle, DatasetHandle},
    metadata::{DataFormat, DatasetMetadata, FillValueMetadata},
};
