//! Datasets.
//!
//! A dataset is a chunked n-dimensional array stored under one directory.
//! [`Dataset`] is the engine mediating between typed in-memory chunk buffers
//! and on-disk chunk files: it owns the chunk grid geometry, one compressor
//! and one chunk I/O implementation, all selected from the dataset metadata
//! at construction and immutable thereafter.
//!
//! A dataset is constructed in one of two modes:
//!  - [`Dataset::create`] fails if the dataset path exists, then materializes
//!    the directory and persists the metadata document,
//!  - [`Dataset::open`] fails if the path does not exist, then loads and
//!    validates the metadata document.
//!
//! [`Dataset`] holds no mutable state, so a shared reference can be used from
//! multiple threads; concurrent reads and writes of *distinct* chunks are
//! safe. Concurrent access to the *same* chunk must be serialized by the
//! caller.
//!
//! Higher layers that scatter/gather requests over datasets of arbitrary
//! element type use the object-safe [`DatasetTraits`] surface and the
//! [`open_dataset`]/[`create_dataset`] functions, which dispatch on the data
//! type persisted in the metadata.

use std::path::PathBuf;

use thiserror::Error;

use crate::{
    chunk_grid::{
        ChunkGrid, ChunkRequestCoordinates, ChunkShape, IncompatibleDimensionalityError,
    },
    chunk_io::{ChunkIoTraits, N5ChunkIo, StorageError, ZarrChunkIo},
    codec::{Codec, CodecError, CompressorTraits},
    data_type::{DataType, Element},
    handle::{ChunkHandle, DatasetHandle},
    metadata::{DataFormat, DatasetMetadata, FillValueMetadata, MetadataError},
    ArrayIndices, ArrayShape,
};

/// A dataset creation error.
#[derive(Debug, Error)]
pub enum DatasetCreateError {
    /// The dataset path already exists (create mode).
    #[error("dataset path {0} already exists")]
    NodeAlreadyExists(PathBuf),
    /// The dataset path does not exist (open mode).
    #[error("dataset path {0} does not exist")]
    NodeNotFound(PathBuf),
    /// The dataset directory has no metadata document.
    #[error("dataset path {0} has no metadata document")]
    MissingMetadata(PathBuf),
    /// A metadata error.
    #[error(transparent)]
    MetadataError(#[from] MetadataError),
    /// A storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// An incompatible dimensionality.
    #[error(transparent)]
    IncompatibleDimensionalityError(#[from] IncompatibleDimensionalityError),
    /// The fill value is incompatible with the data type.
    #[error("fill value {_0:?} is incompatible with data type {_1}")]
    IncompatibleFillValue(FillValueMetadata, DataType),
    /// The stored data type does not match the element type of the dataset.
    #[error("dataset data type {_0} does not match element type {_1}")]
    IncompatibleDataType(DataType, DataType),
}

/// A dataset operation error.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// A storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// A codec error.
    #[error(transparent)]
    CodecError(#[from] CodecError),
    /// An incompatible dimensionality.
    #[error(transparent)]
    IncompatibleDimensionalityError(#[from] IncompatibleDimensionalityError),
    /// Chunk indices are outside the chunk grid.
    #[error("invalid chunk indices {_0:?}, the chunk grid has {_1:?} chunks per dimension")]
    InvalidChunkIndices(ArrayIndices, ArrayShape),
    /// A request rectangle exceeds the array shape.
    #[error("request offset {_0:?} shape {_1:?} is not within array shape {_2:?}")]
    InvalidRequestSubset(ArrayIndices, ArrayShape, ArrayShape),
    /// A request shape has a zero extent.
    #[error("request shape {_0:?} has a zero extent")]
    ZeroRequestExtent(ArrayShape),
    /// The requested element type does not match the dataset data type.
    #[error("dataset data type {_0} does not match element type {_1}")]
    IncompatibleDataType(DataType, DataType),
    /// A buffer does not hold the expected number of elements.
    #[error("buffer has {_0} elements, expected {_1}")]
    UnexpectedBufferLength(usize, u64),
}

/// A dataset of elements of type `T`.
#[derive(Debug)]
pub struct Dataset<T: Element> {
    handle: DatasetHandle,
    metadata: DatasetMetadata,
    chunk_grid: ChunkGrid,
    compressor: Box<dyn CompressorTraits>,
    chunk_io: Box<dyn ChunkIoTraits>,
    fill_value: T,
}

impl<T: Element> Dataset<T> {
    /// Create a new dataset at `path` described by `metadata`.
    ///
    /// Materializes the dataset directory and persists the metadata document.
    ///
    /// # Errors
    /// Returns a [`DatasetCreateError`] if the path already exists, the
    /// metadata is invalid, or the directory cannot be materialized.
    pub fn create(
        path: impl Into<PathBuf>,
        metadata: DatasetMetadata,
    ) -> Result<Self, DatasetCreateError> {
        let handle = DatasetHandle::new(path);
        if handle.exists() {
            return Err(DatasetCreateError::NodeAlreadyExists(
                handle.path().to_path_buf(),
            ));
        }
        let dataset = Self::new_with_metadata(handle, metadata)?;
        dataset.handle.create_dir().map_err(StorageError::from)?;
        let document = dataset.metadata.to_document()?;
        std::fs::write(
            dataset.handle.metadata_path(dataset.metadata.format),
            document,
        )
        .map_err(StorageError::from)?;
        Ok(dataset)
    }

    /// Open an existing dataset at `path`.
    ///
    /// # Errors
    /// Returns a [`DatasetCreateError`] if the path does not exist, the
    /// metadata document is missing or invalid, or the stored data type does
    /// not match `T`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, DatasetCreateError> {
        let handle = DatasetHandle::new(path);
        let metadata = open_metadata(&handle)?;
        Self::new_with_metadata(handle, metadata)
    }

    fn new_with_metadata(
        handle: DatasetHandle,
        metadata: DatasetMetadata,
    ) -> Result<Self, DatasetCreateError> {
        metadata.validate()?;
        if metadata.data_type != T::DATA_TYPE {
            return Err(DatasetCreateError::IncompatibleDataType(
                metadata.data_type,
                T::DATA_TYPE,
            ));
        }
        let fill_value = T::from_fill_value_metadata(&metadata.fill_value).ok_or_else(|| {
            DatasetCreateError::IncompatibleFillValue(
                metadata.fill_value.clone(),
                metadata.data_type,
            )
        })?;
        let chunk_grid = ChunkGrid::new(metadata.shape.clone(), metadata.chunk_shape.clone())?;
        let compressor = metadata.compressor.create_compressor(metadata.data_type);
        let chunk_io: Box<dyn ChunkIoTraits> = match metadata.format {
            DataFormat::Zarr => Box::new(ZarrChunkIo),
            DataFormat::N5 => Box::new(N5ChunkIo),
        };
        Ok(Self {
            handle,
            metadata,
            chunk_grid,
            compressor,
            chunk_io,
            fill_value,
        })
    }

    /// The dataset handle.
    #[must_use]
    pub fn handle(&self) -> &DatasetHandle {
        &self.handle
    }

    /// The dataset metadata.
    #[must_use]
    pub fn metadata(&self) -> &DatasetMetadata {
        &self.metadata
    }

    /// The dimensionality of the dataset.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.chunk_grid.dimensionality()
    }

    /// The shape of the dataset.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        self.chunk_grid.array_shape()
    }

    /// The number of elements of the dataset.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.chunk_grid.num_elements()
    }

    /// The chunk shape (the extent of interior chunks).
    #[must_use]
    pub fn max_chunk_shape(&self) -> &ChunkShape {
        self.chunk_grid.chunk_shape()
    }

    /// The number of elements of a full chunk.
    #[must_use]
    pub fn max_chunk_num_elements(&self) -> u64 {
        self.chunk_grid.chunk_shape().num_elements()
    }

    /// The number of chunks per dimension.
    #[must_use]
    pub fn chunks_per_dimension(&self) -> &[u64] {
        self.chunk_grid.chunks_per_dimension()
    }

    /// The total number of chunks.
    #[must_use]
    pub fn num_chunks(&self) -> u64 {
        self.chunk_grid.num_chunks()
    }

    /// The data type of the dataset.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        T::DATA_TYPE
    }

    /// The fill value of the dataset.
    #[must_use]
    pub fn fill_value(&self) -> T {
        self.fill_value
    }

    /// The on-disk format of the dataset.
    #[must_use]
    pub fn format(&self) -> DataFormat {
        self.metadata.format
    }

    /// Return true if the dataset uses the Zarr format.
    #[must_use]
    pub fn is_zarr(&self) -> bool {
        self.metadata.format == DataFormat::Zarr
    }

    /// The codec tag of the compressor.
    #[must_use]
    pub fn codec(&self) -> Codec {
        self.compressor.codec()
    }

    /// The canonical name of the compressor.
    #[must_use]
    pub fn codec_identifier(&self) -> &'static str {
        self.compressor.identifier()
    }

    /// The actual (stored) shape of the chunk at `chunk_indices`.
    ///
    /// Zarr chunks always store the full chunk shape; N5 boundary chunks are
    /// truncated to the array bounds.
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if the chunk indices are invalid.
    pub fn chunk_shape(&self, chunk_indices: &[u64]) -> Result<ArrayShape, DatasetError> {
        self.check_chunk(chunk_indices)?;
        Ok(self.actual_chunk_shape(chunk_indices))
    }

    /// The extent of the chunk at `chunk_indices` in dimension `dimension`.
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if the chunk indices or dimension are
    /// invalid.
    pub fn chunk_shape_extent(
        &self,
        chunk_indices: &[u64],
        dimension: usize,
    ) -> Result<u64, DatasetError> {
        let chunk_shape = self.chunk_shape(chunk_indices)?;
        chunk_shape.get(dimension).copied().ok_or_else(|| {
            IncompatibleDimensionalityError::new(dimension, self.dimensionality()).into()
        })
    }

    /// The number of elements stored by the chunk at `chunk_indices`.
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if the chunk indices are invalid.
    pub fn chunk_num_elements(&self, chunk_indices: &[u64]) -> Result<u64, DatasetError> {
        Ok(self.chunk_shape(chunk_indices)?.iter().product())
    }

    /// Fail unless the request `[offset, offset + shape)` lies within the
    /// dataset and has no zero extent.
    ///
    /// # Errors
    /// Returns a [`DatasetError`] on dimensionality mismatch, a zero request
    /// extent, or a request exceeding the array shape.
    pub fn check_request_shape(&self, offset: &[u64], shape: &[u64]) -> Result<(), DatasetError> {
        let dimensionality = self.dimensionality();
        if offset.len() != dimensionality {
            return Err(IncompatibleDimensionalityError::new(offset.len(), dimensionality).into());
        }
        if shape.len() != dimensionality {
            return Err(IncompatibleDimensionalityError::new(shape.len(), dimensionality).into());
        }
        if shape.iter().any(|&extent| extent == 0) {
            return Err(DatasetError::ZeroRequestExtent(shape.to_vec()));
        }
        let array_shape = self.chunk_grid.array_shape();
        if itertools::izip!(offset, shape, array_shape).any(|(&o, &s, &a)| o + s > a) {
            return Err(DatasetError::InvalidRequestSubset(
                offset.to_vec(),
                shape.to_vec(),
                array_shape.to_vec(),
            ));
        }
        Ok(())
    }

    /// Fail unless `data_type` matches the element type of the dataset.
    ///
    /// # Errors
    /// Returns [`DatasetError::IncompatibleDataType`] on mismatch.
    pub fn check_request_type(&self, data_type: DataType) -> Result<(), DatasetError> {
        if data_type == T::DATA_TYPE {
            Ok(())
        } else {
            Err(DatasetError::IncompatibleDataType(T::DATA_TYPE, data_type))
        }
    }

    /// The chunk indices covering the request `[offset, offset + shape)`, in
    /// row-major order over the chunk sub-grid.
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if the request is invalid.
    pub fn chunk_requests(
        &self,
        offset: &[u64],
        shape: &[u64],
    ) -> Result<Vec<ArrayIndices>, DatasetError> {
        self.check_request_shape(offset, shape)?;
        Ok(self.chunk_grid.chunk_requests(offset, shape))
    }

    /// The intersection geometry of the chunk at `chunk_indices` with the
    /// request `[offset, offset + shape)`.
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if the chunk indices or request are
    /// invalid.
    pub fn request_coordinates(
        &self,
        chunk_indices: &[u64],
        offset: &[u64],
        shape: &[u64],
    ) -> Result<ChunkRequestCoordinates, DatasetError> {
        self.check_chunk(chunk_indices)?;
        self.check_request_shape(offset, shape)?;
        let actual_chunk_shape = self.actual_chunk_shape(chunk_indices);
        Ok(self
            .chunk_grid
            .request_coordinates(chunk_indices, offset, shape, &actual_chunk_shape))
    }

    /// Encode and durably write the chunk at `chunk_indices`.
    ///
    /// `elements` must hold exactly the actual element count of the chunk.
    /// Under Zarr that is always the full chunk size; callers are expected to
    /// have padded the out-of-range elements of boundary chunks.
    ///
    /// An existing chunk file is replaced atomically; no partial write is
    /// ever observable at the chunk path.
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if the chunk indices are invalid, the
    /// buffer length does not match, or encoding or storage fails.
    pub fn write_chunk(&self, chunk_indices: &[u64], elements: &[T]) -> Result<(), DatasetError> {
        self.check_chunk(chunk_indices)?;
        let chunk_shape = self.actual_chunk_shape(chunk_indices);
        let num_elements = chunk_shape.iter().product::<u64>();
        if elements.len() as u64 != num_elements {
            return Err(DatasetError::UnexpectedBufferLength(
                elements.len(),
                num_elements,
            ));
        }

        let bytes = if self.swap_chunk_bytes() {
            let swapped: Vec<T> = elements.iter().map(|element| element.swap_bytes()).collect();
            bytemuck::cast_slice(&swapped).to_vec()
        } else {
            bytemuck::cast_slice(elements).to_vec()
        };
        let encoded = self.compressor.encode(bytes)?;

        let chunk = ChunkHandle::new(&self.handle, self.metadata.format, chunk_indices.to_vec());
        self.chunk_io.write(&chunk, &encoded, &chunk_shape)?;
        Ok(())
    }

    /// Read and decode the chunk at `chunk_indices` into `elements`.
    ///
    /// `elements` must hold at least the actual element count of the chunk.
    /// If the chunk file does not exist, the fill value is written to exactly
    /// that count and the read succeeds.
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if the chunk indices are invalid, the
    /// buffer is too short, or decoding or storage fails.
    pub fn read_chunk(
        &self,
        chunk_indices: &[u64],
        elements: &mut [T],
    ) -> Result<(), DatasetError> {
        self.check_chunk(chunk_indices)?;
        let chunk_shape = self.actual_chunk_shape(chunk_indices);
        let mut num_elements = chunk_shape.iter().product::<u64>();
        if (elements.len() as u64) < num_elements {
            return Err(DatasetError::UnexpectedBufferLength(
                elements.len(),
                num_elements,
            ));
        }

        let chunk = ChunkHandle::new(&self.handle, self.metadata.format, chunk_indices.to_vec());
        let Some(encoded) = self.chunk_io.read(&chunk)? else {
            elements[..num_elements as usize].fill(self.fill_value);
            return Ok(());
        };

        // the header of a chunk file is authoritative over the grid geometry
        if let Some(shape) = &encoded.shape {
            num_elements = shape.iter().product::<u64>();
            if (elements.len() as u64) < num_elements {
                return Err(DatasetError::UnexpectedBufferLength(
                    elements.len(),
                    num_elements,
                ));
            }
        }
        let num_elements = num_elements as usize;

        let decoded = self
            .compressor
            .decode(encoded.bytes, num_elements * core::mem::size_of::<T>())?;
        let elements = &mut elements[..num_elements];
        bytemuck::cast_slice_mut::<T, u8>(elements).copy_from_slice(&decoded);
        if self.swap_chunk_bytes() {
            for element in elements.iter_mut() {
                *element = element.swap_bytes();
            }
        }
        Ok(())
    }

    fn check_chunk(&self, chunk_indices: &[u64]) -> Result<(), DatasetError> {
        let dimensionality = self.dimensionality();
        if chunk_indices.len() != dimensionality {
            return Err(
                IncompatibleDimensionalityError::new(chunk_indices.len(), dimensionality).into(),
            );
        }
        let chunks_per_dimension = self.chunk_grid.chunks_per_dimension();
        if std::iter::zip(chunk_indices, chunks_per_dimension).any(|(&index, &count)| index >= count)
        {
            return Err(DatasetError::InvalidChunkIndices(
                chunk_indices.to_vec(),
                chunks_per_dimension.to_vec(),
            ));
        }
        Ok(())
    }

    fn actual_chunk_shape(&self, chunk_indices: &[u64]) -> ArrayShape {
        match self.metadata.format {
            DataFormat::Zarr => self.chunk_grid.chunk_shape().to_array_shape(),
            DataFormat::N5 => self.chunk_grid.chunk_shape_bounded(chunk_indices),
        }
    }

    fn swap_chunk_bytes(&self) -> bool {
        core::mem::size_of::<T>() > 1 && !self.chunk_io.data_endianness().is_native()
    }
}

fn open_metadata(handle: &DatasetHandle) -> Result<DatasetMetadata, DatasetCreateError> {
    if !handle.exists() {
        return Err(DatasetCreateError::NodeNotFound(handle.path().to_path_buf()));
    }
    let format = if handle.metadata_path(DataFormat::Zarr).is_file() {
        DataFormat::Zarr
    } else if handle.metadata_path(DataFormat::N5).is_file() {
        DataFormat::N5
    } else {
        return Err(DatasetCreateError::MissingMetadata(
            handle.path().to_path_buf(),
        ));
    };
    let document =
        std::fs::read_to_string(handle.metadata_path(format)).map_err(StorageError::from)?;
    Ok(DatasetMetadata::from_document(format, &document)?)
}

/// The object-safe surface of a [`Dataset`] of any element type.
///
/// Buffers are untyped byte slices paired with a runtime [`DataType`] that is
/// checked against the dataset on every call; internally the dataset path
/// stays strongly typed.
pub trait DatasetTraits: Send + Sync {
    /// The dimensionality of the dataset.
    fn dimensionality(&self) -> usize;
    /// The shape of the dataset.
    fn shape(&self) -> &[u64];
    /// The number of elements of the dataset.
    fn num_elements(&self) -> u64;
    /// The chunk shape (the extent of interior chunks).
    fn max_chunk_shape(&self) -> &ChunkShape;
    /// The number of elements of a full chunk.
    fn max_chunk_num_elements(&self) -> u64;
    /// The number of chunks per dimension.
    fn chunks_per_dimension(&self) -> &[u64];
    /// The total number of chunks.
    fn num_chunks(&self) -> u64;
    /// The data type of the dataset.
    fn data_type(&self) -> DataType;
    /// The on-disk format of the dataset.
    fn format(&self) -> DataFormat;
    /// The codec tag of the compressor.
    fn codec(&self) -> Codec;
    /// The canonical name of the compressor.
    fn codec_identifier(&self) -> &'static str;
    /// The dataset handle.
    fn handle(&self) -> &DatasetHandle;

    /// The actual (stored) shape of the chunk at `chunk_indices`.
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if the chunk indices are invalid.
    fn chunk_shape(&self, chunk_indices: &[u64]) -> Result<ArrayShape, DatasetError>;

    /// The number of elements stored by the chunk at `chunk_indices`.
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if the chunk indices are invalid.
    fn chunk_num_elements(&self, chunk_indices: &[u64]) -> Result<u64, DatasetError>;

    /// Fail unless the request lies within the dataset, see
    /// [`Dataset::check_request_shape`].
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if the request is invalid.
    fn check_request_shape(&self, offset: &[u64], shape: &[u64]) -> Result<(), DatasetError>;

    /// Fail unless `data_type` matches the element type of the dataset.
    ///
    /// # Errors
    /// Returns [`DatasetError::IncompatibleDataType`] on mismatch.
    fn check_request_type(&self, data_type: DataType) -> Result<(), DatasetError>;

    /// The chunk indices covering a request, see [`Dataset::chunk_requests`].
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if the request is invalid.
    fn chunk_requests(&self, offset: &[u64], shape: &[u64])
        -> Result<Vec<ArrayIndices>, DatasetError>;

    /// The intersection geometry of a chunk with a request, see
    /// [`Dataset::request_coordinates`].
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if the chunk indices or request are
    /// invalid.
    fn request_coordinates(
        &self,
        chunk_indices: &[u64],
        offset: &[u64],
        shape: &[u64],
    ) -> Result<ChunkRequestCoordinates, DatasetError>;

    /// Write the chunk at `chunk_indices` from the bytes of elements of
    /// `data_type`.
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if the data type does not match or the
    /// write fails, see [`Dataset::write_chunk`].
    fn write_chunk_bytes(
        &self,
        chunk_indices: &[u64],
        data_type: DataType,
        bytes: &[u8],
    ) -> Result<(), DatasetError>;

    /// Read the chunk at `chunk_indices` into the bytes of elements of
    /// `data_type`.
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if the data type does not match or the
    /// read fails, see [`Dataset::read_chunk`].
    fn read_chunk_bytes(
        &self,
        chunk_indices: &[u64],
        data_type: DataType,
        bytes: &mut [u8],
    ) -> Result<(), DatasetError>;
}

impl<T: Element> DatasetTraits for Dataset<T> {
    fn dimensionality(&self) -> usize {
        self.dimensionality()
    }

    fn shape(&self) -> &[u64] {
        self.shape()
    }

    fn num_elements(&self) -> u64 {
        self.num_elements()
    }

    fn max_chunk_shape(&self) -> &ChunkShape {
        self.max_chunk_shape()
    }

    fn max_chunk_num_elements(&self) -> u64 {
        self.max_chunk_num_elements()
    }

    fn chunks_per_dimension(&self) -> &[u64] {
        self.chunks_per_dimension()
    }

    fn num_chunks(&self) -> u64 {
        self.num_chunks()
    }

    fn data_type(&self) -> DataType {
        self.data_type()
    }

    fn format(&self) -> DataFormat {
        self.format()
    }

    fn codec(&self) -> Codec {
        self.codec()
    }

    fn codec_identifier(&self) -> &'static str {
        self.codec_identifier()
    }

    fn handle(&self) -> &DatasetHandle {
        self.handle()
    }

    fn chunk_shape(&self, chunk_indices: &[u64]) -> Result<ArrayShape, DatasetError> {
        self.chunk_shape(chunk_indices)
    }

    fn chunk_num_elements(&self, chunk_indices: &[u64]) -> Result<u64, DatasetError> {
        self.chunk_num_elements(chunk_indices)
    }

    fn check_request_shape(&self, offset: &[u64], shape: &[u64]) -> Result<(), DatasetError> {
        self.check_request_shape(offset, shape)
    }

    fn check_request_type(&self, data_type: DataType) -> Result<(), DatasetError> {
        self.check_request_type(data_type)
    }

    fn chunk_requests(
        &self,
        offset: &[u64],
        shape: &[u64],
    ) -> Result<Vec<ArrayIndices>, DatasetError> {
        self.chunk_requests(offset, shape)
    }

    fn request_coordinates(
        &self,
        chunk_indices: &[u64],
        offset: &[u64],
        shape: &[u64],
    ) -> Result<ChunkRequestCoordinates, DatasetError> {
        self.request_coordinates(chunk_indices, offset, shape)
    }

    fn write_chunk_bytes(
        &self,
        chunk_indices: &[u64],
        data_type: DataType,
        bytes: &[u8],
    ) -> Result<(), DatasetError> {
        self.check_request_type(data_type)?;
        let element_size = core::mem::size_of::<T>() as u64;
        let num_elements = self.chunk_num_elements(chunk_indices)?;
        if bytes.len() as u64 != num_elements * element_size {
            return Err(DatasetError::UnexpectedBufferLength(
                bytes.len() / core::mem::size_of::<T>(),
                num_elements,
            ));
        }
        // the caller's bytes may not be aligned to T, so gather into a typed copy
        let elements: Vec<T> = bytemuck::pod_collect_to_vec(bytes);
        self.write_chunk(chunk_indices, &elements)
    }

    fn read_chunk_bytes(
        &self,
        chunk_indices: &[u64],
        data_type: DataType,
        bytes: &mut [u8],
    ) -> Result<(), DatasetError> {
        self.check_request_type(data_type)?;
        let element_size = core::mem::size_of::<T>();
        let num_elements = self.chunk_num_elements(chunk_indices)?;
        if (bytes.len() as u64) < num_elements * element_size as u64 {
            return Err(DatasetError::UnexpectedBufferLength(
                bytes.len() / element_size,
                num_elements,
            ));
        }
        let num_elements = num_elements as usize;
        let mut elements: Vec<T> = bytemuck::zeroed_vec(num_elements);
        self.read_chunk(chunk_indices, &mut elements)?;
        bytes[..num_elements * element_size].copy_from_slice(bytemuck::cast_slice(&elements));
        Ok(())
    }
}

macro_rules! dataset_for_data_type {
    ( $data_type:expr, $build:ident ( $($arg:expr),* ) ) => {{
        let boxed: Box<dyn DatasetTraits> = match $data_type {
            DataType::Int8 => Box::new($build::<i8>($($arg),*)?),
            DataType::Int16 => Box::new($build::<i16>($($arg),*)?),
            DataType::Int32 => Box::new($build::<i32>($($arg),*)?),
            DataType::Int64 => Box::new($build::<i64>($($arg),*)?),
            DataType::UInt8 => Box::new($build::<u8>($($arg),*)?),
            DataType::UInt16 => Box::new($build::<u16>($($arg),*)?),
            DataType::UInt32 => Box::new($build::<u32>($($arg),*)?),
            DataType::UInt64 => Box::new($build::<u64>($($arg),*)?),
            DataType::Float32 => Box::new($build::<f32>($($arg),*)?),
            DataType::Float64 => Box::new($build::<f64>($($arg),*)?),
        };
        boxed
    }};
}

fn build_dataset<T: Element>(
    handle: &DatasetHandle,
    metadata: &DatasetMetadata,
) -> Result<Dataset<T>, DatasetCreateError> {
    Dataset::new_with_metadata(handle.clone(), metadata.clone())
}

fn build_created_dataset<T: Element>(
    path: &std::path::Path,
    metadata: &DatasetMetadata,
) -> Result<Dataset<T>, DatasetCreateError> {
    Dataset::create(path, metadata.clone())
}

/// Open an existing dataset at `path` with the element type stored in its
/// metadata.
///
/// # Errors
/// Returns a [`DatasetCreateError`] if the path does not exist or the
/// metadata document is missing or invalid.
pub fn open_dataset(
    path: impl Into<PathBuf>,
) -> Result<Box<dyn DatasetTraits>, DatasetCreateError> {
    let handle = DatasetHandle::new(path);
    let metadata = open_metadata(&handle)?;
    Ok(dataset_for_data_type!(
        metadata.data_type,
        build_dataset(&handle, &metadata)
    ))
}

/// Create a new dataset at `path` with the element type of `metadata`.
///
/// # Errors
/// Returns a [`DatasetCreateError`] if the path already exists or the
/// metadata is invalid.
pub fn create_dataset(
    path: impl Into<PathBuf>,
    metadata: DatasetMetadata,
) -> Result<Box<dyn DatasetTraits>, DatasetCreateError> {
    let path = path.into();
    Ok(dataset_for_data_type!(
        metadata.data_type,
        build_created_dataset(&path, &metadata)
    ))
}
