//! Per-format chunk file I/O.
//!
//! A chunk I/O implementation knows the file format of a chunk: Zarr chunk
//! files hold the bare codec payload, N5 chunk files prefix the payload with
//! a header carrying the chunk's actual per-dimension sizes. Missing chunk
//! files are a first-class state reported as [`None`], not an error.
//!
//! Writes are durable: bytes go to a sibling temporary file which is synced
//! and renamed over the target, so concurrent readers never observe a torn
//! chunk and a failed write leaves either the previous file or a
//! distinctly-named temporary.

use std::{
    fs::File,
    io::{Read, Write},
    path::{Path, PathBuf},
};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use thiserror::Error;

use crate::{data_type::Endianness, handle::ChunkHandle, ArrayShape};

/// A storage error.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// A chunk file has an invalid header.
    #[error("chunk file {0} has an invalid header: {1}")]
    InvalidChunkHeader(PathBuf, String),
}

/// The encoded bytes of one chunk read from disk.
#[derive(Clone, Debug)]
pub struct EncodedChunk {
    /// The codec payload.
    pub bytes: Vec<u8>,
    /// The actual chunk shape from the file header, if the format has one.
    ///
    /// Authoritative over the geometric chunk shape when present.
    pub shape: Option<ArrayShape>,
}

/// Traits for per-format chunk file I/O.
pub trait ChunkIoTraits: Send + Sync + core::fmt::Debug {
    /// The byte order of payload elements on disk.
    fn data_endianness(&self) -> Endianness;

    /// Read the encoded bytes of `chunk`.
    ///
    /// Returns [`None`] if the chunk file does not exist.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the file cannot be read or its header is
    /// invalid.
    fn read(&self, chunk: &ChunkHandle) -> Result<Option<EncodedChunk>, StorageError>;

    /// Durably write the encoded bytes of `chunk`.
    ///
    /// `chunk_shape` is the actual shape of the chunk, persisted in the
    /// header by formats that have one.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the file cannot be written.
    fn write(
        &self,
        chunk: &ChunkHandle,
        encoded: &[u8],
        chunk_shape: &[u64],
    ) -> Result<(), StorageError>;
}

fn write_durable(path: &Path, parts: &[&[u8]]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let tmp_path = {
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".partial");
        PathBuf::from(tmp)
    };
    {
        let mut file = File::create(&tmp_path)?;
        for part in parts {
            file.write_all(part)?;
        }
        file.sync_all()?;
    }
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

fn open_if_exists(path: &Path) -> Result<Option<File>, StorageError> {
    match File::open(path) {
        Ok(file) => Ok(Some(file)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Chunk I/O for the Zarr format.
///
/// Chunk files hold the codec payload only. Every chunk stores the full
/// chunk shape; boundary chunks are padded by the caller on write and never
/// trimmed on read.
#[derive(Clone, Debug, Default)]
pub struct ZarrChunkIo;

impl ChunkIoTraits for ZarrChunkIo {
    fn data_endianness(&self) -> Endianness {
        Endianness::Little
    }

    fn read(&self, chunk: &ChunkHandle) -> Result<Option<EncodedChunk>, StorageError> {
        let Some(mut file) = open_if_exists(chunk.path())? else {
            return Ok(None);
        };
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        Ok(Some(EncodedChunk { bytes, shape: None }))
    }

    fn write(
        &self,
        chunk: &ChunkHandle,
        encoded: &[u8],
        _chunk_shape: &[u64],
    ) -> Result<(), StorageError> {
        write_durable(chunk.path(), &[encoded])
    }
}

/// Chunk I/O for the N5 format.
///
/// Chunk files begin with a header: a 2-byte mode field (0), the 2-byte
/// dimensionality, and one big-endian `u32` per dimension giving the chunk's
/// actual size, followed by the codec payload.
#[derive(Clone, Debug, Default)]
pub struct N5ChunkIo;

impl N5ChunkIo {
    fn read_header(
        chunk: &ChunkHandle,
        file: &mut File,
    ) -> Result<ArrayShape, StorageError> {
        let invalid_header = |error: String| {
            StorageError::InvalidChunkHeader(chunk.path().to_path_buf(), error)
        };
        let mode = file.read_u16::<BigEndian>()?;
        if mode != 0 {
            return Err(invalid_header(format!("unsupported chunk mode {mode}")));
        }
        let dimensionality = file.read_u16::<BigEndian>()?;
        if usize::from(dimensionality) != chunk.chunk_indices().len() {
            return Err(invalid_header(format!(
                "header dimensionality {dimensionality} does not match dataset dimensionality {}",
                chunk.chunk_indices().len()
            )));
        }
        let mut shape = ArrayShape::with_capacity(dimensionality.into());
        for _ in 0..dimensionality {
            shape.push(file.read_u32::<BigEndian>()?.into());
        }
        Ok(shape)
    }
}

impl ChunkIoTraits for N5ChunkIo {
    fn data_endianness(&self) -> Endianness {
        Endianness::Big
    }

    fn read(&self, chunk: &ChunkHandle) -> Result<Option<EncodedChunk>, StorageError> {
        let Some(mut file) = open_if_exists(chunk.path())? else {
            return Ok(None);
        };
        let shape = Self::read_header(chunk, &mut file)?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        Ok(Some(EncodedChunk {
            bytes,
            shape: Some(shape),
        }))
    }

    fn write(
        &self,
        chunk: &ChunkHandle,
        encoded: &[u8],
        chunk_shape: &[u64],
    ) -> Result<(), StorageError> {
        let mut header = Vec::with_capacity(4 + 4 * chunk_shape.len());
        header.write_u16::<BigEndian>(0)?;
        header.write_u16::<BigEndian>(u16::try_from(chunk_shape.len()).map_err(|_| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "dataset dimensionality exceeds the chunk header",
            )
        })?)?;
        for &extent in chunk_shape {
            header.write_u32::<BigEndian>(u32::try_from(extent).map_err(|_| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "chunk extent exceeds the chunk header",
                )
            })?)?;
        }
        write_durable(chunk.path(), &[&header, encoded])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{handle::DatasetHandle, metadata::DataFormat};

    #[test]
    fn chunk_io_missing_chunk() {
        let path = tempfile::TempDir::new().unwrap();
        let dataset = DatasetHandle::new(path.path());
        let chunk = ChunkHandle::new(&dataset, DataFormat::Zarr, vec![0, 0]);
        assert!(ZarrChunkIo.read(&chunk).unwrap().is_none());
        let chunk = ChunkHandle::new(&dataset, DataFormat::N5, vec![0, 0]);
        assert!(N5ChunkIo.read(&chunk).unwrap().is_none());
    }

    #[test]
    fn chunk_io_zarr_round_trip() {
        let path = tempfile::TempDir::new().unwrap();
        let dataset = DatasetHandle::new(path.path());
        let chunk = ChunkHandle::new(&dataset, DataFormat::Zarr, vec![1, 2]);

        ZarrChunkIo.write(&chunk, &[1, 2, 3, 4], &[2, 2]).unwrap();
        assert!(chunk.exists());
        let encoded = ZarrChunkIo.read(&chunk).unwrap().unwrap();
        assert_eq!(encoded.bytes, vec![1, 2, 3, 4]);
        assert_eq!(encoded.shape, None);

        // the payload is stored bare
        assert_eq!(std::fs::read(chunk.path()).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn chunk_io_n5_round_trip() {
        let path = tempfile::TempDir::new().unwrap();
        let dataset = DatasetHandle::new(path.path());
        let chunk = ChunkHandle::new(&dataset, DataFormat::N5, vec![1, 0]);

        N5ChunkIo.write(&chunk, &[1, 2, 3, 4, 5, 6], &[3, 2]).unwrap();
        let encoded = N5ChunkIo.read(&chunk).unwrap().unwrap();
        assert_eq!(encoded.bytes, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(encoded.shape, Some(vec![3, 2]));

        // 2 byte mode, 2 byte dimensionality, big-endian u32 sizes
        let raw = std::fs::read(chunk.path()).unwrap();
        assert_eq!(&raw[..12], &[0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0, 2]);
    }

    #[test]
    fn chunk_io_n5_invalid_header() {
        let path = tempfile::TempDir::new().unwrap();
        let dataset = DatasetHandle::new(path.path());
        let chunk = ChunkHandle::new(&dataset, DataFormat::N5, vec![0]);

        std::fs::write(chunk.path(), [0, 1, 0, 1, 0, 0, 0, 4]).unwrap();
        assert!(matches!(
            N5ChunkIo.read(&chunk),
            Err(StorageError::InvalidChunkHeader(_, _))
        ));
    }

    #[test]
    fn chunk_io_overwrite_leaves_single_file() {
        let path = tempfile::TempDir::new().unwrap();
        let dataset = DatasetHandle::new(path.path());
        let chunk = ChunkHandle::new(&dataset, DataFormat::Zarr, vec![0]);

        ZarrChunkIo.write(&chunk, &[1, 2], &[2]).unwrap();
        ZarrChunkIo.write(&chunk, &[1, 2], &[2]).unwrap();
        assert_eq!(std::fs::read_dir(path.path()).unwrap().count(), 1);
    }
}
