//! Filesystem handles for datasets and chunks.
//!
//! A [`DatasetHandle`] names the dataset root directory. A [`ChunkHandle`]
//! names one chunk file within it; the path a chunk resolves to depends on
//! the [`DataFormat`]: Zarr joins the chunk indices with `.` into a single
//! file name, N5 nests one directory per leading dimension.

use std::path::{Path, PathBuf};

use crate::{metadata::DataFormat, ArrayIndices};

/// A handle to a dataset directory.
#[derive(Clone, Debug)]
pub struct DatasetHandle {
    path: PathBuf,
}

impl DatasetHandle {
    /// Create a new dataset handle at `path`.
    ///
    /// The path is not touched; see [`exists`](Self::exists) and
    /// [`create_dir`](Self::create_dir).
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The dataset root path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return true if the dataset root exists on disk.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Create the dataset root directory and any missing parents.
    ///
    /// # Errors
    /// Returns [`std::io::Error`] if directory creation fails.
    pub fn create_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.path)
    }

    /// The path of the metadata document for `format`.
    #[must_use]
    pub fn metadata_path(&self, format: DataFormat) -> PathBuf {
        self.path.join(format.metadata_filename())
    }
}

/// A handle to one chunk file of a dataset.
#[derive(Clone, Debug)]
pub struct ChunkHandle {
    path: PathBuf,
    chunk_indices: ArrayIndices,
}

impl ChunkHandle {
    /// Create a handle for the chunk at `chunk_indices`.
    #[must_use]
    pub fn new(dataset: &DatasetHandle, format: DataFormat, chunk_indices: ArrayIndices) -> Self {
        let path = match format {
            DataFormat::Zarr => dataset.path.join(
                chunk_indices
                    .iter()
                    .map(u64::to_string)
                    .collect::<Vec<_>>()
                    .join("."),
            ),
            DataFormat::N5 => chunk_indices
                .iter()
                .fold(dataset.path.clone(), |path, i| path.join(i.to_string())),
        };
        Self {
            path,
            chunk_indices,
        }
    }

    /// The chunk file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return true if the chunk file exists on disk.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// The chunk indices of this handle.
    #[must_use]
    pub fn chunk_indices(&self) -> &[u64] {
        &self.chunk_indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_handle_paths() {
        let dataset = DatasetHandle::new("/data/set");
        let zarr = ChunkHandle::new(&dataset, DataFormat::Zarr, vec![1, 0, 20]);
        assert_eq!(zarr.path(), Path::new("/data/set/1.0.20"));
        let n5 = ChunkHandle::new(&dataset, DataFormat::N5, vec![1, 0, 20]);
        assert_eq!(n5.path(), Path::new("/data/set/1/0/20"));
        assert_eq!(n5.chunk_indices(), &[1, 0, 20]);
    }

    #[test]
    fn metadata_paths() {
        let dataset = DatasetHandle::new("/data/set");
        assert_eq!(
            dataset.metadata_path(DataFormat::Zarr),
            Path::new("/data/set/.zarray")
        );
        assert_eq!(
            dataset.metadata_path(DataFormat::N5),
            Path::new("/data/set/attributes.json")
        );
    }
}
