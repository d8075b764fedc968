//! The regular chunk grid of a dataset.
//!
//! A dataset subdivides its global shape into a regular grid of chunks.
//! [`ChunkGrid`] maps between global coordinates and chunk indices and
//! computes, for a hyper-rectangular request, the set of covering chunks and
//! the per-chunk intersection geometry ([`ChunkRequestCoordinates`]).

use std::num::NonZeroU64;

use itertools::{izip, Itertools};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ArrayIndices, ArrayShape};

/// A non zero error.
///
/// Returned when constructing a [`ChunkShape`] from a shape with a zero extent.
#[derive(Debug, Error)]
#[error("value must be non-zero")]
pub struct NonZeroError;

/// An incompatible dimensionality error.
#[derive(Copy, Clone, Debug, Error)]
#[error("incompatible dimensionality {_0}, expected {_1}")]
pub struct IncompatibleDimensionalityError(usize, usize);

impl IncompatibleDimensionalityError {
    /// Create a new incompatible dimensionality error.
    #[must_use]
    pub const fn new(got: usize, expected: usize) -> Self {
        Self(got, expected)
    }
}

/// The shape of a chunk. All dimensions must be non-zero.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
pub struct ChunkShape(Vec<NonZeroU64>);

impl std::ops::Deref for ChunkShape {
    type Target = Vec<NonZeroU64>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<NonZeroU64>> for ChunkShape {
    fn from(value: Vec<NonZeroU64>) -> Self {
        Self(value)
    }
}

impl TryFrom<Vec<u64>> for ChunkShape {
    type Error = NonZeroError;
    fn try_from(value: Vec<u64>) -> Result<Self, Self::Error> {
        value.as_slice().try_into()
    }
}

impl TryFrom<&[u64]> for ChunkShape {
    type Error = NonZeroError;
    fn try_from(value: &[u64]) -> Result<Self, Self::Error> {
        Ok(Self(
            value
                .iter()
                .map(|&i| NonZeroU64::new(i).ok_or(NonZeroError))
                .collect::<Result<_, _>>()?,
        ))
    }
}

impl ChunkShape {
    /// Convert the chunk shape to an [`ArrayShape`].
    #[must_use]
    pub fn to_array_shape(&self) -> ArrayShape {
        self.0.iter().map(|i| i.get()).collect()
    }

    /// The number of elements of a full chunk.
    ///
    /// Equal to the product of the components of the shape.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.0.iter().map(|i| i.get()).product()
    }
}

/// The per-chunk intersection geometry of a request.
///
/// All vectors have the dataset dimensionality. `local_offset` and
/// `local_shape` locate the intersection within the request,
/// `in_chunk_offset` locates it within the chunk. `complete_overlap` is true
/// iff the chunk lies entirely inside the request, in which case callers can
/// stream the chunk without an intermediate buffer.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ChunkRequestCoordinates {
    /// The offset of the intersection within the request.
    pub local_offset: ArrayIndices,
    /// The shape of the intersection.
    pub local_shape: ArrayShape,
    /// The offset of the intersection within the chunk.
    pub in_chunk_offset: ArrayIndices,
    /// True iff the chunk storage lies entirely inside the request.
    pub complete_overlap: bool,
}

/// The regular chunk grid of a dataset.
///
/// Derived from the dataset metadata at construction and immutable
/// thereafter. Inputs to the geometry methods are assumed validated against
/// the grid dimensionality and bounds; the dataset engine validates before
/// delegating.
#[derive(Clone, Debug)]
pub struct ChunkGrid {
    array_shape: ArrayShape,
    chunk_shape: ChunkShape,
    chunks_per_dimension: ArrayShape,
    num_chunks: u64,
}

impl ChunkGrid {
    /// Create a chunk grid for an array of `array_shape` chunked by
    /// `chunk_shape`.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if the dimensionalities of
    /// `array_shape` and `chunk_shape` do not match.
    pub fn new(
        array_shape: ArrayShape,
        chunk_shape: ChunkShape,
    ) -> Result<Self, IncompatibleDimensionalityError> {
        if array_shape.len() != chunk_shape.len() {
            return Err(IncompatibleDimensionalityError::new(
                chunk_shape.len(),
                array_shape.len(),
            ));
        }
        let chunks_per_dimension: ArrayShape = std::iter::zip(&array_shape, chunk_shape.iter())
            .map(|(&a, &c)| a.div_ceil(c.get()))
            .collect();
        let num_chunks = chunks_per_dimension.iter().product();
        Ok(Self {
            array_shape,
            chunk_shape,
            chunks_per_dimension,
            num_chunks,
        })
    }

    /// The dimensionality of the grid.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.array_shape.len()
    }

    /// The shape of the array.
    #[must_use]
    pub fn array_shape(&self) -> &[u64] {
        &self.array_shape
    }

    /// The number of elements of the array.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.array_shape.iter().product()
    }

    /// The chunk shape (the extent of interior chunks).
    #[must_use]
    pub fn chunk_shape(&self) -> &ChunkShape {
        &self.chunk_shape
    }

    /// The number of chunks per dimension.
    #[must_use]
    pub fn chunks_per_dimension(&self) -> &[u64] {
        &self.chunks_per_dimension
    }

    /// The total number of chunks in the grid.
    #[must_use]
    pub fn num_chunks(&self) -> u64 {
        self.num_chunks
    }

    /// The actual shape of the chunk at `chunk_indices`, truncated to the
    /// array bounds.
    ///
    /// For interior chunks this equals the chunk shape; for boundary chunks
    /// it is the remainder `array_shape[d] - chunk_indices[d] * chunk_shape[d]`.
    #[must_use]
    pub fn chunk_shape_bounded(&self, chunk_indices: &[u64]) -> ArrayShape {
        debug_assert_eq!(chunk_indices.len(), self.dimensionality());
        izip!(chunk_indices, &self.array_shape, self.chunk_shape.iter())
            .map(|(&i, &a, &c)| std::cmp::min(c.get(), a - i * c.get()))
            .collect()
    }

    /// The chunk indices covering the request `[offset, offset + shape)`.
    ///
    /// The covering chunks are enumerated in row-major order over the chunk
    /// sub-grid (the last dimension varies fastest).
    #[must_use]
    pub fn chunk_requests(&self, offset: &[u64], shape: &[u64]) -> Vec<ArrayIndices> {
        debug_assert_eq!(offset.len(), self.dimensionality());
        debug_assert_eq!(shape.len(), self.dimensionality());
        izip!(offset, shape, self.chunk_shape.iter())
            .map(|(&o, &s, &c)| {
                let c = c.get();
                // the chunk is labelled by its lowest coordinate, so integer
                // division finds both the first and the last covering chunk
                let min_id = o / c;
                let end_coordinate = o + s;
                let end_id = end_coordinate / c;
                let max_id = if end_coordinate % c == 0 {
                    end_id - 1
                } else {
                    end_id
                };
                min_id..=max_id
            })
            .multi_cartesian_product()
            .collect()
    }

    /// The intersection geometry of the chunk at `chunk_indices` with the
    /// request `[offset, offset + shape)`.
    ///
    /// `actual_chunk_shape` is the stored extent of the chunk: the full chunk
    /// shape under Zarr, the bounded shape under N5.
    #[must_use]
    pub fn request_coordinates(
        &self,
        chunk_indices: &[u64],
        offset: &[u64],
        shape: &[u64],
        actual_chunk_shape: &[u64],
    ) -> ChunkRequestCoordinates {
        let dimensionality = self.dimensionality();
        let mut local_offset = ArrayIndices::with_capacity(dimensionality);
        let mut local_shape = ArrayShape::with_capacity(dimensionality);
        let mut in_chunk_offset = ArrayIndices::with_capacity(dimensionality);
        let mut complete_overlap = true;

        for (&index, &chunk_extent, &actual_extent, &request_offset, &request_extent) in izip!(
            chunk_indices,
            self.chunk_shape.iter(),
            actual_chunk_shape,
            offset,
            shape
        ) {
            let chunk_begin = index * chunk_extent.get();
            let chunk_end = chunk_begin + actual_extent;
            let request_end = request_offset + request_extent;

            if chunk_begin < request_offset {
                // leading chunk that does not overlap completely
                local_offset.push(0);
                in_chunk_offset.push(request_offset - chunk_begin);
                // a leading chunk can be the trailing chunk as well
                local_shape.push(std::cmp::min(chunk_end, request_end) - request_offset);
                complete_overlap = false;
            } else if request_end < chunk_end {
                // trailing chunk that does not overlap completely
                local_offset.push(chunk_begin - request_offset);
                in_chunk_offset.push(0);
                local_shape.push(request_end - chunk_begin);
                complete_overlap = false;
            } else {
                local_offset.push(chunk_begin - request_offset);
                in_chunk_offset.push(0);
                local_shape.push(actual_extent);
            }
        }

        ChunkRequestCoordinates {
            local_offset,
            local_shape,
            in_chunk_offset,
            complete_overlap,
        }
    }
}
