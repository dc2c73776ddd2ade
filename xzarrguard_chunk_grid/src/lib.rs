//! The regular chunk grid of the [`xzarrguard`](https://docs.rs/xzarrguard) crate.
//!
//! A regular chunk grid divides an array into chunks of a fixed shape.
//! Chunks along the upper edge of each dimension may extend beyond the array bounds.
//!
//! This crate provides:
//!  - [`RegularChunkGrid`]: the grid shape (number of chunks per dimension) of an array,
//!  - [`ChunkIndices`]: every chunk index of a grid in C order,
//!  - [`indices_inbounds`]: whether chunk indices lie in a grid.
//!
//! ## Licence
//! `xzarrguard_chunk_grid` is licensed under either of
//! - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//! - the MIT license <http://opensource.org/licenses/MIT>, at your option.

mod iterators;

use std::num::NonZeroU64;

use derive_more::{Deref, From};
use xzarrguard_metadata::{ConfigurationInvalidError, MetadataV3, RegularChunkGridConfiguration};

pub use iterators::{ChunkIndices, ChunkIndicesIterator};

/// An array shape. Dimensions may be zero.
pub type ArrayShape = Vec<u64>;

/// Array indices.
pub type ArrayIndices = Vec<u64>;

/// Array indices stored inline for the common low dimensional case.
pub type ArrayIndicesTinyVec = tinyvec::TinyVec<[u64; 4]>;

/// An incompatible dimensionality error.
#[derive(Copy, Clone, Debug, thiserror::Error)]
#[error("incompatible dimensionality {0}, expected {1}")]
pub struct IncompatibleDimensionalityError(usize, usize);

impl IncompatibleDimensionalityError {
    /// Create a new incompatible dimensionality error.
    #[must_use]
    pub const fn new(got: usize, expected: usize) -> Self {
        Self(got, expected)
    }
}

/// A chunk grid creation error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ChunkGridCreateError {
    /// The chunk grid is not the regular chunk grid.
    #[error("Only regular chunk grids are supported, found {0}")]
    Unsupported(String),
    /// The regular chunk grid configuration is invalid.
    #[error(transparent)]
    InvalidConfiguration(#[from] ConfigurationInvalidError),
}

/// The chunk shape of a regular chunk grid.
#[derive(Clone, Debug, Eq, PartialEq, Deref, From)]
pub struct ChunkShape(Vec<NonZeroU64>);

/// A regular chunk grid.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RegularChunkGrid {
    chunk_shape: ChunkShape,
}

impl RegularChunkGrid {
    /// Create a new regular chunk grid with chunk shape `chunk_shape`.
    #[must_use]
    pub fn new(chunk_shape: impl Into<ChunkShape>) -> Self {
        Self {
            chunk_shape: chunk_shape.into(),
        }
    }

    /// Return the chunk shape.
    #[must_use]
    pub fn chunk_shape(&self) -> &[NonZeroU64] {
        &self.chunk_shape
    }

    /// Return the chunk shape as [`u64`].
    #[must_use]
    pub fn chunk_shape_u64(&self) -> Vec<u64> {
        self.chunk_shape.iter().map(|size| size.get()).collect()
    }

    /// Return the dimensionality of the grid.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.chunk_shape.len()
    }

    /// Return the number of chunks along each dimension of an array with shape `array_shape`.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if `array_shape` does not match the grid dimensionality.
    pub fn grid_shape(
        &self,
        array_shape: &[u64],
    ) -> Result<ArrayShape, IncompatibleDimensionalityError> {
        if array_shape.len() != self.dimensionality() {
            return Err(IncompatibleDimensionalityError::new(
                array_shape.len(),
                self.dimensionality(),
            ));
        }
        Ok(std::iter::zip(array_shape, self.chunk_shape.iter())
            .map(|(&size, chunk)| size.div_ceil(chunk.get()))
            .collect())
    }

    /// Return the indices of every chunk of an array with shape `array_shape`.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if `array_shape` does not match the grid dimensionality.
    pub fn chunk_indices(
        &self,
        array_shape: &[u64],
    ) -> Result<ChunkIndices, IncompatibleDimensionalityError> {
        Ok(ChunkIndices::new(self.grid_shape(array_shape)?))
    }

    /// Convert to metadata.
    #[must_use]
    pub fn to_metadata(&self) -> MetadataV3 {
        let configuration = RegularChunkGridConfiguration {
            chunk_shape: self.chunk_shape.to_vec(),
        };
        MetadataV3::new_with_serializable_configuration(
            RegularChunkGridConfiguration::NAME,
            &configuration,
        )
        .unwrap_or_else(|_| MetadataV3::new(RegularChunkGridConfiguration::NAME))
    }
}

impl TryFrom<&MetadataV3> for RegularChunkGrid {
    type Error = ChunkGridCreateError;

    fn try_from(metadata: &MetadataV3) -> Result<Self, Self::Error> {
        if metadata.name() != RegularChunkGridConfiguration::NAME {
            return Err(ChunkGridCreateError::Unsupported(metadata.name().to_string()));
        }
        let configuration: RegularChunkGridConfiguration = metadata.to_configuration()?;
        Ok(Self::new(configuration.chunk_shape))
    }
}

/// Returns true if `indices` has the dimensionality of `grid_shape` and lies within it.
#[must_use]
pub fn indices_inbounds(indices: &[u64], grid_shape: &[u64]) -> bool {
    indices.len() == grid_shape.len()
        && std::iter::zip(indices, grid_shape).all(|(index, count)| index < count)
}

/// Returns the number of elements of `shape`, or [`None`] on overflow.
#[must_use]
pub fn num_elements(shape: &[u64]) -> Option<u64> {
    shape.iter().try_fold(1u64, |acc, &size| acc.checked_mul(size))
}

/// Convert a linearised index in C order to array indices.
#[must_use]
pub fn unravel_index(mut index: u64, shape: &[u64]) -> ArrayIndicesTinyVec {
    let mut indices: ArrayIndicesTinyVec = std::iter::repeat(0).take(shape.len()).collect();
    for (out, &size) in indices.iter_mut().zip(shape).rev() {
        *out = index % size;
        index /= size;
    }
    indices
}
