use std::iter::FusedIterator;

use crate::{num_elements, unravel_index, ArrayIndicesTinyVec, ArrayShape};

/// The indices of every chunk in a chunk grid.
///
/// Iterates over the last dimension fastest (i.e. C-contiguous order).
/// For example, a 2x2 grid produces `[(0, 0), (0, 1), (1, 0), (1, 1)]`.
/// A grid with no dimensions produces a single empty index, and a grid with any zero-length dimension produces nothing.
#[derive(Clone, Debug)]
pub struct ChunkIndices {
    grid_shape: ArrayShape,
    length: u64,
}

impl ChunkIndices {
    /// Create the chunk indices of a grid with shape `grid_shape`.
    ///
    /// A grid with more than [`u64::MAX`] chunks is clamped to [`u64::MAX`] chunks.
    #[must_use]
    pub fn new(grid_shape: ArrayShape) -> Self {
        let length = num_elements(&grid_shape).unwrap_or(u64::MAX);
        Self { grid_shape, length }
    }

    /// Return the grid shape.
    #[must_use]
    pub fn grid_shape(&self) -> &[u64] {
        &self.grid_shape
    }

    /// Return the number of chunk indices.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.length
    }

    /// Returns true if there are no chunk indices.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Create a new serial iterator.
    #[must_use]
    pub fn iter(&self) -> ChunkIndicesIterator<'_> {
        <&Self as IntoIterator>::into_iter(self)
    }
}

impl<'a> IntoIterator for &'a ChunkIndices {
    type Item = ArrayIndicesTinyVec;
    type IntoIter = ChunkIndicesIterator<'a>;

    fn into_iter(self) -> Self::IntoIter {
        ChunkIndicesIterator {
            grid_shape: &self.grid_shape,
            range: 0..self.length,
        }
    }
}

/// Serial chunk indices iterator.
///
/// See [`ChunkIndices`].
#[derive(Clone, Debug)]
pub struct ChunkIndicesIterator<'a> {
    grid_shape: &'a [u64],
    range: std::ops::Range<u64>,
}

impl Iterator for ChunkIndicesIterator<'_> {
    type Item = ArrayIndicesTinyVec;

    fn next(&mut self) -> Option<Self::Item> {
        self.range
            .next()
            .map(|index| unravel_index(index, self.grid_shape))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.range.end - self.range.start;
        match usize::try_from(remaining) {
            Ok(remaining) => (remaining, Some(remaining)),
            Err(_) => (usize::MAX, None),
        }
    }
}

impl DoubleEndedIterator for ChunkIndicesIterator<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.range
            .next_back()
            .map(|index| unravel_index(index, self.grid_shape))
    }
}

impl FusedIterator for ChunkIndicesIterator<'_> {}
