use std::num::NonZeroU64;

use xzarrguard_chunk_grid::{ArrayShape, RegularChunkGrid};
use xzarrguard_chunk_key_encoding::{ChunkKeyEncoding, ChunkKeySeparator};
use zarrs::{
    array::{
        chunk_key_encoding::{DefaultChunkKeyEncoding, V2ChunkKeyEncoding},
        ArrayBuilder, ArrayBytes, ArrayError, ChunkKeyEncoding as ZarrsChunkKeyEncoding,
        FillValue, FromArrayBytes, IntoArrayBytes,
    },
    metadata::ChunkKeySeparator as ZarrsChunkKeySeparator,
};

use super::{DataType, DatasetError, Element};

/// An in-memory array of a [`Dataset`](super::Dataset).
///
/// Elements are held as native endian bytes in C order.
#[derive(Clone, Debug, PartialEq)]
pub struct DatasetArray {
    shape: ArrayShape,
    chunk_shape: Vec<NonZeroU64>,
    data_type: DataType,
    fill_value: FillValue,
    chunk_key_encoding: ChunkKeyEncoding,
    dimension_names: Option<Vec<Option<String>>>,
    attributes: serde_json::Map<String, serde_json::Value>,
    bytes: Vec<u8>,
}

impl DatasetArray {
    /// Create a new array from native endian element `bytes` in C order.
    ///
    /// The fill value is the [default fill value](DataType::default_fill_value) and the chunk key encoding is the `default` encoding with a `/` separator.
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if `shape` and `chunk_shape` have different ranks or `bytes` has the wrong length for `shape`.
    pub fn new(
        shape: ArrayShape,
        chunk_shape: Vec<NonZeroU64>,
        data_type: DataType,
        bytes: Vec<u8>,
    ) -> Result<Self, DatasetError> {
        RegularChunkGrid::new(chunk_shape.clone()).grid_shape(&shape)?;
        let num_elements = shape
            .iter()
            .try_fold(1u64, |n, &s| n.checked_mul(s))
            .ok_or(DatasetError::TooLarge)?;
        ArrayBytes::from(bytes.as_slice())
            .validate(num_elements, &data_type.to_zarrs())
            .map_err(ArrayError::from)?;
        Ok(Self {
            shape,
            chunk_shape,
            data_type,
            fill_value: data_type.default_fill_value(),
            chunk_key_encoding: ChunkKeyEncoding::default(),
            dimension_names: None,
            attributes: serde_json::Map::new(),
            bytes,
        })
    }

    /// Create a new array from `elements` in C order.
    ///
    /// # Errors
    /// See [`DatasetArray::new`].
    pub fn from_elements<T: Element>(
        shape: ArrayShape,
        chunk_shape: Vec<NonZeroU64>,
        elements: &[T],
    ) -> Result<Self, DatasetError> {
        let bytes = elements
            .into_array_bytes(&T::DATA_TYPE.to_zarrs())
            .map_err(ArrayError::from)?
            .into_fixed()
            .map_err(ArrayError::from)?
            .into_owned();
        Self::new(shape, chunk_shape, T::DATA_TYPE, bytes)
    }

    /// Set the fill value.
    ///
    /// # Errors
    /// Returns [`DatasetError::DataTypeMismatch`] if the element type does not match the array data type.
    pub fn with_fill_value<T: Element>(mut self, fill_value: T) -> Result<Self, DatasetError> {
        self.check_data_type::<T>()?;
        self.fill_value = fill_value.into();
        Ok(self)
    }

    /// Set the chunk key encoding.
    #[must_use]
    pub fn with_chunk_key_encoding(mut self, chunk_key_encoding: ChunkKeyEncoding) -> Self {
        self.chunk_key_encoding = chunk_key_encoding;
        self
    }

    /// Set the dimension names.
    #[must_use]
    pub fn with_dimension_names(mut self, dimension_names: Option<Vec<Option<String>>>) -> Self {
        self.dimension_names = dimension_names;
        self
    }

    /// Set the attributes.
    #[must_use]
    pub fn with_attributes(
        mut self,
        attributes: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        self.attributes = attributes;
        self
    }

    /// The array shape.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// The chunk shape.
    #[must_use]
    pub fn chunk_shape(&self) -> &[NonZeroU64] {
        &self.chunk_shape
    }

    /// The data type.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// The fill value.
    #[must_use]
    pub fn fill_value(&self) -> &FillValue {
        &self.fill_value
    }

    /// The chunk key encoding.
    #[must_use]
    pub fn chunk_key_encoding(&self) -> ChunkKeyEncoding {
        self.chunk_key_encoding
    }

    /// The dimension names.
    #[must_use]
    pub fn dimension_names(&self) -> Option<&[Option<String>]> {
        self.dimension_names.as_deref()
    }

    /// The attributes.
    #[must_use]
    pub fn attributes(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.attributes
    }

    /// The element bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The elements.
    ///
    /// # Errors
    /// Returns [`DatasetError::DataTypeMismatch`] if the element type does not match the array data type.
    pub fn elements<T: Element>(&self) -> Result<Vec<T>, DatasetError> {
        self.check_data_type::<T>()?;
        Ok(<Vec<T> as FromArrayBytes>::from_array_bytes(
            ArrayBytes::from(self.bytes.clone()),
            &self.shape,
            &self.data_type.to_zarrs(),
        )?)
    }

    fn check_data_type<T: Element>(&self) -> Result<(), DatasetError> {
        if T::DATA_TYPE == self.data_type {
            Ok(())
        } else {
            Err(DatasetError::DataTypeMismatch {
                expected: self.data_type,
                found: T::DATA_TYPE,
            })
        }
    }

    /// The chunk grid.
    #[must_use]
    pub fn chunk_grid(&self) -> RegularChunkGrid {
        RegularChunkGrid::new(self.chunk_shape.clone())
    }

    /// Set the fill value of an array read from a store.
    pub(crate) fn with_stored_fill_value(mut self, fill_value: FillValue) -> Self {
        self.fill_value = fill_value;
        self
    }

    /// A `zarrs` array builder for this array.
    ///
    /// Chunks are uncompressed, with the `bytes` codec.
    pub(crate) fn builder(&self) -> ArrayBuilder {
        let zarrs_separator = |separator: ChunkKeySeparator| match separator {
            ChunkKeySeparator::Slash => ZarrsChunkKeySeparator::Slash,
            ChunkKeySeparator::Dot => ZarrsChunkKeySeparator::Dot,
        };
        let chunk_key_encoding = match self.chunk_key_encoding {
            ChunkKeyEncoding::Default(separator) => ZarrsChunkKeyEncoding::new(
                DefaultChunkKeyEncoding::new(zarrs_separator(separator)),
            ),
            ChunkKeyEncoding::V2(separator) => {
                ZarrsChunkKeyEncoding::new(V2ChunkKeyEncoding::new(zarrs_separator(separator)))
            }
        };
        let mut builder = ArrayBuilder::new(
            self.shape.clone(),
            self.chunk_shape.iter().map(|s| s.get()).collect::<Vec<u64>>(),
            self.data_type.to_zarrs(),
            self.fill_value.clone(),
        );
        builder
            .chunk_key_encoding(chunk_key_encoding)
            .dimension_names(self.dimension_names.clone())
            .attributes(self.attributes.clone());
        builder
    }

    /// The element bytes as `zarrs` array bytes.
    pub(crate) fn array_bytes(&self) -> ArrayBytes<'_> {
        ArrayBytes::from(self.bytes.as_slice())
    }
}
