use std::num::NonZeroU64;

use monostate::MustBe;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{AdditionalFields, MetadataV3};

/// The shape of an array.
pub type ArrayShape = Vec<u64>;

/// Zarr V3 array metadata.
///
/// Only `shape` and `chunk_grid` are required when reading.
/// The remaining fields are optional so that metadata written by other tools with a reduced field set still parses.
///
/// An example `JSON` document for a Zarr V3 array:
/// ```json
/// {
///     "zarr_format": 3,
///     "node_type": "array",
///     "shape": [4, 4],
///     "data_type": "float32",
///     "chunk_grid": {
///         "name": "regular",
///         "configuration": {
///             "chunk_shape": [2, 2]
///         }
///     },
///     "chunk_key_encoding": {
///         "name": "default",
///         "configuration": {
///             "separator": "/"
///         }
///     },
///     "fill_value": "NaN",
///     "codecs": [{"name": "bytes", "configuration": {"endian": "little"}}]
/// }
/// ```
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct ArrayMetadataV3 {
    /// An integer defining the version of the storage specification to which the array adheres. Must be `3`.
    pub zarr_format: MustBe!(3u64),
    /// A string defining the type of hierarchy node element, must be `array` here.
    pub node_type: MustBe!("array"),
    /// An array of integers providing the length of each dimension of the Zarr array.
    pub shape: ArrayShape,
    /// The data type of the Zarr array.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<MetadataV3>,
    /// The chunk grid of the Zarr array.
    pub chunk_grid: MetadataV3,
    /// The mapping from chunk grid cell coordinates to keys in the underlying store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_key_encoding: Option<MetadataV3>,
    /// Provides an element value to use for uninitialised portions of the Zarr array.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub fill_value: Value,
    /// Specifies a list of codecs to be used for encoding and decoding chunks.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub codecs: Vec<MetadataV3>,
    /// Optional user defined attributes.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub attributes: serde_json::Map<String, Value>,
    /// An optional list of dimension names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension_names: Option<Vec<Option<String>>>,
    /// Additional fields.
    #[serde(flatten)]
    pub additional_fields: AdditionalFields,
}

impl ArrayMetadataV3 {
    /// Create new array metadata with a `shape` and `chunk_grid`.
    ///
    /// Other fields are unset and can be filled with the `with_` methods.
    #[must_use]
    pub fn new(shape: ArrayShape, chunk_grid: MetadataV3) -> Self {
        Self {
            zarr_format: MustBe!(3u64),
            node_type: MustBe!("array"),
            shape,
            data_type: None,
            chunk_grid,
            chunk_key_encoding: None,
            fill_value: Value::Null,
            codecs: Vec::new(),
            attributes: serde_json::Map::default(),
            dimension_names: None,
            additional_fields: AdditionalFields::default(),
        }
    }

    /// Set the data type.
    #[must_use]
    pub fn with_data_type(mut self, data_type: MetadataV3) -> Self {
        self.data_type = Some(data_type);
        self
    }

    /// Set the chunk key encoding.
    #[must_use]
    pub fn with_chunk_key_encoding(mut self, chunk_key_encoding: MetadataV3) -> Self {
        self.chunk_key_encoding = Some(chunk_key_encoding);
        self
    }

    /// Set the fill value.
    #[must_use]
    pub fn with_fill_value(mut self, fill_value: Value) -> Self {
        self.fill_value = fill_value;
        self
    }

    /// Set the codecs.
    #[must_use]
    pub fn with_codecs(mut self, codecs: Vec<MetadataV3>) -> Self {
        self.codecs = codecs;
        self
    }

    /// Set the dimension names.
    #[must_use]
    pub fn with_dimension_names(mut self, dimension_names: Option<Vec<Option<String>>>) -> Self {
        self.dimension_names = dimension_names;
        self
    }
}

/// Configuration of the `regular` chunk grid.
///
/// Every chunk shape entry must be positive.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
pub struct RegularChunkGridConfiguration {
    /// The shape of each chunk.
    pub chunk_shape: Vec<NonZeroU64>,
}

impl RegularChunkGridConfiguration {
    /// The name of the regular chunk grid.
    pub const NAME: &'static str = "regular";
}
