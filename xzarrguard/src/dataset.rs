//! An in-memory dataset: a collection of named arrays, and its serialisation to and from a store.
//!
//! A [`Dataset`] is the input of [`create_store`](crate::create_store).
//! It is written by a [`DatasetWriter`] and read back by a [`DatasetReader`].
//! The bundled [`ZarrV3Writer`] and [`ZarrV3Reader`] serialise arrays with [`zarrs`], in the Zarr V3 format with uncompressed chunks.
//!
//! ```
//! # use std::num::NonZeroU64;
//! # use xzarrguard::dataset::{Dataset, DatasetArray};
//! let chunk_shape = vec![NonZeroU64::new(2).unwrap(); 2];
//! let array = DatasetArray::from_elements(vec![4, 4], chunk_shape, &[0.0f32; 16])?
//!     .with_fill_value(f32::NAN)?;
//! let dataset = Dataset::new().with_array("group/var", array)?;
//! assert_eq!(dataset.names().collect::<Vec<_>>(), ["group/var"]);
//! # Ok::<_, Box<dyn std::error::Error>>(())
//! ```

mod array;
mod data_type;
mod reader;
mod writer;

use std::collections::BTreeMap;

pub use array::DatasetArray;
pub use data_type::{DataType, Element};
pub use reader::{DatasetReader, ZarrV3Reader};
pub use writer::{DatasetWriter, ZarrV3Writer};

use thiserror::Error;
use xzarrguard_chunk_grid::IncompatibleDimensionalityError;
use xzarrguard_filesystem::FilesystemStoreCreateError;
use xzarrguard_metadata::{NodeMetadataError, ZARR_JSON};
use xzarrguard_storage::StorageError;

use crate::{chunk::ChunkAddressError, layout::LayoutError, manifest::INTERNAL_DIRECTORY};

/// A dataset error.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// An array name is invalid.
    #[error("invalid array name '{0}'")]
    InvalidName(String),
    /// An array name collides with another array or with a group holding arrays.
    #[error("array name '{0}' conflicts with an existing array or group")]
    NameConflict(String),
    /// The array shape and chunk shape have different ranks.
    #[error("chunk shape does not match array shape: {0}")]
    IncompatibleDimensionality(#[from] IncompatibleDimensionalityError),
    /// An element type does not match the array data type.
    #[error("data type mismatch: array is {expected}, found {found}")]
    DataTypeMismatch {
        /// The array data type.
        expected: DataType,
        /// The data type of the element.
        found: DataType,
    },
    /// The data type is unsupported.
    #[error("unsupported data type '{0}'")]
    UnsupportedDataType(String),
    /// An array is too large to address.
    #[error("array is too large")]
    TooLarge,
    /// Array metadata is missing.
    #[error("missing metadata {0}")]
    MissingMetadata(String),
    /// A node expected to be an array is not.
    #[error("{0} is not array metadata")]
    NotAnArray(String),
    /// Invalid node metadata.
    #[error(transparent)]
    NodeMetadataError(#[from] NodeMetadataError),
    /// A metadata serialisation error.
    #[error(transparent)]
    InvalidJson(#[from] serde_json::Error),
    /// A layout error.
    #[error(transparent)]
    LayoutError(#[from] LayoutError),
    /// A chunk addressing error.
    #[error(transparent)]
    ChunkAddressError(#[from] ChunkAddressError),
    /// A storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// A filesystem store creation error.
    #[error(transparent)]
    FilesystemStoreCreateError(#[from] FilesystemStoreCreateError),
    /// An array could not be created or opened.
    #[error(transparent)]
    ArrayCreateError(#[from] zarrs::array::ArrayCreateError),
    /// An array could not be stored or retrieved.
    #[error(transparent)]
    ArrayError(#[from] zarrs::array::ArrayError),
    /// A storage error of an array store.
    #[error(transparent)]
    ArrayStorageError(#[from] zarrs::storage::StorageError),
    /// An array store creation error.
    #[error(transparent)]
    ArrayStoreCreateError(#[from] zarrs::filesystem::FilesystemStoreCreateError),
}

/// A named collection of [`DatasetArray`]s.
///
/// Names are paths of arrays in the hierarchy, with `/` separating groups.
/// They are non-empty, and no component is empty, `.`, `..`, `zarr.json`, or the internal `.xzarrguard` directory.
/// No array name may be a group of another array.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    arrays: BTreeMap<String, DatasetArray>,
}

impl Dataset {
    /// Create an empty dataset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `name` is a valid array name.
    #[must_use]
    pub fn validate_name(name: &str) -> bool {
        !name.is_empty()
            && name.split('/').all(|part| {
                !part.is_empty()
                    && part != "."
                    && part != ".."
                    && part != ZARR_JSON
                    && part != INTERNAL_DIRECTORY
            })
    }

    /// Add an array.
    ///
    /// # Errors
    /// Returns [`DatasetError::InvalidName`] if `name` is invalid, or [`DatasetError::NameConflict`] if it collides with an existing array or group.
    pub fn add_array(
        &mut self,
        name: impl Into<String>,
        array: DatasetArray,
    ) -> Result<&mut Self, DatasetError> {
        let name = name.into();
        if !Self::validate_name(&name) {
            return Err(DatasetError::InvalidName(name));
        }
        let is_group_of = |parent: &str, child: &str| {
            child
                .strip_prefix(parent)
                .is_some_and(|rest| rest.starts_with('/'))
        };
        if self.arrays.keys().any(|existing| {
            existing == &name || is_group_of(existing, &name) || is_group_of(&name, existing)
        }) {
            return Err(DatasetError::NameConflict(name));
        }
        self.arrays.insert(name, array);
        Ok(self)
    }

    /// Add an array, returning the dataset.
    ///
    /// # Errors
    /// See [`Dataset::add_array`].
    pub fn with_array(
        mut self,
        name: impl Into<String>,
        array: DatasetArray,
    ) -> Result<Self, DatasetError> {
        self.add_array(name, array)?;
        Ok(self)
    }

    /// The arrays, sorted by name.
    #[must_use]
    pub fn arrays(&self) -> &BTreeMap<String, DatasetArray> {
        &self.arrays
    }

    /// The array `name`.
    #[must_use]
    pub fn array(&self, name: &str) -> Option<&DatasetArray> {
        self.arrays.get(name)
    }

    /// The array names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.arrays.keys().map(String::as_str)
    }

    /// The number of arrays.
    #[must_use]
    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    /// Returns true if the dataset has no arrays.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU64;

    use super::*;

    fn array() -> DatasetArray {
        DatasetArray::from_elements(vec![2], vec![NonZeroU64::new(1).unwrap()], &[0i8, 1])
            .unwrap()
    }

    #[test]
    fn dataset_names() {
        assert!(Dataset::validate_name("var"));
        assert!(Dataset::validate_name("group/var"));
        assert!(!Dataset::validate_name(""));
        assert!(!Dataset::validate_name("/var"));
        assert!(!Dataset::validate_name("group//var"));
        assert!(!Dataset::validate_name("var/"));
        assert!(!Dataset::validate_name("../var"));
        assert!(!Dataset::validate_name(".xzarrguard/var"));
        assert!(!Dataset::validate_name("group/.xzarrguard"));
    }

    #[test]
    fn dataset_conflicts() {
        let mut dataset = Dataset::new();
        dataset.add_array("a/b", array()).unwrap();
        dataset.add_array("a/c", array()).unwrap();
        dataset.add_array("ab", array()).unwrap();
        assert!(matches!(
            dataset.add_array("a", array()),
            Err(DatasetError::NameConflict(_))
        ));
        assert!(matches!(
            dataset.add_array("a/b/c", array()),
            Err(DatasetError::NameConflict(_))
        ));
        assert!(matches!(
            dataset.add_array("a/b", array()),
            Err(DatasetError::NameConflict(_))
        ));
        assert_eq!(dataset.names().collect::<Vec<_>>(), ["a/b", "a/c", "ab"]);
    }
}
