use std::{path::Path, sync::Arc};

use xzarrguard_filesystem::FilesystemStore;
use xzarrguard_metadata::{NodeMetadataV3, ZARR_JSON};
use xzarrguard_storage::{ReadableStorageTraits, StorageError};
use zarrs::array::{Array, ArrayBytes, ArrayError};

use super::{DataType, Dataset, DatasetArray, DatasetError};
use crate::{chunk::ChunkAddressing, layout::scan_array_specs};

/// Deserialises a [`Dataset`] from a store.
pub trait DatasetReader {
    /// Read the dataset in the store at `store_path`.
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if the store cannot be read or holds arrays that cannot be represented.
    fn read(&self, store_path: &Path) -> Result<Dataset, DatasetError>;
}

/// Reads a Zarr V3 hierarchy into a [`Dataset`] with `zarrs`.
///
/// Arrays are found the same way the integrity check finds them, and must have a supported [`DataType`].
/// Missing chunks read as the fill value.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZarrV3Reader;

impl ZarrV3Reader {
    /// Create a new reader.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl DatasetReader for ZarrV3Reader {
    fn read(&self, store_path: &Path) -> Result<Dataset, DatasetError> {
        if !store_path.is_dir() {
            return Err(DatasetError::MissingMetadata(
                store_path.join(ZARR_JSON).display().to_string(),
            ));
        }
        let storage = FilesystemStore::new(store_path)?;
        let array_storage = Arc::new(zarrs::filesystem::FilesystemStore::new(store_path)?);

        let mut dataset = Dataset::new();
        for spec in scan_array_specs(&storage)? {
            let key = spec.path().key(ZARR_JSON).map_err(StorageError::from)?;
            let bytes = storage
                .get(&key)?
                .ok_or_else(|| DatasetError::MissingMetadata(key.to_string()))?;
            let NodeMetadataV3::Array(metadata) = NodeMetadataV3::from_slice(&bytes)? else {
                return Err(DatasetError::NotAnArray(key.to_string()));
            };
            let data_type = metadata
                .data_type
                .as_ref()
                .ok_or_else(|| DatasetError::UnsupportedDataType(String::new()))
                .and_then(DataType::try_from)?;

            let array = Array::open(array_storage.clone(), &format!("/{}", spec.name()))?;
            let elements = array
                .retrieve_array_subset::<ArrayBytes>(&array.subset_all())?
                .into_fixed()
                .map_err(ArrayError::from)?
                .into_owned();

            let dataset_array = DatasetArray::new(
                metadata.shape.clone(),
                spec.chunk_grid().chunk_shape().to_vec(),
                data_type,
                elements,
            )?
            .with_stored_fill_value(array.fill_value().clone())
            .with_chunk_key_encoding(ChunkAddressing::new(&spec)?.encoding())
            .with_dimension_names(metadata.dimension_names.clone())
            .with_attributes(metadata.attributes.clone());
            log::debug!("read array {}", spec.name());
            dataset.add_array(spec.name(), dataset_array)?;
        }
        Ok(dataset)
    }
}
