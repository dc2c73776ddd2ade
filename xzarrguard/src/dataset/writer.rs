use std::{collections::BTreeSet, path::Path, sync::Arc};

use xzarrguard_metadata::{
    ConsolidatedMetadata, ConsolidatedMetadataKind, GroupMetadataV3, ZARR_JSON,
};
use zarrs::{
    array::CodecOptions,
    filesystem::FilesystemStore,
    storage::{Bytes, StorageError, StoreKey, WritableStorageTraits},
};

use super::{Dataset, DatasetError};

/// Serialises a [`Dataset`] to a store.
///
/// A writer used to build a store must write every chunk of every array, including chunks holding only the fill value.
pub trait DatasetWriter {
    /// Write `dataset` to a new store at `store_path`.
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if the dataset cannot be written.
    fn write(&self, dataset: &Dataset, store_path: &Path) -> Result<(), DatasetError>;
}

/// Writes a [`Dataset`] as a Zarr V3 hierarchy with `zarrs`.
///
/// The root and every intermediate group get group metadata, and each array is uncompressed with a `bytes` codec.
/// Empty chunks are stored, so every chunk of every array is written.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZarrV3Writer {
    consolidated_metadata: bool,
}

impl ZarrV3Writer {
    /// Create a new writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether consolidated metadata is embedded in the root group.
    #[must_use]
    pub fn with_consolidated_metadata(mut self, consolidated_metadata: bool) -> Self {
        self.consolidated_metadata = consolidated_metadata;
        self
    }
}

fn set_json(
    storage: &FilesystemStore,
    path: &str,
    metadata: &GroupMetadataV3,
) -> Result<(), DatasetError> {
    let key = if path.is_empty() {
        ZARR_JSON.to_string()
    } else {
        format!("{path}/{ZARR_JSON}")
    };
    storage.set(
        &StoreKey::new(key).map_err(StorageError::from)?,
        Bytes::from(serde_json::to_vec_pretty(metadata)?),
    )?;
    Ok(())
}

impl DatasetWriter for ZarrV3Writer {
    fn write(&self, dataset: &Dataset, store_path: &Path) -> Result<(), DatasetError> {
        let storage = Arc::new(FilesystemStore::new(store_path)?);
        let groups: BTreeSet<&str> = dataset
            .names()
            .flat_map(|name| {
                name.match_indices('/')
                    .map(move |(index, _)| &name[..index])
            })
            .collect();
        let mut consolidated = serde_json::Map::new();

        for group in &groups {
            let metadata = GroupMetadataV3::new();
            set_json(&storage, group, &metadata)?;
            consolidated.insert((*group).to_string(), serde_json::to_value(&metadata)?);
        }

        let options = CodecOptions::default().with_store_empty_chunks(true);
        for (name, dataset_array) in dataset.arrays() {
            let array = dataset_array
                .builder()
                .build(storage.clone(), &format!("/{name}"))?;
            array.store_metadata()?;
            array.store_array_subset_opt(
                &array.subset_all(),
                dataset_array.array_bytes(),
                &options,
            )?;
            consolidated.insert(name.clone(), serde_json::to_value(array.metadata())?);
            log::debug!("wrote array {name}");
        }

        let root = GroupMetadataV3::new().with_consolidated_metadata(
            self.consolidated_metadata.then(|| ConsolidatedMetadata {
                metadata: consolidated,
                kind: ConsolidatedMetadataKind::Inline,
                must_understand: false,
            }),
        );
        set_json(&storage, "", &root)?;
        Ok(())
    }
}
