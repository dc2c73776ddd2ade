//! The store builder.
//!
//! [`create_store`] writes a [`Dataset`] to a new store and makes the chunks declared as no-data checkable under a [`NoDataStrategy`]:
//!  - [`NoDataStrategy::Manifest`]: the declared chunks are deleted after writing, and listed in a manifest per array,
//!  - [`NoDataStrategy::EmptyChunks`]: the fill value chunks written for the declared chunks are kept.
//!
//! The built store is checked before returning, so a successful build always yields a store that passes [`check_store`](crate::check_store).

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use itertools::Itertools;
use thiserror::Error;
use xzarrguard_filesystem::{FilesystemStore, FilesystemStoreCreateError};
use xzarrguard_storage::{ReadableStorageTraits, StorageError};

use crate::{
    chunk::{coord_to_indices, ChunkAddressError, ChunkAddressing},
    config::{CheckOptions, CreateOptions, NoDataStrategy},
    dataset::{Dataset, DatasetError, DatasetWriter, ZarrV3Writer},
    integrity::{check_storage, CheckError},
    layout::{scan_array_specs, ArraySpec, LayoutError},
    manifest::{
        manifest_path, normalize_no_data_chunks, write_variable_manifest, ManifestError,
        NoDataChunks,
    },
    report::{CreateReport, IntegrityReport},
};

/// A store creation error.
#[derive(Debug, Error)]
pub enum CreateError {
    /// The target exists and overwriting was not requested.
    #[error("Store already exists: {}", .0.display())]
    AlreadyExists(PathBuf),
    /// The no-data mapping names variables that are not arrays of the dataset.
    #[error("Unknown variables in no_data_chunks: {}", .0.join(", "))]
    UnknownVariables(Vec<String>),
    /// A no-data chunk coordinate lies outside the chunk grid of its array.
    #[error("Chunk coord {coord:?} out of bounds for variable {variable}")]
    OutOfBounds {
        /// The variable name.
        variable: String,
        /// The chunk coordinate.
        coord: Vec<i64>,
    },
    /// A chunk declared as no-data was not written by the dataset writer.
    #[error("Expected chunk file missing after writing empty chunks: {variable}:{coord:?}")]
    PlaceholderMissing {
        /// The variable name.
        variable: String,
        /// The chunk coordinate.
        coord: Vec<i64>,
    },
    /// The built store did not pass its integrity check.
    #[error("Created store failed integrity validation")]
    IntegrityFailure(Box<IntegrityReport>),
    /// A dataset error.
    #[error(transparent)]
    DatasetError(#[from] DatasetError),
    /// A layout error.
    #[error(transparent)]
    LayoutError(#[from] LayoutError),
    /// A chunk addressing error.
    #[error(transparent)]
    ChunkAddressError(#[from] ChunkAddressError),
    /// A manifest error.
    #[error(transparent)]
    ManifestError(#[from] ManifestError),
    /// A check error.
    #[error(transparent)]
    CheckError(#[from] CheckError),
    /// A storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// A filesystem store creation error.
    #[error(transparent)]
    FilesystemStoreCreateError(#[from] FilesystemStoreCreateError),
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
}

/// Create a store at `store_path` from `dataset` with the bundled [`ZarrV3Writer`].
///
/// See [`create_store_with_writer`].
///
/// # Errors
/// See [`create_store_with_writer`].
pub fn create_store(
    dataset: &Dataset,
    store_path: impl AsRef<Path>,
    no_data_chunks: Option<&NoDataChunks>,
    options: &CreateOptions,
) -> Result<CreateReport, CreateError> {
    let writer = ZarrV3Writer::new().with_consolidated_metadata(options.consolidated_metadata());
    create_store_with_writer(&writer, dataset, store_path, no_data_chunks, options)
}

/// Check a normalised no-data mapping against the arrays of a dataset without touching the filesystem.
fn validate_no_data_chunks(
    dataset: &Dataset,
    no_data_chunks: &NoDataChunks,
) -> Result<(), CreateError> {
    let unknown = no_data_chunks
        .keys()
        .filter(|variable| dataset.array(variable).is_none())
        .cloned()
        .collect_vec();
    if !unknown.is_empty() {
        return Err(CreateError::UnknownVariables(unknown));
    }
    for (variable, coords) in no_data_chunks {
        let Some(array) = dataset.array(variable) else {
            continue;
        };
        let grid_shape = array
            .chunk_grid()
            .grid_shape(array.shape())
            .map_err(DatasetError::from)?;
        if let Some(coord) = coords.iter().find(|coord| {
            coord_to_indices(coord).is_none_or(|indices| {
                !xzarrguard_chunk_grid::indices_inbounds(&indices, &grid_shape)
            })
        }) {
            return Err(CreateError::OutOfBounds {
                variable: variable.clone(),
                coord: coord.clone(),
            });
        }
    }
    Ok(())
}

/// Create a store at `store_path` from `dataset` with `writer`.
///
/// The no-data mapping is normalised and validated against the dataset before anything is written.
/// Then:
///  - an existing store is removed if [`CreateOptions::overwrite`] is set,
///  - the dataset is written with `writer`, which must write every chunk,
///  - each declared chunk is deleted (removing directories left empty up to the array root) or verified present, per the [`NoDataStrategy`],
///  - under [`NoDataStrategy::Manifest`], a manifest is written for every variable in the mapping,
///  - the store is checked, and the build fails if the check does not pass.
///
/// # Errors
/// Returns a [`CreateError`] if:
///  - the store exists and overwriting was not requested,
///  - the no-data mapping names an unknown variable or an out of bounds coordinate,
///  - a declared chunk was not written under [`NoDataStrategy::EmptyChunks`],
///  - the built store fails its integrity check, or
///  - there is an underlying dataset, store, or manifest error.
pub fn create_store_with_writer(
    writer: &dyn DatasetWriter,
    dataset: &Dataset,
    store_path: impl AsRef<Path>,
    no_data_chunks: Option<&NoDataChunks>,
    options: &CreateOptions,
) -> Result<CreateReport, CreateError> {
    let store_path = store_path.as_ref();
    let strategy = options.no_data_strategy();
    if store_path.exists() && !options.overwrite() {
        return Err(CreateError::AlreadyExists(store_path.to_path_buf()));
    }
    let no_data_chunks = normalize_no_data_chunks(no_data_chunks.cloned().unwrap_or_default());
    validate_no_data_chunks(dataset, &no_data_chunks)?;

    if store_path.is_dir() {
        log::info!("removing existing store {}", store_path.display());
        std::fs::remove_dir_all(store_path)?;
    } else if store_path.exists() {
        std::fs::remove_file(store_path)?;
    }
    if let Some(parent) = store_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    writer.write(dataset, store_path)?;

    let storage = FilesystemStore::new(store_path)?;
    let specs: BTreeMap<String, ArraySpec> = scan_array_specs(&storage)?
        .into_iter()
        .map(|spec| (spec.name().to_string(), spec))
        .collect();
    let unknown = no_data_chunks
        .keys()
        .filter(|variable| !specs.contains_key(*variable))
        .cloned()
        .collect_vec();
    if !unknown.is_empty() {
        return Err(CreateError::UnknownVariables(unknown));
    }

    let mut report = CreateReport {
        manifests_written: Vec::new(),
        no_data_strategy: strategy,
        ok: false,
        removed_chunks: BTreeMap::new(),
        store_path: store_path.display().to_string(),
    };
    for (variable, coords) in &no_data_chunks {
        let Some(spec) = specs.get(variable) else {
            continue;
        };
        let addressing = ChunkAddressing::new(spec)?;
        let mut refs = Vec::with_capacity(coords.len());
        for coord in coords {
            let Some(indices) = coord_to_indices(coord).filter(|_| addressing.contains(coord))
            else {
                return Err(CreateError::OutOfBounds {
                    variable: variable.clone(),
                    coord: coord.clone(),
                });
            };
            let key = addressing.chunk_store_key(&indices)?;
            match strategy {
                NoDataStrategy::Manifest => {
                    storage.erase_pruning_empty(&key, spec.path())?;
                }
                NoDataStrategy::EmptyChunks => {
                    if !storage.exists(&key)? {
                        return Err(CreateError::PlaceholderMissing {
                            variable: variable.clone(),
                            coord: coord.clone(),
                        });
                    }
                }
            }
            refs.push(addressing.chunk_ref(&indices));
        }

        if strategy == NoDataStrategy::Manifest {
            write_variable_manifest(&storage, variable, refs.iter().cloned())?;
            let path = manifest_path(store_path, variable);
            log::info!(
                "removed {} chunks of {variable}, wrote {}",
                refs.len(),
                path.display()
            );
            report.manifests_written.push(path.display().to_string());
            report.removed_chunks.insert(variable.clone(), refs);
        }
    }

    let integrity = check_storage(
        &storage,
        report.store_path.clone(),
        &CheckOptions::default().with_strict_stale_manifest(false),
    )?;
    report.ok = integrity.is_ok();
    if !report.ok {
        log::warn!("created store failed integrity validation:\n{integrity}");
        return Err(CreateError::IntegrityFailure(Box::new(integrity)));
    }
    Ok(report)
}
