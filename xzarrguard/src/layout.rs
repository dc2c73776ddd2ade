//! Resolution of the arrays in a store.
//!
//! [`scan_array_specs`] reads the root `zarr.json` of a store and returns an [`ArraySpec`] for every array in the hierarchy.
//! If the root group embeds consolidated metadata, every array is resolved from it without touching child nodes.
//! Otherwise the hierarchy is walked from the root, descending into groups only.

use std::num::NonZeroU64;

use thiserror::Error;
use xzarrguard_chunk_grid::{ChunkGridCreateError, RegularChunkGrid};
use xzarrguard_chunk_key_encoding::{ChunkKeyEncoding, ChunkKeyEncodingError};
use xzarrguard_metadata::{
    ArrayMetadataV3, ArrayShape, GroupMetadataV3, MetadataV3, NodeMetadataError, NodeMetadataV3,
    ZARR_JSON,
};
use xzarrguard_storage::{ReadableListableStorageTraits, StorageError, StorePrefix};

use crate::manifest::INTERNAL_DIRECTORY;

/// The chunk layout of an array.
///
/// Derived from array metadata on every check or create, and never persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct ArraySpec {
    name: String,
    path: StorePrefix,
    shape: ArrayShape,
    chunk_grid: RegularChunkGrid,
    chunk_key_encoding: MetadataV3,
}

impl ArraySpec {
    /// Create a new array spec.
    ///
    /// The rank of `shape` and `chunk_shape` are not compared here, a mismatch is reported when chunks are addressed.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        path: StorePrefix,
        shape: ArrayShape,
        chunk_shape: Vec<NonZeroU64>,
        chunk_key_encoding: MetadataV3,
    ) -> Self {
        Self {
            name: name.into(),
            path,
            shape,
            chunk_grid: RegularChunkGrid::new(chunk_shape),
            chunk_key_encoding,
        }
    }

    /// Create an array spec from array metadata.
    ///
    /// An absent chunk key encoding is the `default` encoding with a `/` separator.
    ///
    /// # Errors
    /// Returns [`ChunkGridCreateError`] if the chunk grid is not a valid regular chunk grid.
    pub fn from_metadata(
        name: impl Into<String>,
        path: StorePrefix,
        metadata: &ArrayMetadataV3,
    ) -> Result<Self, ChunkGridCreateError> {
        Ok(Self {
            name: name.into(),
            path,
            shape: metadata.shape.clone(),
            chunk_grid: RegularChunkGrid::try_from(&metadata.chunk_grid)?,
            chunk_key_encoding: metadata
                .chunk_key_encoding
                .clone()
                .unwrap_or_else(|| ChunkKeyEncoding::default().to_metadata()),
        })
    }

    /// The logical name of the array, its path within the store joined with `/`.
    ///
    /// An array at the root of a store has an empty name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The prefix holding the array metadata and chunks.
    #[must_use]
    pub fn path(&self) -> &StorePrefix {
        &self.path
    }

    /// The array shape.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// The chunk grid.
    #[must_use]
    pub fn chunk_grid(&self) -> &RegularChunkGrid {
        &self.chunk_grid
    }

    /// The chunk shape.
    #[must_use]
    pub fn chunk_shape(&self) -> Vec<u64> {
        self.chunk_grid.chunk_shape_u64()
    }

    /// The chunk key encoding metadata.
    #[must_use]
    pub fn chunk_key_encoding_metadata(&self) -> &MetadataV3 {
        &self.chunk_key_encoding
    }

    /// The chunk key encoding.
    ///
    /// # Errors
    /// Returns [`ChunkKeyEncodingError`] if the encoding is unsupported or its configuration is invalid.
    pub fn chunk_key_encoding(&self) -> Result<ChunkKeyEncoding, ChunkKeyEncodingError> {
        ChunkKeyEncoding::try_from(&self.chunk_key_encoding)
    }
}

/// A store level layout error.
///
/// Any of these aborts a check before per-array results are produced.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// A metadata document is missing.
    #[error("Missing metadata: {0}")]
    MissingMetadata(String),
    /// A metadata document is invalid or has an unsupported `zarr_format`.
    #[error("{source}: {location}")]
    InvalidMetadata {
        /// The location of the metadata.
        location: String,
        /// The metadata error.
        source: NodeMetadataError,
    },
    /// The chunk grid of an array is unsupported.
    #[error("{source}: {location}")]
    UnsupportedChunkGrid {
        /// The location of the metadata.
        location: String,
        /// The chunk grid error.
        source: ChunkGridCreateError,
    },
    /// A storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
}

fn read_node<TStorage: ?Sized + ReadableListableStorageTraits>(
    storage: &TStorage,
    prefix: &StorePrefix,
) -> Result<Option<NodeMetadataV3>, LayoutError> {
    let key = prefix.key(ZARR_JSON).map_err(StorageError::from)?;
    let Some(bytes) = storage.get(&key)? else {
        return Ok(None);
    };
    NodeMetadataV3::from_slice(&bytes)
        .map(Some)
        .map_err(|source| LayoutError::InvalidMetadata {
            location: key.to_string(),
            source,
        })
}

fn array_spec(
    name: &str,
    path: StorePrefix,
    metadata: &ArrayMetadataV3,
    location: impl FnOnce() -> String,
) -> Result<ArraySpec, LayoutError> {
    ArraySpec::from_metadata(name, path, metadata).map_err(|source| {
        LayoutError::UnsupportedChunkGrid {
            location: location(),
            source,
        }
    })
}

fn prefix_name(prefix: &StorePrefix) -> &str {
    prefix.as_str().trim_end_matches('/')
}

/// Return the spec of every array in a store, sorted by name.
///
/// Consolidated metadata in the root group takes precedence over the metadata documents of child nodes, which are then never read.
/// Without it, the hierarchy is walked from the root with an explicit worklist.
/// The walk descends into child directories of groups that hold a `zarr.json`, never into arrays or the internal `.xzarrguard` directory.
/// Nodes with an unrecognised `node_type` are skipped.
///
/// # Errors
/// Returns a [`LayoutError`] if the root metadata is missing, any visited metadata is invalid or has an unsupported `zarr_format`, an array does not use a regular chunk grid, or there is an underlying store error.
pub fn scan_array_specs<TStorage: ?Sized + ReadableListableStorageTraits>(
    storage: &TStorage,
) -> Result<Vec<ArraySpec>, LayoutError> {
    let root = read_node(storage, &StorePrefix::root())?
        .ok_or_else(|| LayoutError::MissingMetadata(ZARR_JSON.to_string()))?;

    let mut specs = if let NodeMetadataV3::Group(GroupMetadataV3 {
        consolidated_metadata: Some(consolidated),
        ..
    }) = &root
    {
        log::debug!("resolving arrays from consolidated metadata");
        scan_consolidated(&consolidated.metadata)?
    } else {
        log::debug!("resolving arrays by walking the hierarchy");
        scan_hierarchy(storage, root)?
    };
    specs.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(specs)
}

fn scan_consolidated(
    metadata: &serde_json::Map<String, serde_json::Value>,
) -> Result<Vec<ArraySpec>, LayoutError> {
    let mut specs = Vec::new();
    for (name, node) in metadata {
        let name = name.trim_matches('/');
        let location = || format!("{ZARR_JSON}#consolidated_metadata/{name}");
        let node = NodeMetadataV3::from_value(node.clone()).map_err(|source| {
            LayoutError::InvalidMetadata {
                location: location(),
                source,
            }
        })?;
        match node {
            NodeMetadataV3::Array(array) => {
                let path = if name.is_empty() {
                    StorePrefix::root()
                } else {
                    StorePrefix::root()
                        .child(name)
                        .map_err(StorageError::from)?
                };
                log::debug!("found array {name} in consolidated metadata");
                specs.push(array_spec(name, path, &array, location)?);
            }
            NodeMetadataV3::Group(_) => {}
            NodeMetadataV3::Unknown(node_type) => {
                log::warn!(
                    "Consolidated metadata entry {name} has unrecognised node_type {node_type}. Ignoring."
                );
            }
        }
    }
    Ok(specs)
}

fn scan_hierarchy<TStorage: ?Sized + ReadableListableStorageTraits>(
    storage: &TStorage,
    root: NodeMetadataV3,
) -> Result<Vec<ArraySpec>, LayoutError> {
    let mut specs = Vec::new();
    let mut pending = vec![(StorePrefix::root(), root)];
    while let Some((prefix, node)) = pending.pop() {
        match node {
            NodeMetadataV3::Array(array) => {
                let name = prefix_name(&prefix).to_string();
                log::debug!("found array {name}");
                let location = || format!("{}{ZARR_JSON}", prefix.as_str());
                specs.push(array_spec(&name, prefix.clone(), &array, location)?);
            }
            NodeMetadataV3::Group(_) => {
                let children = storage.list_dir(&prefix)?;
                for child in children.prefixes().iter().rev() {
                    if prefix_name(child).rsplit('/').next() == Some(INTERNAL_DIRECTORY) {
                        continue;
                    }
                    if let Some(child_node) = read_node(storage, child)? {
                        pending.push((child.clone(), child_node));
                    } else {
                        log::debug!(
                            "directory {child} has no {ZARR_JSON} and is not part of the hierarchy"
                        );
                    }
                }
            }
            NodeMetadataV3::Unknown(node_type) => {
                log::warn!(
                    "Object at {prefix} has unrecognised node_type {node_type}. Ignoring."
                );
            }
        }
    }
    Ok(specs)
}
