//! Per-array manifests of chunks that are intentionally absent, and the no-data document used to declare them.
//!
//! A manifest lives at `.xzarrguard/manifests/<name>.json` relative to the store root, where `<name>` is the percent-encoded array name.
//! Percent-encoding keeps arrays in nested groups from colliding with the directory structure.
//!
//! ```json
//! {
//!   "allowed_missing": [
//!     {
//!       "coord": [0, 1],
//!       "key": "c/0/1"
//!     }
//!   ],
//!   "schema_version": 1,
//!   "variable": "var",
//!   "zarr_format": 3
//! }
//! ```
//!
//! The no-data document maps array names to lists of chunk coordinates:
//! ```json
//! {
//!   "var": [[0, 1], [1, 1]]
//! }
//! ```

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use xzarrguard_metadata::ZARR_FORMAT;
use xzarrguard_storage::{
    Bytes, ReadableStorageTraits, StorageError, StoreKey, StoreKeyError, WritableStorageTraits,
};

use crate::chunk::{ChunkRef, Coord};

/// The supported manifest schema version.
pub const MANIFEST_SCHEMA_VERSION: u64 = 1;

/// The name of the internal directory at the store root. It is never part of the hierarchy.
pub const INTERNAL_DIRECTORY: &str = ".xzarrguard";

/// The directory holding manifests, relative to the store root.
pub const MANIFEST_DIRECTORY: &str = ".xzarrguard/manifests";

/// A mapping from array name to the chunk coordinates declared as no-data.
pub type NoDataChunks = BTreeMap<String, Vec<Vec<i64>>>;

/// A manifest error.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// A storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// A manifest is not valid JSON or has an invalid structure.
    #[error("invalid manifest {location}: {source}")]
    InvalidJson {
        /// The manifest location.
        location: String,
        /// The JSON error.
        source: serde_json::Error,
    },
    /// A manifest has an unsupported `schema_version`.
    #[error("Unsupported manifest schema in {0}")]
    UnsupportedSchema(String),
    /// The no-data document is not valid JSON.
    #[error("invalid no-data mapping: {0}")]
    InvalidNoDataJson(#[source] serde_json::Error),
    /// The no-data document is not a JSON object.
    #[error("No-data mapping must be an object")]
    NoDataNotAnObject,
    /// The coordinates of a variable in the no-data document are not a list of integer lists.
    #[error("invalid no-data coordinates for variable {variable}: {source}")]
    InvalidNoDataCoordinates {
        /// The variable name.
        variable: String,
        /// The JSON error.
        source: serde_json::Error,
    },
}

/// Fields are declared in sorted order, so serialisation is key sorted.
#[derive(Serialize, Deserialize)]
struct ManifestDocument {
    #[serde(default)]
    allowed_missing: Vec<ChunkRef>,
    schema_version: u64,
    #[serde(default)]
    variable: String,
    #[serde(default = "default_zarr_format", alias = "format_version")]
    zarr_format: u64,
}

const fn default_zarr_format() -> u64 {
    ZARR_FORMAT
}

fn manifest_file_name(variable: &str) -> String {
    format!("{}.json", urlencoding::encode(variable))
}

/// Return the store key of the manifest of `variable`.
///
/// # Errors
/// Returns a [`StoreKeyError`] if the key is invalid.
pub fn manifest_key(variable: &str) -> Result<StoreKey, StoreKeyError> {
    StoreKey::new(format!("{MANIFEST_DIRECTORY}/{}", manifest_file_name(variable)))
}

/// Return the filesystem path of the manifest of `variable` in the store at `store_path`.
#[must_use]
pub fn manifest_path(store_path: &Path, variable: &str) -> PathBuf {
    store_path
        .join(INTERNAL_DIRECTORY)
        .join("manifests")
        .join(manifest_file_name(variable))
}

/// Load the manifest of `variable`, returning [`None`] if it does not exist.
///
/// # Errors
/// Returns a [`ManifestError`] if the manifest cannot be read, is not valid JSON, or has an unsupported schema version.
pub fn load_variable_manifest<TStorage: ?Sized + ReadableStorageTraits>(
    storage: &TStorage,
    variable: &str,
) -> Result<Option<Vec<ChunkRef>>, ManifestError> {
    let key = manifest_key(variable).map_err(StorageError::from)?;
    let Some(bytes) = storage.get(&key)? else {
        return Ok(None);
    };
    let invalid_json = |source| ManifestError::InvalidJson {
        location: key.to_string(),
        source,
    };
    let value: serde_json::Value = serde_json::from_slice(&bytes).map_err(invalid_json)?;
    if value.get("schema_version").and_then(serde_json::Value::as_u64)
        != Some(MANIFEST_SCHEMA_VERSION)
    {
        return Err(ManifestError::UnsupportedSchema(key.to_string()));
    }
    let document: ManifestDocument = serde_json::from_value(value).map_err(invalid_json)?;
    Ok(Some(document.allowed_missing))
}

/// Write the manifest of `variable` listing `refs` as allowed missing, and return its key.
///
/// References are written sorted by coordinate.
///
/// # Errors
/// Returns a [`ManifestError`] if the manifest cannot be serialised or written.
pub fn write_variable_manifest<TStorage: ?Sized + WritableStorageTraits>(
    storage: &TStorage,
    variable: &str,
    refs: impl IntoIterator<Item = ChunkRef>,
) -> Result<StoreKey, ManifestError> {
    let key = manifest_key(variable).map_err(StorageError::from)?;
    let mut allowed_missing: Vec<ChunkRef> = refs.into_iter().collect();
    allowed_missing.sort();
    let document = ManifestDocument {
        allowed_missing,
        schema_version: MANIFEST_SCHEMA_VERSION,
        variable: variable.to_string(),
        zarr_format: ZARR_FORMAT,
    };
    let mut bytes = serde_json::to_vec_pretty(&document).map_err(|source| {
        ManifestError::InvalidJson {
            location: key.to_string(),
            source,
        }
    })?;
    bytes.push(b'\n');
    storage.set(&key, Bytes::from(bytes))?;
    Ok(key)
}

/// Sort and deduplicate the coordinates of each variable.
#[must_use]
pub fn normalize_no_data_chunks(mut mapping: NoDataChunks) -> NoDataChunks {
    for coords in mapping.values_mut() {
        coords.sort();
        coords.dedup();
    }
    mapping
}

/// Parse a no-data document.
///
/// # Errors
/// Returns a [`ManifestError`] if the document is not a JSON object mapping names to lists of integer lists.
/// Floats with an integral value, such as `1.0`, are accepted as integers.
pub fn parse_no_data_chunks(json: &str) -> Result<NoDataChunks, ManifestError> {
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(ManifestError::InvalidNoDataJson)?;
    let serde_json::Value::Object(object) = value else {
        return Err(ManifestError::NoDataNotAnObject);
    };
    let mapping = object
        .into_iter()
        .map(|(variable, coords)| match serde_json::from_value::<Vec<Coord>>(coords) {
            Ok(coords) => Ok((variable, coords.into_iter().map(|Coord(c)| c).collect())),
            Err(source) => Err(ManifestError::InvalidNoDataCoordinates { variable, source }),
        })
        .collect::<Result<NoDataChunks, _>>()?;
    Ok(normalize_no_data_chunks(mapping))
}

/// Load a no-data document from `path`.
///
/// # Errors
/// Returns a [`ManifestError`] if the file cannot be read or see [`parse_no_data_chunks`].
pub fn load_no_data_chunks(path: &Path) -> Result<NoDataChunks, ManifestError> {
    parse_no_data_chunks(&std::fs::read_to_string(path)?)
}

/// Write a normalised no-data document to `path`.
///
/// # Errors
/// Returns a [`ManifestError`] if the file cannot be written.
pub fn dump_no_data_chunks(path: &Path, mapping: &NoDataChunks) -> Result<(), ManifestError> {
    let normalized = normalize_no_data_chunks(mapping.clone());
    let mut json =
        serde_json::to_string_pretty(&normalized).map_err(ManifestError::InvalidNoDataJson)?;
    json.push('\n');
    std::fs::write(path, json)?;
    Ok(())
}
