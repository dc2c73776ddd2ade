use derive_more::From;
use serde_json::Value;
use thiserror::Error;

use crate::{ArrayMetadataV3, GroupMetadataV3, ZARR_FORMAT};

/// Zarr V3 node metadata.
#[derive(Clone, PartialEq, Debug, From)]
pub enum NodeMetadataV3 {
    /// Array metadata.
    Array(ArrayMetadataV3),
    /// Group metadata.
    Group(GroupMetadataV3),
    /// A node with an unrecognised `node_type`, holding the raw `node_type` value.
    #[from(ignore)]
    Unknown(Value),
}

/// A node metadata error.
#[derive(Debug, Error)]
pub enum NodeMetadataError {
    /// The document is not valid JSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    /// The document is not a JSON object.
    #[error("metadata is not a JSON object")]
    NotAnObject,
    /// The `zarr_format` is missing or not 3.
    #[error("Only zarr_format=3 is supported, found {0}")]
    UnsupportedZarrFormat(Value),
    /// Invalid array metadata.
    #[error("invalid array metadata: {0}")]
    InvalidArrayMetadata(#[source] serde_json::Error),
    /// Invalid group metadata.
    #[error("invalid group metadata: {0}")]
    InvalidGroupMetadata(#[source] serde_json::Error),
}

impl NodeMetadataV3 {
    /// Parse node metadata from the bytes of a `zarr.json` document.
    ///
    /// # Errors
    /// Returns a [`NodeMetadataError`] if the document is not JSON, or see [`NodeMetadataV3::from_value`].
    pub fn from_slice(bytes: &[u8]) -> Result<Self, NodeMetadataError> {
        let value: Value = serde_json::from_slice(bytes).map_err(NodeMetadataError::InvalidJson)?;
        Self::from_value(value)
    }

    /// Parse node metadata from a JSON value.
    ///
    /// The `zarr_format` is checked first, then the `node_type` selects how the rest of the document is parsed.
    /// A missing or unrecognised `node_type` yields [`NodeMetadataV3::Unknown`] rather than an error.
    ///
    /// # Errors
    /// Returns a [`NodeMetadataError`] if the `zarr_format` is unsupported, or array/group metadata is invalid.
    pub fn from_value(value: Value) -> Result<Self, NodeMetadataError> {
        let Value::Object(object) = &value else {
            return Err(NodeMetadataError::NotAnObject);
        };
        let zarr_format = object.get("zarr_format").cloned().unwrap_or(Value::Null);
        if zarr_format.as_u64() != Some(ZARR_FORMAT) {
            return Err(NodeMetadataError::UnsupportedZarrFormat(zarr_format));
        }
        match object.get("node_type").and_then(Value::as_str) {
            Some("array") => serde_json::from_value(value)
                .map(Self::Array)
                .map_err(NodeMetadataError::InvalidArrayMetadata),
            Some("group") => serde_json::from_value(value)
                .map(Self::Group)
                .map_err(NodeMetadataError::InvalidGroupMetadata),
            _ => Ok(Self::Unknown(
                object.get("node_type").cloned().unwrap_or(Value::Null),
            )),
        }
    }
}
