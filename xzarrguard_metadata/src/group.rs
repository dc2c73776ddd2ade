use monostate::MustBe;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::AdditionalFields;

/// Zarr V3 group metadata.
///
/// An example `JSON` document for a Zarr V3 group with consolidated metadata:
/// ```json
/// {
///     "zarr_format": 3,
///     "node_type": "group",
///     "attributes": {},
///     "consolidated_metadata": {
///         "kind": "inline",
///         "must_understand": false,
///         "metadata": {
///             "a": {"zarr_format": 3, "node_type": "array", "...": "..."}
///         }
///     }
/// }
/// ```
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Default)]
pub struct GroupMetadataV3 {
    /// An integer defining the version of the storage specification to which the group adheres. Must be `3`.
    pub zarr_format: MustBe!(3u64),
    /// A string defining the type of hierarchy node element, must be `group` here.
    pub node_type: MustBe!("group"),
    /// Optional user metadata.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub attributes: serde_json::Map<String, Value>,
    /// Consolidated metadata of the nodes beneath this group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consolidated_metadata: Option<ConsolidatedMetadata>,
    /// Additional fields.
    #[serde(flatten)]
    pub additional_fields: AdditionalFields,
}

impl GroupMetadataV3 {
    /// Create group metadata with no attributes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the consolidated metadata.
    #[must_use]
    pub fn with_consolidated_metadata(
        mut self,
        consolidated_metadata: Option<ConsolidatedMetadata>,
    ) -> Self {
        self.consolidated_metadata = consolidated_metadata;
        self
    }
}

/// The kind of consolidated metadata.
#[derive(Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Debug, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConsolidatedMetadataKind {
    /// Consolidated metadata embedded in the group metadata document.
    #[default]
    Inline,
}

/// Consolidated metadata of a Zarr hierarchy.
///
/// Entries are kept as raw JSON so that each node document can be validated individually.
/// Entry names are paths relative to the group, joined with `/`.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Default)]
pub struct ConsolidatedMetadata {
    /// A mapping from node path to node metadata.
    #[serde(default)]
    pub metadata: serde_json::Map<String, Value>,
    /// The kind of the consolidated metadata.
    #[serde(default)]
    pub kind: ConsolidatedMetadataKind,
    /// Whether a reader must understand the consolidated metadata.
    #[serde(default)]
    pub must_understand: bool,
}
