//! Zarr V3 node metadata support for the [`xzarrguard`](https://docs.rs/xzarrguard) crate.
//!
//! Every node of a Zarr V3 hierarchy is described by a `zarr.json` document.
//! This crate models the subset of that document needed to enumerate arrays and their chunks:
//!  - [`ArrayMetadataV3`]: array shape, chunk grid, chunk key encoding, and the data layout fields written alongside them,
//!  - [`GroupMetadataV3`]: group attributes and optional inline [`ConsolidatedMetadata`],
//!  - [`NodeMetadataV3`]: a node of either kind, parsed in stages so that an unsupported `zarr_format` is reported before anything else.
//!
//! See <https://zarr-specs.readthedocs.io/en/latest/v3/core/index.html#metadata>.
//!
//! ## Licence
//! `xzarrguard_metadata` is licensed under either of
//! - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//! - the MIT license <http://opensource.org/licenses/MIT>, at your option.

mod array;
mod group;
mod metadata;
mod node;

pub use array::{ArrayMetadataV3, ArrayShape, RegularChunkGridConfiguration};
pub use group::{ConsolidatedMetadata, ConsolidatedMetadataKind, GroupMetadataV3};
pub use metadata::{ConfigurationInvalidError, MetadataConfiguration, MetadataV3};
pub use node::{NodeMetadataError, NodeMetadataV3};

/// The name of the metadata document of each node.
pub const ZARR_JSON: &str = "zarr.json";

/// The only supported `zarr_format`.
pub const ZARR_FORMAT: u64 = 3;

/// Additional fields in metadata not covered by the typed model.
pub type AdditionalFields = serde_json::Map<String, serde_json::Value>;
