//! `xzarrguard` checks that [Zarr V3](https://zarr-specs.readthedocs.io/en/latest/v3/core/index.html) stores are complete, and builds stores that stay checkable.
//!
//! A Zarr store legitimately omits chunks that hold only the fill value, so a missing chunk file is ambiguous: it may be intentional, or it may be data loss from an interrupted copy or a failed write.
//! `xzarrguard` resolves the ambiguity with a per-array *manifest* of the chunks that are intentionally absent.
//!
//! ## Checking a Store
//! [`check_store`] resolves every array of a store (from consolidated metadata if present, otherwise by walking the hierarchy), enumerates the chunk grid of each array, and tests each chunk for existence.
//! Each expected chunk is then classified against the manifest of its array:
//!  - absent and not in the manifest: `missing_unexpected`, which fails the check,
//!  - absent and in the manifest: `missing_allowed`,
//!  - present and in the manifest: `stale_manifest`, which fails the check only under [`CheckOptions::with_strict_stale_manifest`].
//!
//! Manifest entries outside the chunk grid (`manifest_out_of_bounds`) or with a key that does not match their coordinate (`manifest_key_mismatch`) always fail the check.
//!
//! ## Building a Store
//! [`create_store`] writes a [`Dataset`](dataset::Dataset) and declares chunks as no-data under a [`NoDataStrategy`]:
//!  - [`NoDataStrategy::Manifest`]: the declared chunks are deleted and listed in a manifest,
//!  - [`NoDataStrategy::EmptyChunks`]: the declared chunks are kept as fill value chunks.
//!
//! The built store is checked before [`create_store`] returns.
//!
//! ## Example
//! ```
//! # use std::num::NonZeroU64;
//! use xzarrguard::{
//!     check_store, create_store,
//!     dataset::{Dataset, DatasetArray},
//!     CreateOptions, NoDataChunks,
//! };
//!
//! let dir = tempfile::TempDir::new()?;
//! let store_path = dir.path().join("store.zarr");
//!
//! let chunk_shape = vec![NonZeroU64::new(2).unwrap(); 2];
//! let array = DatasetArray::from_elements(vec![4, 4], chunk_shape, &[1.0f32; 16])?;
//! let dataset = Dataset::new().with_array("var", array)?;
//! let no_data = NoDataChunks::from([("var".to_string(), vec![vec![0, 1]])]);
//! let report = create_store(&dataset, &store_path, Some(&no_data), &CreateOptions::default())?;
//! assert_eq!(report.manifests_written().len(), 1);
//!
//! let report = check_store(&store_path, false)?;
//! assert!(report.is_ok());
//! assert_eq!(report.variable("var").unwrap().missing_allowed().len(), 1);
//!
//! std::fs::remove_file(store_path.join("var/c/1/1"))?;
//! let report = check_store(&store_path, false)?;
//! assert!(!report.is_ok());
//! print!("{report}");
//! // FAIL
//! // var: missing_unexpected=1
//! # Ok::<_, Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Logging
//! `xzarrguard` logs information and warnings using the [`log`] crate.
//! A logging implementation must be enabled to capture logs.
//!
//! ## Licence
//! `xzarrguard` is licensed under either of
//!  - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license <http://opensource.org/licenses/MIT>, at your option.
//!
//! Unless you explicitly state otherwise, any contribution intentionally submitted for inclusion in the work by you, as defined in the Apache-2.0 license, shall be dual licensed as above, without any additional terms or conditions.
#![warn(clippy::wildcard_enum_match_arm)]

pub mod chunk;
pub mod config;
pub mod create;
pub mod dataset;
pub mod integrity;
pub mod layout;
pub mod manifest;
pub mod report;

pub use xzarrguard_chunk_grid as chunk_grid;
pub use xzarrguard_chunk_key_encoding as chunk_key_encoding;
pub use xzarrguard_filesystem as filesystem;
pub use xzarrguard_metadata as metadata;
pub use xzarrguard_storage as storage;

pub use chunk::{ChunkAddressError, ChunkAddressing, ChunkRef};
pub use config::{
    global_config, global_config_mut, CheckOptions, Config, CreateOptions, NoDataStrategy,
};
pub use create::{create_store, create_store_with_writer, CreateError};
pub use integrity::{check_array, check_storage, check_store, check_store_opt, CheckError};
pub use layout::{scan_array_specs, ArraySpec, LayoutError};
pub use manifest::{
    dump_no_data_chunks, load_no_data_chunks, load_variable_manifest, manifest_path,
    parse_no_data_chunks, write_variable_manifest, ManifestError, NoDataChunks,
};
pub use report::{CreateReport, IntegrityReport, IntegrityTiming, VariableIntegrity, VariableTiming};

/// The `xzarrguard` version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
