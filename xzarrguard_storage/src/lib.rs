//! The storage API for the [`xzarrguard`](https://docs.rs/xzarrguard) crate.
//!
//! A store is a system that can be used to store and retrieve the values of a chunked array hierarchy.
//! Values are addressed by a [`StoreKey`] and grouped under a [`StorePrefix`].
//! The storage API mirrors the abstract store interface of Zarr V3: <https://zarr-specs.readthedocs.io/en/latest/v3/core/index.html#storage>.
//!
//! This crate includes an in-memory store implementation, [`store::MemoryStore`].
//!
//! ## Licence
//! `xzarrguard_storage` is licensed under either of
//! - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//! - the MIT license <http://opensource.org/licenses/MIT>, at your option.

mod storage_sync;
pub mod store;
mod store_key;
mod store_prefix;

#[cfg(any(test, feature = "tests"))]
/// Store test utilities (for store implementations in other crates).
pub mod store_test;

use std::sync::Arc;

use thiserror::Error;

pub use store_key::{StoreKey, StoreKeyError, StoreKeys};
pub use store_prefix::{StorePrefix, StorePrefixError, StorePrefixes};

pub use self::storage_sync::{
    ListableStorageTraits, ReadableListableStorageTraits, ReadableStorageTraits,
    WritableStorageTraits,
};

/// The bytes of a stored value, an alias for [`bytes::Bytes`].
pub type Bytes = bytes::Bytes;

/// A value which may be absent from a store.
pub type MaybeBytes = Option<Bytes>;

/// The direct children of a [`StorePrefix`]: values as [`StoreKeys`] and sub-directories as [`StorePrefixes`].
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct StoreKeysPrefixes {
    keys: StoreKeys,
    prefixes: StorePrefixes,
}

impl StoreKeysPrefixes {
    /// Create a new [`StoreKeysPrefixes`].
    #[must_use]
    pub fn new(keys: StoreKeys, prefixes: StorePrefixes) -> Self {
        Self { keys, prefixes }
    }

    /// Returns the child keys.
    #[must_use]
    pub const fn keys(&self) -> &StoreKeys {
        &self.keys
    }

    /// Returns the child prefixes.
    #[must_use]
    pub const fn prefixes(&self) -> &StorePrefixes {
        &self.prefixes
    }
}

/// A storage error.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// A write operation was attempted on a read only store.
    #[error("a write operation was attempted on a read only store")]
    ReadOnly,
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] Arc<std::io::Error>),
    /// An invalid store prefix.
    #[error("invalid store prefix {0}")]
    StorePrefixError(#[from] StorePrefixError),
    /// An invalid store key.
    #[error("invalid store key {0}")]
    InvalidStoreKey(#[from] StoreKeyError),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::IOError(Arc::new(err))
    }
}
