//! A synchronous in-memory store, useful for checking hierarchies without touching the filesystem.

use std::collections::{BTreeMap, BTreeSet};

use itertools::{Either, Itertools};
use parking_lot::RwLock;

use crate::{
    Bytes, ListableStorageTraits, MaybeBytes, ReadableStorageTraits, StorageError, StoreKey,
    StoreKeys, StoreKeysPrefixes, StorePrefix, WritableStorageTraits,
};

/// A synchronous in-memory store.
///
/// Keys are held in sorted order, so listings are always sorted.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data_map: RwLock<BTreeMap<StoreKey, Bytes>>,
}

impl MemoryStore {
    /// Create a new memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReadableStorageTraits for MemoryStore {
    fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError> {
        Ok(self.data_map.read().get(key).cloned())
    }

    fn size_key(&self, key: &StoreKey) -> Result<Option<u64>, StorageError> {
        Ok(self.data_map.read().get(key).map(|value| value.len() as u64))
    }

    fn exists(&self, key: &StoreKey) -> Result<bool, StorageError> {
        Ok(self.data_map.read().contains_key(key))
    }
}

impl WritableStorageTraits for MemoryStore {
    fn set(&self, key: &StoreKey, value: Bytes) -> Result<(), StorageError> {
        self.data_map.write().insert(key.clone(), value);
        Ok(())
    }

    fn erase(&self, key: &StoreKey) -> Result<(), StorageError> {
        self.data_map.write().remove(key);
        Ok(())
    }
}

impl ListableStorageTraits for MemoryStore {
    fn list_dir(&self, prefix: &StorePrefix) -> Result<StoreKeysPrefixes, StorageError> {
        let data_map = self.data_map.read();
        let (keys, prefixes): (StoreKeys, BTreeSet<StorePrefix>) = data_map
            .keys()
            .filter(|key| key.has_prefix(prefix))
            .partition_map(|key| {
                let key_strip = &key.as_str()[prefix.as_str().len()..];
                match key_strip.split_once('/') {
                    Some((child, _)) => Either::Right(StorePrefix::new_validated(
                        prefix.as_str().to_string() + child + "/",
                    )),
                    None => Either::Left(key.clone()),
                }
            });
        Ok(StoreKeysPrefixes::new(keys, prefixes.into_iter().collect()))
    }
}
