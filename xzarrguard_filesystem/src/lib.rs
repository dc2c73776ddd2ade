//! A filesystem store for the [`xzarrguard`](https://docs.rs/xzarrguard) crate.
//!
//! Keys map directly onto paths relative to a base directory, as in the Zarr V3 filesystem store: <https://zarr-specs.readthedocs.io/en/latest/v3/stores/filesystem/index.html>.
//! Chunk files are plain files, so a chunk is present exactly when its file exists.
//!
//! ## Licence
//! `xzarrguard_filesystem` is licensed under either of
//! - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//! - the MIT license <http://opensource.org/licenses/MIT>, at your option.

use xzarrguard_storage::{
    Bytes, ListableStorageTraits, MaybeBytes, ReadableStorageTraits, StorageError, StoreKey,
    StoreKeys, StoreKeysPrefixes, StorePrefix, StorePrefixes, WritableStorageTraits,
};

use thiserror::Error;

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

/// A synchronous file system store.
///
/// See <https://zarr-specs.readthedocs.io/en/latest/v3/stores/filesystem/index.html>.
#[derive(Debug)]
pub struct FilesystemStore {
    base_path: PathBuf,
    sort: bool,
    readonly: bool,
}

impl FilesystemStore {
    /// Create a new file system store at a given `base_path`.
    ///
    /// # Errors
    /// Returns a [`FilesystemStoreCreateError`] if `base_directory`:
    ///   - is not valid, or
    ///   - it points to an existing file rather than a directory.
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self, FilesystemStoreCreateError> {
        let base_path = base_path.as_ref().to_path_buf();
        if base_path.to_str().is_none() {
            return Err(FilesystemStoreCreateError::InvalidBasePath(base_path));
        }

        let readonly = if base_path.exists() {
            let md = std::fs::metadata(&base_path)?;
            if !md.is_dir() {
                return Err(FilesystemStoreCreateError::InvalidBasePath(base_path));
            }
            md.permissions().readonly()
        } else {
            // the path does not exist, so try and create it. If this succeeds, the filesystem is not read only
            std::fs::create_dir_all(&base_path)?;
            std::fs::remove_dir(&base_path)?;
            false
        };

        Ok(Self {
            base_path,
            sort: false,
            readonly,
        })
    }

    /// Makes the store sort directories/files when listing.
    #[must_use]
    pub const fn sorted(mut self) -> Self {
        self.sort = true;
        self
    }

    /// Returns the base path of the store.
    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Maps a [`StoreKey`] to a filesystem [`PathBuf`].
    #[must_use]
    pub fn key_to_fspath(&self, key: &StoreKey) -> PathBuf {
        let mut path = self.base_path.clone();
        path.push(key.as_str());
        path
    }

    /// Maps a store [`StorePrefix`] to a filesystem [`PathBuf`].
    #[must_use]
    pub fn prefix_to_fs_path(&self, prefix: &StorePrefix) -> PathBuf {
        let mut path = self.base_path.clone();
        path.push(prefix.as_str());
        path
    }

    /// Erase the file at `key`, then remove any parent directories left empty by the removal.
    ///
    /// Directory removal stops at `stop`, which is never removed itself.
    /// Returns true if a file was removed.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the store is read only or there is an underlying IO error.
    pub fn erase_pruning_empty(
        &self,
        key: &StoreKey,
        stop: &StorePrefix,
    ) -> Result<bool, StorageError> {
        if self.readonly {
            return Err(StorageError::ReadOnly);
        }

        match std::fs::remove_file(self.key_to_fspath(key)) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(false),
            Err(err) => return Err(err.into()),
        }

        let mut current = key.parent();
        while current != *stop && current.starts_with(stop) {
            let dir = self.prefix_to_fs_path(&current);
            if std::fs::read_dir(&dir)?.next().is_some() {
                break;
            }
            std::fs::remove_dir(&dir)?;
            log::trace!("removed empty directory {}", dir.display());
            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }
        Ok(true)
    }
}

impl ReadableStorageTraits for FilesystemStore {
    fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError> {
        match std::fs::read(self.key_to_fspath(key)) {
            Ok(value) => Ok(Some(Bytes::from(value))),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn size_key(&self, key: &StoreKey) -> Result<Option<u64>, StorageError> {
        let key_path = self.key_to_fspath(key);
        std::fs::metadata(key_path).map_or_else(
            |_| Ok(None),
            |metadata| Ok(metadata.is_file().then(|| metadata.len())),
        )
    }

    fn exists(&self, key: &StoreKey) -> Result<bool, StorageError> {
        Ok(self.key_to_fspath(key).is_file())
    }
}

impl WritableStorageTraits for FilesystemStore {
    fn set(&self, key: &StoreKey, value: Bytes) -> Result<(), StorageError> {
        if self.readonly {
            return Err(StorageError::ReadOnly);
        }

        // Create directories
        let key_path = self.key_to_fspath(key);
        if let Some(parent) = key_path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(key_path, &value)?;
        Ok(())
    }

    fn erase(&self, key: &StoreKey) -> Result<(), StorageError> {
        if self.readonly {
            return Err(StorageError::ReadOnly);
        }

        match std::fs::remove_file(self.key_to_fspath(key)) {
            Err(err) if err.kind() != ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }
}

impl ListableStorageTraits for FilesystemStore {
    fn list_dir(&self, prefix: &StorePrefix) -> Result<StoreKeysPrefixes, StorageError> {
        let prefix_path = self.prefix_to_fs_path(prefix);
        let mut keys: StoreKeys = vec![];
        let mut prefixes: StorePrefixes = vec![];
        let dir = match std::fs::read_dir(prefix_path) {
            Ok(dir) => dir,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Ok(StoreKeysPrefixes::new(keys, prefixes));
            }
            Err(err) => return Err(err.into()),
        };
        for entry in dir {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                log::warn!(
                    "Ignoring non UTF-8 path {} in store listing.",
                    entry.path().display()
                );
                continue;
            };
            if entry.file_type()?.is_dir() {
                prefixes.push(prefix.child(&name)?);
            } else {
                keys.push(prefix.key(&name)?);
            }
        }
        if self.sort {
            keys.sort();
            prefixes.sort();
        }

        Ok(StoreKeysPrefixes::new(keys, prefixes))
    }
}

/// A filesystem store creation error.
#[derive(Debug, Error)]
pub enum FilesystemStoreCreateError {
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// The path is not valid on this system.
    #[error("base path {0} is not valid")]
    InvalidBasePath(PathBuf),
}
