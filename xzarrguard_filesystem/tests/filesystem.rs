#![allow(missing_docs)]

use std::error::Error;

use xzarrguard_filesystem::FilesystemStore;
use xzarrguard_storage::{
    Bytes, ReadableStorageTraits, StoreKey, StorePrefix, WritableStorageTraits,
};

#[test]
#[cfg_attr(miri, ignore)]
fn filesystem() -> Result<(), Box<dyn Error>> {
    let path = tempfile::TempDir::new()?;
    let store = FilesystemStore::new(path.path())?.sorted();
    xzarrguard_storage::store_test::store_write(&store)?;
    xzarrguard_storage::store_test::store_read(&store)?;
    xzarrguard_storage::store_test::store_list(&store)?;
    Ok(())
}

#[test]
fn filesystem_base_path_is_file() -> Result<(), Box<dyn Error>> {
    let file = tempfile::NamedTempFile::new()?;
    assert!(FilesystemStore::new(file.path()).is_err());
    Ok(())
}

#[test]
fn filesystem_exists_ignores_directories() -> Result<(), Box<dyn Error>> {
    let path = tempfile::TempDir::new()?;
    let store = FilesystemStore::new(path.path())?;
    store.set(&StoreKey::new("a/c/0/0")?, Bytes::from_static(&[1]))?;
    assert!(store.exists(&StoreKey::new("a/c/0/0")?)?);
    assert!(!store.exists(&StoreKey::new("a/c/0")?)?);
    assert!(store.size_key(&StoreKey::new("a/c/0")?)?.is_none());
    Ok(())
}

#[test]
fn filesystem_erase_pruning_empty() -> Result<(), Box<dyn Error>> {
    let path = tempfile::TempDir::new()?;
    let store = FilesystemStore::new(path.path())?;
    store.set(&StoreKey::new("a/zarr.json")?, Bytes::from_static(b"{}"))?;
    store.set(&StoreKey::new("a/c/0/0")?, Bytes::new())?;
    store.set(&StoreKey::new("a/c/1/0")?, Bytes::new())?;
    store.set(&StoreKey::new("a/c/1/1")?, Bytes::new())?;

    let array_root = StorePrefix::new("a/")?;
    assert!(store.erase_pruning_empty(&StoreKey::new("a/c/0/0")?, &array_root)?);
    assert!(!path.path().join("a/c/0").exists());
    assert!(path.path().join("a/c/1").is_dir());

    assert!(store.erase_pruning_empty(&StoreKey::new("a/c/1/0")?, &array_root)?);
    assert!(store.erase_pruning_empty(&StoreKey::new("a/c/1/1")?, &array_root)?);
    assert!(!path.path().join("a/c").exists());
    assert!(path.path().join("a/zarr.json").is_file());

    // already removed
    assert!(!store.erase_pruning_empty(&StoreKey::new("a/c/1/1")?, &array_root)?);
    Ok(())
}

#[test]
fn filesystem_erase_pruning_empty_keeps_array_root() -> Result<(), Box<dyn Error>> {
    let path = tempfile::TempDir::new()?;
    let store = FilesystemStore::new(path.path())?;
    store.set(&StoreKey::new("g/a/0.0")?, Bytes::new())?;

    assert!(store.erase_pruning_empty(&StoreKey::new("g/a/0.0")?, &StorePrefix::new("g/a/")?)?);
    assert!(path.path().join("g/a").is_dir());
    Ok(())
}
