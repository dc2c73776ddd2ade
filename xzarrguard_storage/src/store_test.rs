use std::error::Error;

use crate::{
    Bytes, ListableStorageTraits, ReadableStorageTraits, StoreKey, StorePrefix,
    WritableStorageTraits,
};

#[allow(clippy::missing_errors_doc)]
/// Populate an empty store with a small array hierarchy
/// ```text
/// - zarr.json
/// - g/
///   - zarr.json
///   - a/
///     - zarr.json
///     - c/
///       - 0/
///         - 0 [0, 1, 2, 3]
///         - 1 [4]
///   - b/
///     - zarr.json
///     - 0.0 [5, 6]
/// ```
pub fn store_write<T: WritableStorageTraits>(store: &T) -> Result<(), Box<dyn Error>> {
    for key in ["zarr.json", "g/zarr.json", "g/a/zarr.json", "g/b/zarr.json"] {
        store.set(&key.try_into()?, Bytes::from_static(b"{}"))?;
    }
    store.set(&"g/a/c/0/0".try_into()?, Bytes::from(vec![0, 1, 2, 3]))?;
    store.set(&"g/a/c/0/1".try_into()?, Bytes::from(vec![4]))?;
    store.set(&"g/b/0.0".try_into()?, Bytes::from(vec![5, 6]))?;

    store.set(&"g/a/c/1/0".try_into()?, Bytes::new())?;
    store.erase(&"g/a/c/1/0".try_into()?)?;
    store.erase(&"g/a/c/1/0".try_into()?)?; // succeeds

    Ok(())
}

#[allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]
/// Read from the store and check the data matches the expected values after [`store_write`].
pub fn store_read<T: ReadableStorageTraits>(store: &T) -> Result<(), Box<dyn Error>> {
    assert!(store.get(&"g/a/c/9/9".try_into()?)?.is_none());
    assert!(store.size_key(&"g/a/c/9/9".try_into()?)?.is_none());
    assert!(!store.exists(&"g/a/c/9/9".try_into()?)?);
    assert!(!store.exists(&"g/a/c/1/0".try_into()?)?);
    assert_eq!(
        store.get(&"g/a/c/0/0".try_into()?)?,
        Some(Bytes::from(vec![0, 1, 2, 3]))
    );
    assert_eq!(
        store.get(&"g/zarr.json".try_into()?)?,
        Some(Bytes::from_static(b"{}"))
    );
    assert!(store.exists(&"g/a/c/0/1".try_into()?)?);
    assert!(store.exists(&"g/b/0.0".try_into()?)?);
    assert_eq!(store.size_key(&"g/a/c/0/0".try_into()?)?, Some(4));
    assert_eq!(store.size_key(&"g/b/0.0".try_into()?)?, Some(2));
    Ok(())
}

#[allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]
/// List the store and check the listings match the expected values after [`store_write`].
///
/// The store must list in sorted order.
pub fn store_list<T: ListableStorageTraits>(store: &T) -> Result<(), Box<dyn Error>> {
    let list_dir = store.list_dir(&StorePrefix::root())?;
    assert_eq!(list_dir.keys(), &[StoreKey::new("zarr.json")?]);
    assert_eq!(list_dir.prefixes(), &[StorePrefix::new("g/")?]);

    let list_dir = store.list_dir(&"g/".try_into()?)?;
    assert_eq!(list_dir.keys(), &[StoreKey::new("g/zarr.json")?]);
    assert_eq!(
        list_dir.prefixes(),
        &[StorePrefix::new("g/a/")?, StorePrefix::new("g/b/")?]
    );

    let list_dir = store.list_dir(&"g/b/".try_into()?)?;
    assert_eq!(
        list_dir.keys(),
        &[StoreKey::new("g/b/0.0")?, StoreKey::new("g/b/zarr.json")?]
    );
    assert!(list_dir.prefixes().is_empty());

    let list_dir = store.list_dir(&"g/a/c/".try_into()?)?;
    assert!(list_dir.keys().is_empty());
    assert_eq!(list_dir.prefixes(), &[StorePrefix::new("g/a/c/0/")?]);

    let list_dir = store.list_dir(&"missing/".try_into()?)?;
    assert!(list_dir.keys().is_empty());
    assert!(list_dir.prefixes().is_empty());

    Ok(())
}
