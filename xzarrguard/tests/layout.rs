#![allow(missing_docs)]

use std::{error::Error, path::Path};

use serde_json::{json, Value};
use xzarrguard::{check_store, scan_array_specs, LayoutError};
use xzarrguard_filesystem::FilesystemStore;

fn write_json(path: &Path, value: &Value) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_vec(value)?)?;
    Ok(())
}

fn group_meta(consolidated: Option<Value>) -> Value {
    let mut group = json!({"zarr_format": 3, "node_type": "group", "attributes": {}});
    if let Some(metadata) = consolidated {
        group["consolidated_metadata"] = json!({
            "kind": "inline",
            "must_understand": false,
            "metadata": metadata,
        });
    }
    group
}

fn array_meta(shape: &[u64], chunk_shape: &[u64]) -> Value {
    json!({
        "zarr_format": 3,
        "node_type": "array",
        "shape": shape,
        "chunk_grid": {"name": "regular", "configuration": {"chunk_shape": chunk_shape}},
        "chunk_key_encoding": {"name": "default", "configuration": {"separator": "/"}},
    })
}

fn names(store: &Path) -> Result<Vec<String>, Box<dyn Error>> {
    Ok(scan_array_specs(&FilesystemStore::new(store)?)?
        .iter()
        .map(|spec| spec.name().to_string())
        .collect())
}

#[test]
fn discovers_nested_arrays_without_scanning_chunks() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::TempDir::new()?;
    let store = dir.path().join("store.zarr");
    write_json(&store.join("zarr.json"), &group_meta(None))?;
    write_json(&store.join("a/zarr.json"), &array_meta(&[4, 4], &[2, 2]))?;
    write_json(&store.join("group/zarr.json"), &group_meta(None))?;
    write_json(&store.join("group/b/zarr.json"), &array_meta(&[8], &[4]))?;
    // a format error if chunk directories were scanned
    write_json(
        &store.join("a/c/0/zarr.json"),
        &json!({"zarr_format": 2, "node_type": "array"}),
    )?;
    // not part of the hierarchy
    std::fs::create_dir_all(store.join("loose/dir"))?;

    assert_eq!(names(&store)?, ["a", "group/b"]);
    Ok(())
}

#[test]
fn rejects_non_v3_root() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::TempDir::new()?;
    let store = dir.path().join("store.zarr");
    write_json(
        &store.join("zarr.json"),
        &json!({"zarr_format": 2, "node_type": "group"}),
    )?;
    let err = scan_array_specs(&FilesystemStore::new(&store)?).unwrap_err();
    assert!(matches!(err, LayoutError::InvalidMetadata { .. }));
    assert!(err.to_string().contains("zarr_format=3"));

    let report = check_store(&store, false)?;
    assert!(!report.is_ok());
    assert!(report.errors()[0].contains("zarr_format=3"));
    Ok(())
}

#[test]
fn rejects_non_regular_chunk_grid() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::TempDir::new()?;
    let store = dir.path().join("store.zarr");
    write_json(&store.join("zarr.json"), &group_meta(None))?;
    let mut array = array_meta(&[4], &[2]);
    array["chunk_grid"] = json!({"name": "rectangular", "configuration": {"chunk_shape": [[1, 3]]}});
    write_json(&store.join("a/zarr.json"), &array)?;

    let report = check_store(&store, false)?;
    assert!(!report.is_ok());
    assert!(report.variables().is_empty());
    assert!(report.errors()[0].contains("Only regular chunk grids are supported"));
    Ok(())
}

#[test]
fn supports_consolidated_metadata_without_child_files() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::TempDir::new()?;
    let store = dir.path().join("store.zarr");
    write_json(
        &store.join("zarr.json"),
        &group_meta(Some(json!({
            "a": array_meta(&[4, 4], &[2, 2]),
            "nested/b": array_meta(&[8], &[4]),
        }))),
    )?;

    let specs = scan_array_specs(&FilesystemStore::new(&store)?)?;
    assert_eq!(specs.len(), 2);
    assert_eq!(specs[0].name(), "a");
    assert_eq!(specs[0].path().as_str(), "a/");
    assert_eq!(specs[1].name(), "nested/b");
    assert_eq!(specs[1].path().as_str(), "nested/b/");
    Ok(())
}

#[test]
fn prefers_consolidated_metadata_when_available() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::TempDir::new()?;
    let store = dir.path().join("store.zarr");
    write_json(
        &store.join("zarr.json"),
        &group_meta(Some(json!({"a": array_meta(&[4, 4], &[2, 2])}))),
    )?;
    // broken per-array metadata is never read
    write_json(
        &store.join("a/zarr.json"),
        &json!({"zarr_format": 2, "node_type": "array"}),
    )?;
    // nor are arrays missing from the consolidated metadata
    write_json(&store.join("b/zarr.json"), &array_meta(&[4], &[2]))?;

    assert_eq!(names(&store)?, ["a"]);
    Ok(())
}

#[test]
fn v2_chunk_key_encoding() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::TempDir::new()?;
    let store = dir.path().join("store.zarr");
    write_json(&store.join("zarr.json"), &group_meta(None))?;
    let mut array = array_meta(&[4, 4], &[2, 2]);
    array["chunk_key_encoding"] = json!({"name": "v2"});
    write_json(&store.join("a/zarr.json"), &array)?;
    for key in ["0.0", "0.1", "1.0"] {
        std::fs::write(store.join("a").join(key), b"")?;
    }

    let report = check_store(&store, false)?;
    let a = report.variable("a").ok_or("no a")?;
    assert_eq!(a.missing_unexpected().len(), 1);
    assert_eq!(a.missing_unexpected()[0].key(), "1.1");
    Ok(())
}

#[test]
fn unsupported_chunk_key_encoding_is_a_hard_error() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::TempDir::new()?;
    let store = dir.path().join("store.zarr");
    write_json(&store.join("zarr.json"), &group_meta(None))?;
    let mut array = array_meta(&[4], &[2]);
    array["chunk_key_encoding"] = json!({"name": "custom"});
    write_json(&store.join("a/zarr.json"), &array)?;

    let err = check_store(&store, false).unwrap_err();
    assert!(matches!(err, xzarrguard::CheckError::ChunkAddressError(_)));
    Ok(())
}

#[test]
fn rank_zero_and_empty_arrays() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::TempDir::new()?;
    let store = dir.path().join("store.zarr");
    write_json(&store.join("zarr.json"), &group_meta(None))?;
    write_json(&store.join("scalar/zarr.json"), &array_meta(&[], &[]))?;
    std::fs::write(store.join("scalar/c"), b"")?;
    write_json(&store.join("empty/zarr.json"), &array_meta(&[0, 4], &[2, 2]))?;

    let report = check_store(&store, false)?;
    assert!(report.is_ok());
    assert_eq!(report.variable("scalar").ok_or("no scalar")?.expected_chunks(), 1);
    assert_eq!(report.variable("empty").ok_or("no empty")?.expected_chunks(), 0);

    std::fs::remove_file(store.join("scalar/c"))?;
    let report = check_store(&store, false)?;
    let scalar = report.variable("scalar").ok_or("no scalar")?;
    assert_eq!(scalar.missing_unexpected()[0].coord(), &[] as &[i64]);
    assert_eq!(scalar.missing_unexpected()[0].key(), "c");
    Ok(())
}

#[test]
fn chunk_directory_is_not_a_chunk() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::TempDir::new()?;
    let store = dir.path().join("store.zarr");
    write_json(&store.join("zarr.json"), &group_meta(None))?;
    write_json(&store.join("a/zarr.json"), &array_meta(&[2], &[2]))?;
    std::fs::create_dir_all(store.join("a/c/0"))?;

    let report = check_store(&store, false)?;
    assert_eq!(report.variable("a").ok_or("no a")?.missing_unexpected().len(), 1);
    Ok(())
}
