//! The reconciliation engine.
//!
//! Each array of a store is checked by comparing the chunks of its chunk grid against the chunks present in the store and the chunks its manifest declares absent.
//! Every expected chunk falls into exactly one of:
//!  - present and not in the manifest: the normal case, not reported,
//!  - absent and in the manifest: `missing_allowed`,
//!  - absent and not in the manifest: `missing_unexpected`,
//!  - present and in the manifest: `stale_manifest`.
//!
//! Manifest entries outside the chunk grid or with a key that does not match their coordinate are reported separately, and never count as declared.

use std::{collections::HashSet, path::Path, time::Instant};

use thiserror::Error;
use xzarrguard_filesystem::FilesystemStore;
use xzarrguard_storage::{ReadableListableStorageTraits, ReadableStorageTraits, StorageError};

use crate::{
    chunk::{ChunkAddressError, ChunkAddressing},
    config::CheckOptions,
    layout::{scan_array_specs, ArraySpec},
    manifest::{load_variable_manifest, ManifestError},
    report::{IntegrityReport, IntegrityTiming, VariableIntegrity, VariableTiming},
};

/// A hard failure while checking a store.
///
/// Structural problems with the store itself are not errors, they are reported in [`IntegrityReport::errors`].
#[derive(Debug, Error)]
pub enum CheckError {
    /// An array cannot be addressed.
    #[error(transparent)]
    ChunkAddressError(#[from] ChunkAddressError),
    /// A manifest is invalid.
    #[error(transparent)]
    ManifestError(#[from] ManifestError),
    /// A storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
}

/// Collects timing while a store is checked.
#[derive(Debug)]
pub struct TimingCollector {
    start: Instant,
    timing: IntegrityTiming,
}

impl Default for TimingCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingCollector {
    /// Start collecting timing.
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            timing: IntegrityTiming::default(),
        }
    }

    fn record_scan_specs(&mut self, scan_specs_s: f64) {
        self.timing.scan_specs_s += scan_specs_s;
    }

    fn record_variable(&mut self, name: &str, variable: VariableTiming, exists_calls: u64) {
        self.timing.manifest_s += variable.manifest_load_s + variable.manifest_validate_s;
        self.timing.chunk_scan_s += variable.chunk_scan_s;
        self.timing.exists_calls += exists_calls;
        self.timing.variables.insert(name.to_string(), variable);
    }

    /// Stop collecting and return the timing.
    #[must_use]
    pub fn finish(mut self) -> IntegrityTiming {
        self.timing.total_s = self.start.elapsed().as_secs_f64();
        self.timing
    }
}

fn elapsed_s(start: Option<Instant>) -> f64 {
    start.map_or(0.0, |start| start.elapsed().as_secs_f64())
}

/// Check the store at `store_path`.
///
/// # Errors
/// Returns a [`CheckError`] on a hard failure, see [`check_storage`].
pub fn check_store(
    store_path: impl AsRef<Path>,
    strict_stale_manifest: bool,
) -> Result<IntegrityReport, CheckError> {
    check_store_opt(
        store_path,
        &CheckOptions::default().with_strict_stale_manifest(strict_stale_manifest),
    )
}

/// Check the store at `store_path` with explicit options.
///
/// A path that does not exist or is not a directory yields a failed report with a single store level error.
///
/// # Errors
/// Returns a [`CheckError`] on a hard failure, see [`check_storage`].
pub fn check_store_opt(
    store_path: impl AsRef<Path>,
    options: &CheckOptions,
) -> Result<IntegrityReport, CheckError> {
    let store_path = store_path.as_ref();
    let display_path = store_path.display().to_string();
    let strict = options.strict_stale_manifest();
    if !store_path.exists() {
        return Ok(IntegrityReport::failed(
            display_path.clone(),
            strict,
            format!("Store does not exist: {display_path}"),
        ));
    }
    if !store_path.is_dir() {
        return Ok(IntegrityReport::failed(
            display_path.clone(),
            strict,
            format!("Store path is not a directory: {display_path}"),
        ));
    }
    let storage = match FilesystemStore::new(store_path) {
        Ok(storage) => storage,
        Err(err) => return Ok(IntegrityReport::failed(display_path, strict, err)),
    };
    check_storage(&storage, display_path, options)
}

/// Check a store.
///
/// Array specs are resolved with [`scan_array_specs`], and a layout error yields a failed report with a single store level error.
/// Each array is then checked with [`check_array`].
///
/// # Errors
/// Returns a [`CheckError`] if an array cannot be addressed, a manifest is invalid, or there is an underlying store error.
pub fn check_storage<TStorage: ?Sized + ReadableListableStorageTraits>(
    storage: &TStorage,
    store_path: String,
    options: &CheckOptions,
) -> Result<IntegrityReport, CheckError> {
    let strict = options.strict_stale_manifest();
    let mut timing = options.timing().then(TimingCollector::new);

    let scan_start = timing.is_some().then(Instant::now);
    let specs = match scan_array_specs(storage) {
        Ok(specs) => specs,
        Err(err) => {
            log::info!("{store_path}: FAIL ({err})");
            let mut report = IntegrityReport::failed(store_path, strict, err);
            report.timing = timing.map(TimingCollector::finish);
            return Ok(report);
        }
    };
    if let Some(timing) = timing.as_mut() {
        timing.record_scan_specs(elapsed_s(scan_start));
    }

    let mut report = IntegrityReport::new(store_path, strict);
    for spec in &specs {
        let variable = check_array(storage, spec, strict, timing.as_mut())?;
        report.variables.insert(spec.name().to_string(), variable);
    }
    report.finalize();
    report.timing = timing.map(TimingCollector::finish);
    log::info!(
        "{}: {} ({} arrays)",
        report.store_path(),
        if report.is_ok() { "PASS" } else { "FAIL" },
        specs.len()
    );
    Ok(report)
}

/// Check an array.
///
/// Chunk existence is tested once per expected chunk, and timing is recorded to `timing` if supplied.
///
/// # Errors
/// Returns a [`CheckError`] if the array cannot be addressed, its manifest is invalid, or there is an underlying store error.
pub fn check_array<TStorage: ?Sized + ReadableStorageTraits>(
    storage: &TStorage,
    spec: &ArraySpec,
    strict_stale_manifest: bool,
    timing: Option<&mut TimingCollector>,
) -> Result<VariableIntegrity, CheckError> {
    let clock = timing.is_some();
    let addressing = ChunkAddressing::new(spec)?;

    let manifest_load_start = clock.then(Instant::now);
    let manifest = load_variable_manifest(storage, spec.name())?;
    let manifest_load_s = elapsed_s(manifest_load_start);

    let manifest_validate_start = clock.then(Instant::now);
    let mut variable = VariableIntegrity::new(spec.name(), manifest.is_some());
    let mut declared: HashSet<Vec<i64>> = HashSet::new();
    for chunk in manifest.unwrap_or_default() {
        let Some(indices) = chunk.indices().filter(|_| addressing.contains(chunk.coord())) else {
            variable.manifest_out_of_bounds.push(chunk);
            continue;
        };
        if chunk.key() != addressing.chunk_key(&indices) {
            variable.manifest_key_mismatch.push(chunk);
            continue;
        }
        declared.insert(chunk.coord().to_vec());
    }
    let manifest_validate_s = elapsed_s(manifest_validate_start);

    let chunk_scan_start = clock.then(Instant::now);
    let mut missing_chunks = 0;
    let mut exists_calls = 0;
    for indices in &addressing.expected_chunk_indices() {
        variable.expected_chunks += 1;
        let key = addressing.chunk_store_key(&indices)?;
        exists_calls += 1;
        let exists = storage.exists(&key)?;
        let chunk = addressing.chunk_ref(&indices);
        let is_declared = declared.contains(chunk.coord());
        if !exists {
            missing_chunks += 1;
        }
        match (exists, is_declared) {
            (false, true) => variable.missing_allowed.push(chunk),
            (false, false) => variable.missing_unexpected.push(chunk),
            (true, true) => variable.stale_manifest.push(chunk),
            (true, false) => {}
        }
    }
    let chunk_scan_s = elapsed_s(chunk_scan_start);

    variable.finalize(strict_stale_manifest);
    log::debug!(
        "array {}: expected={} missing_unexpected={} missing_allowed={} stale_manifest={} manifest_key_mismatch={} manifest_out_of_bounds={}",
        spec.name(),
        variable.expected_chunks,
        variable.missing_unexpected.len(),
        variable.missing_allowed.len(),
        variable.stale_manifest.len(),
        variable.manifest_key_mismatch.len(),
        variable.manifest_out_of_bounds.len(),
    );

    if let Some(timing) = timing {
        timing.record_variable(
            spec.name(),
            VariableTiming {
                chunk_scan_s,
                expected_chunks: variable.expected_chunks,
                manifest_load_s,
                manifest_validate_s,
                missing_chunks,
            },
            exists_calls,
        );
    }
    Ok(variable)
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use std::sync::atomic::{AtomicU64, Ordering};

    use serde_json::json;
    use xzarrguard_storage::{
        store::MemoryStore, Bytes, MaybeBytes, StoreKey, WritableStorageTraits,
    };

    use super::*;
    use crate::{chunk::ChunkRef, layout::scan_array_specs, manifest::write_variable_manifest};

    /// Counts the existence tests made against a store.
    struct CountingStore<'a> {
        store: &'a MemoryStore,
        exists: AtomicU64,
    }

    impl ReadableStorageTraits for CountingStore<'_> {
        fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError> {
            self.store.get(key)
        }

        fn size_key(&self, key: &StoreKey) -> Result<Option<u64>, StorageError> {
            self.store.size_key(key)
        }

        fn exists(&self, key: &StoreKey) -> Result<bool, StorageError> {
            self.exists.fetch_add(1, Ordering::Relaxed);
            self.store.exists(key)
        }
    }

    fn options(strict: bool) -> CheckOptions {
        CheckOptions::default().with_strict_stale_manifest(strict)
    }

    /// A group with a 4x4 array `var` chunked 2x2, with every chunk present.
    fn store() -> Result<MemoryStore, Box<dyn Error>> {
        let store = MemoryStore::new();
        let group = json!({"zarr_format": 3, "node_type": "group"});
        let array = json!({
            "zarr_format": 3,
            "node_type": "array",
            "shape": [4, 4],
            "chunk_grid": {"name": "regular", "configuration": {"chunk_shape": [2, 2]}},
            "chunk_key_encoding": {"name": "default", "configuration": {"separator": "/"}},
        });
        store.set(&StoreKey::new("zarr.json")?, Bytes::from(serde_json::to_vec(&group)?))?;
        store.set(&StoreKey::new("var/zarr.json")?, Bytes::from(serde_json::to_vec(&array)?))?;
        for key in ["c/0/0", "c/0/1", "c/1/0", "c/1/1"] {
            store.set(&StoreKey::new(format!("var/{key}"))?, Bytes::from_static(b"x"))?;
        }
        Ok(store)
    }

    #[test]
    fn check_complete() -> Result<(), Box<dyn Error>> {
        let report = check_storage(&store()?, "mem".to_string(), &options(false))?;
        assert!(report.is_ok());
        let var = report.variable("var").ok_or("no var")?;
        assert_eq!(var.expected_chunks(), 4);
        assert!(!var.has_manifest());
        assert!(report.timing().is_none());
        Ok(())
    }

    #[test]
    fn check_buckets() -> Result<(), Box<dyn Error>> {
        let store = store()?;
        store.erase(&StoreKey::new("var/c/0/1")?)?;
        store.erase(&StoreKey::new("var/c/1/0")?)?;
        write_variable_manifest(
            &store,
            "var",
            [
                ChunkRef::new(vec![0, 1], "c/0/1"),
                ChunkRef::new(vec![1, 1], "c/1/1"),
                ChunkRef::new(vec![0, 0], "c/0.0"),
                ChunkRef::new(vec![2, 0], "c/2/0"),
                ChunkRef::new(vec![0], "c/0"),
            ],
        )?;

        let report = check_storage(&store, "mem".to_string(), &options(false))?;
        let var = report.variable("var").ok_or("no var")?;
        assert!(var.has_manifest());
        assert_eq!(var.missing_allowed(), [ChunkRef::new(vec![0, 1], "c/0/1")]);
        assert_eq!(var.missing_unexpected(), [ChunkRef::new(vec![1, 0], "c/1/0")]);
        assert_eq!(var.stale_manifest(), [ChunkRef::new(vec![1, 1], "c/1/1")]);
        assert_eq!(var.manifest_key_mismatch().len(), 1);
        assert_eq!(var.manifest_key_mismatch()[0].key(), "c/0.0");
        assert_eq!(var.manifest_out_of_bounds().len(), 2);
        assert!(!var.is_ok());
        assert!(!report.is_ok());
        Ok(())
    }

    #[test]
    fn check_key_mismatch_not_declared() -> Result<(), Box<dyn Error>> {
        let store = store()?;
        store.erase(&StoreKey::new("var/c/0/0")?)?;
        write_variable_manifest(&store, "var", [ChunkRef::new(vec![0, 0], "c.0.0")])?;
        let report = check_storage(&store, "mem".to_string(), &options(false))?;
        let var = report.variable("var").ok_or("no var")?;
        assert_eq!(var.missing_unexpected().len(), 1);
        assert!(var.missing_allowed().is_empty());
        Ok(())
    }

    #[test]
    fn check_stale_policy() -> Result<(), Box<dyn Error>> {
        let store = store()?;
        write_variable_manifest(&store, "var", [ChunkRef::new(vec![1, 1], "c/1/1")])?;
        let report = check_storage(&store, "mem".to_string(), &options(false))?;
        assert!(report.is_ok());
        assert_eq!(report.variable("var").ok_or("no var")?.stale_manifest().len(), 1);

        let report = check_storage(&store, "mem".to_string(), &options(true))?;
        assert!(!report.is_ok());
        assert!(report.strict_stale_manifest());
        Ok(())
    }

    #[test]
    fn check_layout_error_is_reported() -> Result<(), Box<dyn Error>> {
        let store = MemoryStore::new();
        store.set(
            &StoreKey::new("zarr.json")?,
            Bytes::from_static(br#"{"zarr_format": 2, "node_type": "group"}"#),
        )?;
        let report = check_storage(&store, "mem".to_string(), &options(false))?;
        assert!(!report.is_ok());
        assert!(report.variables().is_empty());
        assert_eq!(report.errors().len(), 1);
        assert!(report.errors()[0].contains("zarr_format"));
        Ok(())
    }

    #[test]
    fn check_invalid_manifest_is_hard_error() -> Result<(), Box<dyn Error>> {
        let store = store()?;
        store.set(
            &StoreKey::new(".xzarrguard/manifests/var.json")?,
            Bytes::from_static(br#"{"schema_version": 99}"#),
        )?;
        assert!(matches!(
            check_storage(&store, "mem".to_string(), &options(false)),
            Err(CheckError::ManifestError(ManifestError::UnsupportedSchema(_)))
        ));
        Ok(())
    }

    #[test]
    fn check_timing() -> Result<(), Box<dyn Error>> {
        let store = store()?;
        store.erase(&StoreKey::new("var/c/0/0")?)?;
        let report = check_storage(
            &store,
            "mem".to_string(),
            &options(false).with_timing(true),
        )?;
        let timing = report.timing().ok_or("no timing")?;
        assert_eq!(timing.exists_calls(), 4);
        let var = &timing.variables()["var"];
        assert_eq!(var.expected_chunks(), 4);
        assert_eq!(var.missing_chunks(), 1);
        assert!(timing.total_s() >= timing.chunk_scan_s());
        Ok(())
    }

    #[test]
    fn check_timing_counts_exists_calls() -> Result<(), Box<dyn Error>> {
        let store = store()?;
        store.erase(&StoreKey::new("var/c/1/1")?)?;
        let specs = scan_array_specs(&store)?;
        let counting = CountingStore {
            store: &store,
            exists: AtomicU64::new(0),
        };
        let mut timing = TimingCollector::new();
        for spec in &specs {
            check_array(&counting, spec, false, Some(&mut timing))?;
        }
        let timing = timing.finish();
        assert_eq!(timing.exists_calls(), counting.exists.load(Ordering::Relaxed));
        assert_eq!(timing.exists_calls(), 4);
        assert_eq!(timing.variables()["var"].missing_chunks(), 1);

        // without a collector nothing is recorded, but every chunk is still tested
        check_array(&counting, &specs[0], false, None)?;
        assert_eq!(counting.exists.load(Ordering::Relaxed), 8);
        Ok(())
    }
}
