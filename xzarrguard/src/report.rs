//! Check and create reports.
//!
//! Reports serialise to JSON with sorted keys.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{chunk::ChunkRef, config::NoDataStrategy};

/// The check result of an array.
#[derive(Clone, Debug, Default, Serialize)]
pub struct VariableIntegrity {
    pub(crate) expected_chunks: u64,
    pub(crate) has_manifest: bool,
    pub(crate) manifest_key_mismatch: Vec<ChunkRef>,
    pub(crate) manifest_out_of_bounds: Vec<ChunkRef>,
    pub(crate) missing_allowed: Vec<ChunkRef>,
    pub(crate) missing_unexpected: Vec<ChunkRef>,
    pub(crate) name: String,
    pub(crate) ok: bool,
    pub(crate) stale_manifest: Vec<ChunkRef>,
}

impl VariableIntegrity {
    pub(crate) fn new(name: &str, has_manifest: bool) -> Self {
        Self {
            name: name.to_string(),
            has_manifest,
            ok: true,
            ..Default::default()
        }
    }

    /// Derive `ok` from the findings.
    ///
    /// Missing unexpected chunks and invalid manifest entries always fail.
    /// Stale manifest entries fail only under `strict_stale_manifest`.
    pub(crate) fn finalize(&mut self, strict_stale_manifest: bool) {
        self.ok = self.missing_unexpected.is_empty()
            && self.manifest_key_mismatch.is_empty()
            && self.manifest_out_of_bounds.is_empty()
            && !(strict_stale_manifest && !self.stale_manifest.is_empty());
    }

    /// The array name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if the array passed.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.ok
    }

    /// Returns true if the array has a manifest.
    #[must_use]
    pub fn has_manifest(&self) -> bool {
        self.has_manifest
    }

    /// The number of chunks in the chunk grid.
    #[must_use]
    pub fn expected_chunks(&self) -> u64 {
        self.expected_chunks
    }

    /// Chunks absent from the store and not declared in the manifest.
    #[must_use]
    pub fn missing_unexpected(&self) -> &[ChunkRef] {
        &self.missing_unexpected
    }

    /// Chunks absent from the store and declared in the manifest.
    #[must_use]
    pub fn missing_allowed(&self) -> &[ChunkRef] {
        &self.missing_allowed
    }

    /// Chunks present in the store but declared in the manifest.
    #[must_use]
    pub fn stale_manifest(&self) -> &[ChunkRef] {
        &self.stale_manifest
    }

    /// Manifest entries whose key does not match the encoded key of their coordinate.
    #[must_use]
    pub fn manifest_key_mismatch(&self) -> &[ChunkRef] {
        &self.manifest_key_mismatch
    }

    /// Manifest entries whose coordinate lies outside the chunk grid.
    #[must_use]
    pub fn manifest_out_of_bounds(&self) -> &[ChunkRef] {
        &self.manifest_out_of_bounds
    }
}

/// Timing of the check of an array.
#[derive(Clone, Debug, Default, Serialize)]
pub struct VariableTiming {
    pub(crate) chunk_scan_s: f64,
    pub(crate) expected_chunks: u64,
    pub(crate) manifest_load_s: f64,
    pub(crate) manifest_validate_s: f64,
    pub(crate) missing_chunks: u64,
}

impl VariableTiming {
    /// Seconds spent loading the manifest.
    #[must_use]
    pub fn manifest_load_s(&self) -> f64 {
        self.manifest_load_s
    }

    /// Seconds spent validating manifest entries.
    #[must_use]
    pub fn manifest_validate_s(&self) -> f64 {
        self.manifest_validate_s
    }

    /// Seconds spent probing chunks.
    #[must_use]
    pub fn chunk_scan_s(&self) -> f64 {
        self.chunk_scan_s
    }

    /// The number of chunks tested for existence.
    #[must_use]
    pub fn expected_chunks(&self) -> u64 {
        self.expected_chunks
    }

    /// The number of chunks found absent.
    #[must_use]
    pub fn missing_chunks(&self) -> u64 {
        self.missing_chunks
    }
}

/// Coarse timing of a store check.
#[derive(Clone, Debug, Default, Serialize)]
pub struct IntegrityTiming {
    pub(crate) chunk_scan_s: f64,
    pub(crate) exists_calls: u64,
    pub(crate) manifest_s: f64,
    pub(crate) scan_specs_s: f64,
    pub(crate) total_s: f64,
    pub(crate) variables: BTreeMap<String, VariableTiming>,
}

impl IntegrityTiming {
    /// Seconds spent on the whole check.
    #[must_use]
    pub fn total_s(&self) -> f64 {
        self.total_s
    }

    /// Seconds spent resolving array specs.
    #[must_use]
    pub fn scan_specs_s(&self) -> f64 {
        self.scan_specs_s
    }

    /// Seconds spent loading and validating manifests.
    #[must_use]
    pub fn manifest_s(&self) -> f64 {
        self.manifest_s
    }

    /// Seconds spent probing chunks.
    #[must_use]
    pub fn chunk_scan_s(&self) -> f64 {
        self.chunk_scan_s
    }

    /// The number of chunk existence tests made.
    #[must_use]
    pub fn exists_calls(&self) -> u64 {
        self.exists_calls
    }

    /// Per-array timing.
    #[must_use]
    pub fn variables(&self) -> &BTreeMap<String, VariableTiming> {
        &self.variables
    }
}

/// The check result of a store.
///
/// The [`Display`](std::fmt::Display) implementation renders a human readable summary:
/// `PASS` or `FAIL`, a line of non-zero finding counts per failing array, store level errors, and timing if collected.
#[derive(Clone, Debug, Serialize)]
pub struct IntegrityReport {
    pub(crate) errors: Vec<String>,
    pub(crate) ok: bool,
    pub(crate) store_path: String,
    pub(crate) strict_stale_manifest: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) timing: Option<IntegrityTiming>,
    pub(crate) variables: BTreeMap<String, VariableIntegrity>,
}

impl IntegrityReport {
    pub(crate) fn new(store_path: String, strict_stale_manifest: bool) -> Self {
        Self {
            errors: Vec::new(),
            ok: true,
            store_path,
            strict_stale_manifest,
            timing: None,
            variables: BTreeMap::new(),
        }
    }

    /// A report of a store level error, with no per-array results.
    pub(crate) fn failed(
        store_path: String,
        strict_stale_manifest: bool,
        error: impl ToString,
    ) -> Self {
        let mut report = Self::new(store_path, strict_stale_manifest);
        report.errors.push(error.to_string());
        report.ok = false;
        report
    }

    pub(crate) fn finalize(&mut self) {
        self.ok = self.errors.is_empty() && self.variables.values().all(|v| v.ok);
    }

    /// Returns true if there are no store level errors and every array passed.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.ok
    }

    /// The store path as given.
    #[must_use]
    pub fn store_path(&self) -> &str {
        &self.store_path
    }

    /// The stale manifest policy the store was checked with.
    #[must_use]
    pub fn strict_stale_manifest(&self) -> bool {
        self.strict_stale_manifest
    }

    /// Store level errors.
    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Per-array results, keyed by array name.
    #[must_use]
    pub fn variables(&self) -> &BTreeMap<String, VariableIntegrity> {
        &self.variables
    }

    /// The result of the array `name`.
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&VariableIntegrity> {
        self.variables.get(name)
    }

    /// Timing, if requested.
    #[must_use]
    pub fn timing(&self) -> Option<&IntegrityTiming> {
        self.timing.as_ref()
    }

    /// Serialise to pretty printed JSON.
    ///
    /// # Errors
    /// Returns a [`serde_json::Error`] if serialisation fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl std::fmt::Display for IntegrityReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", if self.ok { "PASS" } else { "FAIL" })?;
        for (name, variable) in &self.variables {
            let details: Vec<String> = [
                ("missing_unexpected", variable.missing_unexpected.len()),
                ("stale_manifest", variable.stale_manifest.len()),
                ("manifest_key_mismatch", variable.manifest_key_mismatch.len()),
                ("manifest_out_of_bounds", variable.manifest_out_of_bounds.len()),
            ]
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(finding, count)| format!("{finding}={count}"))
            .collect();
            if !details.is_empty() {
                writeln!(f, "{name}: {}", details.join(", "))?;
            }
        }
        for error in &self.errors {
            writeln!(f, "error: {error}")?;
        }
        if let Some(timing) = &self.timing {
            writeln!(
                f,
                "timing: total={:.3}s scan_specs={:.3}s manifest={:.3}s chunk_scan={:.3}s exists_calls={}",
                timing.total_s,
                timing.scan_specs_s,
                timing.manifest_s,
                timing.chunk_scan_s,
                timing.exists_calls
            )?;
        }
        Ok(())
    }
}

/// The result of creating a store.
#[derive(Clone, Debug, Serialize)]
pub struct CreateReport {
    pub(crate) manifests_written: Vec<String>,
    pub(crate) no_data_strategy: NoDataStrategy,
    pub(crate) ok: bool,
    pub(crate) removed_chunks: BTreeMap<String, Vec<ChunkRef>>,
    pub(crate) store_path: String,
}

impl CreateReport {
    /// The path of the created store.
    #[must_use]
    pub fn store_path(&self) -> &str {
        &self.store_path
    }

    /// The no-data strategy the store was created with.
    #[must_use]
    pub fn no_data_strategy(&self) -> NoDataStrategy {
        self.no_data_strategy
    }

    /// Returns true if the created store passed its integrity check.
    ///
    /// A store that fails the check is reported as [`CreateError::IntegrityFailure`](crate::CreateError::IntegrityFailure) instead, so a returned report is always ok.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.ok
    }

    /// Paths of the manifests written.
    #[must_use]
    pub fn manifests_written(&self) -> &[String] {
        &self.manifests_written
    }

    /// Chunks removed per array under the manifest strategy.
    #[must_use]
    pub fn removed_chunks(&self) -> &BTreeMap<String, Vec<ChunkRef>> {
        &self.removed_chunks
    }

    /// Serialise to pretty printed JSON.
    ///
    /// # Errors
    /// Returns a [`serde_json::Error`] if serialisation fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> IntegrityReport {
        let mut report = IntegrityReport::new("store.zarr".to_string(), false);
        let mut var = VariableIntegrity::new("var", true);
        var.expected_chunks = 4;
        var.missing_unexpected.push(ChunkRef::new(vec![0, 0], "c/0/0"));
        var.stale_manifest.push(ChunkRef::new(vec![1, 1], "c/1/1"));
        var.finalize(false);
        let mut x = VariableIntegrity::new("x", false);
        x.expected_chunks = 1;
        x.finalize(false);
        report.variables.insert("var".to_string(), var);
        report.variables.insert("x".to_string(), x);
        report.finalize();
        report
    }

    #[test]
    fn variable_integrity_policy() {
        let mut var = VariableIntegrity::new("var", true);
        var.stale_manifest.push(ChunkRef::new(vec![0], "c/0"));
        var.finalize(false);
        assert!(var.is_ok());
        var.finalize(true);
        assert!(!var.is_ok());

        let mut var = VariableIntegrity::new("var", true);
        var.manifest_out_of_bounds.push(ChunkRef::new(vec![9], "c/9"));
        var.finalize(false);
        assert!(!var.is_ok());
    }

    #[test]
    fn integrity_report_json() {
        let report = report();
        assert!(!report.is_ok());
        let value: serde_json::Value = serde_json::from_str(&report.to_json_pretty().unwrap()).unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(
            keys,
            ["errors", "ok", "store_path", "strict_stale_manifest", "variables"]
        );
        assert_eq!(
            value["variables"]["var"]["missing_unexpected"],
            serde_json::json!([{"coord": [0, 0], "key": "c/0/0"}])
        );
        assert_eq!(value["variables"]["x"]["ok"], true);
    }

    #[test]
    fn integrity_report_display() {
        let mut report = report();
        report.errors.push("something".to_string());
        report.timing = Some(IntegrityTiming {
            exists_calls: 5,
            ..Default::default()
        });
        assert_eq!(
            report.to_string(),
            "FAIL\nvar: missing_unexpected=1, stale_manifest=1\nerror: something\ntiming: total=0.000s scan_specs=0.000s manifest=0.000s chunk_scan=0.000s exists_calls=5\n"
        );
    }

    #[test]
    fn integrity_report_failed() {
        let report = IntegrityReport::failed("missing".to_string(), true, "Store does not exist: missing");
        assert!(!report.is_ok());
        assert!(report.variables().is_empty());
        assert_eq!(report.errors(), ["Store does not exist: missing"]);
    }
}
