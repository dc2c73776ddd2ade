//! `xzarrguard` global configuration options, and per-call options.

use std::sync::OnceLock;

use derive_more::Display;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::Serialize;
use thiserror::Error;

/// Global configuration options for the `xzarrguard` crate.
///
/// Retrieve the global [`Config`] with [`global_config`] and modify it with [`global_config_mut`].
/// The defaults of [`CheckOptions`] and [`CreateOptions`] are taken from the global configuration.
///
/// ## Strict Stale Manifest
/// > default: [`false`]
///
/// If enabled, a manifest entry for a chunk that is present on disk fails the check of its array.
/// Otherwise such entries are reported as `stale_manifest` findings without affecting the verdict.
///
/// ## No-Data Strategy
/// > default: [`NoDataStrategy::Manifest`]
///
/// How the store builder treats chunks declared as no-data. See [`NoDataStrategy`].
///
/// ## Consolidated Metadata
/// > default: [`false`]
///
/// If enabled, the bundled dataset writer embeds consolidated metadata in the root group.
#[derive(Debug, Clone)]
pub struct Config {
    strict_stale_manifest: bool,
    no_data_strategy: NoDataStrategy,
    consolidated_metadata: bool,
}

#[allow(clippy::derivable_impls)]
impl Default for Config {
    fn default() -> Self {
        Self {
            strict_stale_manifest: false,
            no_data_strategy: NoDataStrategy::Manifest,
            consolidated_metadata: false,
        }
    }
}

impl Config {
    /// Get the [strict stale manifest](#strict-stale-manifest) configuration.
    #[must_use]
    pub fn strict_stale_manifest(&self) -> bool {
        self.strict_stale_manifest
    }

    /// Set the [strict stale manifest](#strict-stale-manifest) configuration.
    pub fn set_strict_stale_manifest(&mut self, strict_stale_manifest: bool) -> &mut Self {
        self.strict_stale_manifest = strict_stale_manifest;
        self
    }

    /// Get the [no-data strategy](#no-data-strategy) configuration.
    #[must_use]
    pub fn no_data_strategy(&self) -> NoDataStrategy {
        self.no_data_strategy
    }

    /// Set the [no-data strategy](#no-data-strategy) configuration.
    pub fn set_no_data_strategy(&mut self, no_data_strategy: NoDataStrategy) -> &mut Self {
        self.no_data_strategy = no_data_strategy;
        self
    }

    /// Get the [consolidated metadata](#consolidated-metadata) configuration.
    #[must_use]
    pub fn consolidated_metadata(&self) -> bool {
        self.consolidated_metadata
    }

    /// Set the [consolidated metadata](#consolidated-metadata) configuration.
    pub fn set_consolidated_metadata(&mut self, consolidated_metadata: bool) -> &mut Self {
        self.consolidated_metadata = consolidated_metadata;
        self
    }
}

static CONFIG: OnceLock<RwLock<Config>> = OnceLock::new();

/// Returns a reference to the global `xzarrguard` configuration.
///
/// This might deadlock if the global config is already mutably held by the current thread.
pub fn global_config() -> RwLockReadGuard<'static, Config> {
    CONFIG.get_or_init(|| RwLock::new(Config::default())).read()
}

/// Returns a mutable reference to the global `xzarrguard` configuration.
///
/// This might deadlock if the global config is already held by the current thread.
pub fn global_config_mut() -> RwLockWriteGuard<'static, Config> {
    CONFIG.get_or_init(|| RwLock::new(Config::default())).write()
}

/// How the store builder treats chunks declared as no-data.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Display, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoDataStrategy {
    /// Delete the declared chunks after writing and record them in a per-array manifest.
    #[display("manifest")]
    Manifest,
    /// Keep the fill-value chunks written for the declared chunks, so no manifest is needed.
    #[display("empty_chunks")]
    EmptyChunks,
}

/// An unrecognised no-data strategy.
#[derive(Debug, Clone, Error)]
#[error("no_data_strategy must be 'manifest' or 'empty_chunks', found '{0}'")]
pub struct InvalidNoDataStrategyError(String);

impl std::str::FromStr for NoDataStrategy {
    type Err = InvalidNoDataStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manifest" => Ok(Self::Manifest),
            "empty_chunks" => Ok(Self::EmptyChunks),
            _ => Err(InvalidNoDataStrategyError(s.to_string())),
        }
    }
}

/// Options for checking a store.
#[derive(Debug, Clone, Copy)]
pub struct CheckOptions {
    strict_stale_manifest: bool,
    timing: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            strict_stale_manifest: global_config().strict_stale_manifest(),
            timing: false,
        }
    }
}

impl CheckOptions {
    /// Return the strict stale manifest policy.
    #[must_use]
    pub fn strict_stale_manifest(&self) -> bool {
        self.strict_stale_manifest
    }

    /// Set the strict stale manifest policy.
    #[must_use]
    pub fn with_strict_stale_manifest(mut self, strict_stale_manifest: bool) -> Self {
        self.strict_stale_manifest = strict_stale_manifest;
        self
    }

    /// Return whether timing is collected.
    #[must_use]
    pub fn timing(&self) -> bool {
        self.timing
    }

    /// Set whether timing is collected.
    #[must_use]
    pub fn with_timing(mut self, timing: bool) -> Self {
        self.timing = timing;
        self
    }
}

/// Options for creating a store.
#[derive(Debug, Clone, Copy)]
pub struct CreateOptions {
    no_data_strategy: NoDataStrategy,
    overwrite: bool,
    consolidated_metadata: bool,
}

impl Default for CreateOptions {
    fn default() -> Self {
        let config = global_config();
        Self {
            no_data_strategy: config.no_data_strategy(),
            overwrite: false,
            consolidated_metadata: config.consolidated_metadata(),
        }
    }
}

impl CreateOptions {
    /// Return the no-data strategy.
    #[must_use]
    pub fn no_data_strategy(&self) -> NoDataStrategy {
        self.no_data_strategy
    }

    /// Set the no-data strategy.
    #[must_use]
    pub fn with_no_data_strategy(mut self, no_data_strategy: NoDataStrategy) -> Self {
        self.no_data_strategy = no_data_strategy;
        self
    }

    /// Return whether an existing store is replaced.
    #[must_use]
    pub fn overwrite(&self) -> bool {
        self.overwrite
    }

    /// Set whether an existing store is replaced.
    #[must_use]
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Return whether the bundled writer embeds consolidated metadata.
    #[must_use]
    pub fn consolidated_metadata(&self) -> bool {
        self.consolidated_metadata
    }

    /// Set whether the bundled writer embeds consolidated metadata.
    #[must_use]
    pub fn with_consolidated_metadata(mut self, consolidated_metadata: bool) -> Self {
        self.consolidated_metadata = consolidated_metadata;
        self
    }
}
