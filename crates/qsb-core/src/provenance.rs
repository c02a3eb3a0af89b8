//! Schema and provenance stamps carried by serialized reports.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// `major.minor.patch` version of a report layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SchemaVersion {
    /// Bumped when a field is removed or changes meaning.
    pub major: u32,
    /// Bumped when fields are added.
    pub minor: u32,
    /// Bumped for fixes that keep the layout.
    pub patch: u32,
}

impl SchemaVersion {
    /// Version `major.minor.patch`.
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }

    /// Whether a reader of `self` can consume a payload written at `other`.
    pub fn reads(&self, other: &SchemaVersion) -> bool {
        self.major == other.major && self.minor >= other.minor
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self::new(1, 0, 0)
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Inputs and environment a report was produced from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RunProvenance {
    /// Stable hash of the benchmark configuration.
    pub config_hash: String,
    /// Canonical hash of the observable set.
    pub observables_hash: String,
    /// Master seed of the benchmark.
    pub seed: u64,
    /// RFC 3339 generation time.
    pub created_at: String,
    /// Crate name → version.
    pub tool_versions: BTreeMap<String, String>,
}

impl RunProvenance {
    /// Provenance without a timestamp or tool versions.
    pub fn new(config_hash: impl Into<String>, observables_hash: impl Into<String>, seed: u64) -> Self {
        Self {
            config_hash: config_hash.into(),
            observables_hash: observables_hash.into(),
            seed,
            ..Self::default()
        }
    }

    /// Sets the generation time.
    pub fn created_at(mut self, timestamp: impl Into<String>) -> Self {
        self.created_at = timestamp.into();
        self
    }

    /// Records a tool version.
    pub fn with_tool(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.tool_versions.insert(name.into(), version.into());
        self
    }
}
