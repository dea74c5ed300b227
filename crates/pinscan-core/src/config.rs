//! TOML configuration.
//!
//! ```toml
//! [scan]
//! max_in_flight = 128
//! threads = 4
//! unresolved_revision = "partial"
//! skip_unknown = true
//!
//! [[catalog.entries]]
//! name = "pipeline"
//! identifier = { keyword = "model" }
//! revision = { keyword = "revision" }
//! trust_flags = ["token"]
//! ```
//!
//! Every key is optional. Command-line flags override file values.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::{DEFAULT_MAX_IN_FLIGHT, ScanOptions};
use crate::error::{CatalogError, ConfigError};
use crate::rules::catalog::{ApiEntry, Catalog};
use crate::rules::classify::{ClassifyPolicy, UnresolvedRevision};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct PinscanConfig {
    pub scan: ScanSection,
    pub catalog: CatalogSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ScanSection {
    pub max_in_flight: usize,
    /// Worker threads; `None` leaves the rayon default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
    pub unresolved_revision: UnresolvedRevision,
    pub skip_unknown: bool,
}

impl Default for ScanSection {
    fn default() -> Self {
        Self {
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            threads: None,
            unresolved_revision: UnresolvedRevision::default(),
            skip_unknown: false,
        }
    }
}

/// Entries appended to the builtin catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogSection {
    pub entries: Vec<ApiEntry>,
}

impl PinscanConfig {
    pub fn from_toml(path: &Path, text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Builtin catalog plus the configured entries, validated as a whole.
    pub fn build_catalog(&self) -> Result<Catalog, CatalogError> {
        let catalog = Catalog::with_extra(self.catalog.entries.clone())?;
        info!(
            entries = catalog.len(),
            extra = self.catalog.entries.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            max_in_flight: self.scan.max_in_flight,
            policy: ClassifyPolicy {
                unresolved_revision: self.scan.unresolved_revision,
            },
        }
    }
}

pub fn load_config(path: &Path) -> Result<PinscanConfig, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    PinscanConfig::from_toml(path, &text)
}
