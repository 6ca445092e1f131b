//! Configuration types

use crate::{ConfigError, DiskCacheError, DiskCacheResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for an on-disk store.
///
/// Every field has a default so a host can deserialize a partial TOML table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding the database files. Created if missing.
    pub path: PathBuf,
    /// Maximum size of the memory map in megabytes.
    pub max_size_mb: usize,
    /// Maximum number of concurrent read transactions.
    pub max_readers: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("diskcache"),
            max_size_mb: 64,
            max_readers: 126,
        }
    }
}

impl StoreConfig {
    /// Create a config for `path` with default limits.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Set the map size.
    pub fn with_max_size_mb(mut self, max_size_mb: usize) -> Self {
        self.max_size_mb = max_size_mb;
        self
    }

    /// Set the reader limit.
    pub fn with_max_readers(mut self, max_readers: u32) -> Self {
        self.max_readers = max_readers;
        self
    }

    /// Parse a config from a TOML document and validate it.
    pub fn from_toml_str(input: &str) -> DiskCacheResult<Self> {
        let config: Self = toml::from_str(input).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Map size in bytes.
    pub fn map_size_bytes(&self) -> usize {
        self.max_size_mb.saturating_mul(1024 * 1024)
    }

    /// Validate the configuration.
    /// Returns Ok(()) if valid, Err(DiskCacheError::Config) if invalid.
    pub fn validate(&self) -> DiskCacheResult<()> {
        if self.path.as_os_str().is_empty() {
            return Err(DiskCacheError::Config(ConfigError::MissingRequired {
                field: "path".to_string(),
            }));
        }

        if self.max_size_mb == 0 {
            return Err(DiskCacheError::Config(ConfigError::InvalidValue {
                field: "max_size_mb".to_string(),
                value: self.max_size_mb.to_string(),
                reason: "max_size_mb must be greater than 0".to_string(),
            }));
        }

        if self.max_readers == 0 {
            return Err(DiskCacheError::Config(ConfigError::InvalidValue {
                field: "max_readers".to_string(),
                value: self.max_readers.to_string(),
                reason: "max_readers must be greater than 0".to_string(),
            }));
        }

        Ok(())
    }
}
