//! Cache configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default redundant-record count before the journal is rebuilt
pub const DEFAULT_REBUILD_THRESHOLD: usize = 2000;

/// Settings fixed when a cache is opened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory holding the journal and value files
    pub directory: PathBuf,
    /// Application version; opening with a different one discards the cache
    pub app_version: u32,
    /// Number of value slots per entry
    pub value_count: usize,
    /// Byte budget for all readable values
    pub max_size: u64,
    /// Redundant journal records tolerated before a rebuild
    pub rebuild_threshold: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::new(),
            app_version: 1,
            value_count: 1,
            max_size: 0,
            rebuild_threshold: DEFAULT_REBUILD_THRESHOLD,
        }
    }
}

impl CacheConfig {
    /// Configuration for a single-slot cache at `directory`
    pub fn new<P: AsRef<Path>>(directory: P, max_size: u64) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
            max_size,
            ..Self::default()
        }
    }

    /// Set the application version
    pub fn with_app_version(mut self, app_version: u32) -> Self {
        self.app_version = app_version;
        self
    }

    /// Set the number of value slots per entry
    pub fn with_value_count(mut self, value_count: usize) -> Self {
        self.value_count = value_count;
        self
    }

    /// Set the rebuild threshold
    pub fn with_rebuild_threshold(mut self, rebuild_threshold: usize) -> Self {
        self.rebuild_threshold = rebuild_threshold;
        self
    }

    /// Reject settings no cache can be opened with
    pub fn validate(&self) -> Result<()> {
        if self.directory.as_os_str().is_empty() {
            return Err(Error::config("directory is empty"));
        }
        if self.value_count == 0 {
            return Err(Error::config("value count must be positive"));
        }
        if self.max_size == 0 {
            return Err(Error::config("max size must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(CacheConfig::new("/tmp/cache", 1024).validate().is_ok());
        assert!(matches!(
            CacheConfig::new("/tmp/cache", 0).validate(),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            CacheConfig::new("", 10).validate(),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            CacheConfig::new("/tmp/cache", 10)
                .with_value_count(0)
                .validate(),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: CacheConfig =
            serde_json::from_str(r#"{"directory": "/var/cache/app", "max_size": 4096}"#).unwrap();

        assert_eq!(config.directory, PathBuf::from("/var/cache/app"));
        assert_eq!(config.max_size, 4096);
        assert_eq!(config.app_version, 1);
        assert_eq!(config.value_count, 1);
        assert_eq!(config.rebuild_threshold, DEFAULT_REBUILD_THRESHOLD);
    }

    #[test]
    fn test_builder_setters() {
        let config = CacheConfig::new("/tmp/cache", 10)
            .with_app_version(3)
            .with_value_count(2)
            .with_rebuild_threshold(5);

        assert_eq!(config.app_version, 3);
        assert_eq!(config.value_count, 2);
        assert_eq!(config.rebuild_threshold, 5);
    }
}
