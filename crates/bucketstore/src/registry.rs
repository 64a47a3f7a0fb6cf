//! Registry of cache directories open in this process
//!
//! A directory may back at most one live cache. The registry is an explicit
//! handle so embedders and tests can use isolated instances; `DiskCache::open`
//! uses [`DirectoryRegistry::global`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::error::{Error, Result};

static GLOBAL: Lazy<DirectoryRegistry> = Lazy::new(DirectoryRegistry::new);

/// Guarded set of canonical directory paths in use
#[derive(Debug, Clone, Default)]
pub struct DirectoryRegistry {
    dirs: Arc<Mutex<HashSet<PathBuf>>>,
}

impl DirectoryRegistry {
    /// Create an empty, isolated registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry
    pub fn global() -> Self {
        GLOBAL.clone()
    }

    /// Claim `dir`, which must already be canonical
    pub(crate) fn acquire(&self, dir: &Path) -> Result<DirectoryLease> {
        let mut dirs = self.dirs.lock();
        if !dirs.insert(dir.to_path_buf()) {
            return Err(Error::config(format!(
                "cache directory {} is already in use",
                dir.display()
            )));
        }

        Ok(DirectoryLease {
            registry: self.clone(),
            dir: dir.to_path_buf(),
        })
    }

    /// Whether `dir` is currently claimed
    pub fn contains(&self, dir: &Path) -> bool {
        let dir = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
        self.dirs.lock().contains(&dir)
    }

    /// Number of directories claimed
    pub fn len(&self) -> usize {
        self.dirs.lock().len()
    }

    /// Check if no directory is claimed
    pub fn is_empty(&self) -> bool {
        self.dirs.lock().is_empty()
    }
}

/// Claim on a directory, released on drop
#[derive(Debug)]
pub(crate) struct DirectoryLease {
    registry: DirectoryRegistry,
    dir: PathBuf,
}

impl Drop for DirectoryLease {
    fn drop(&mut self) {
        self.registry.dirs.lock().remove(&self.dir);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_acquire_and_release() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().canonicalize().unwrap();
        let registry = DirectoryRegistry::new();

        let lease = registry.acquire(&path).unwrap();
        assert!(registry.contains(&path));
        assert!(matches!(
            registry.acquire(&path),
            Err(Error::Configuration(_))
        ));

        drop(lease);
        assert!(registry.is_empty());
        registry.acquire(&path).unwrap();
    }

    #[test]
    fn test_registries_are_isolated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().canonicalize().unwrap();

        let a = DirectoryRegistry::new();
        let b = DirectoryRegistry::new();
        let _lease = a.acquire(&path).unwrap();

        assert!(b.acquire(&path).is_ok());
        assert_eq!(a.len(), 1);
    }
}
