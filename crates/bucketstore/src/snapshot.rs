//! Read handles on committed entries

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::sync::Arc;

use crate::cache::Inner;
use crate::editor::Editor;
use crate::error::{Error, Result};

/// Open files for every slot of one committed entry
///
/// The files stay readable even if the entry is replaced or evicted after
/// the snapshot was taken.
pub struct Snapshot {
    inner: Arc<Inner>,
    key: String,
    sequence_number: u64,
    files: Vec<File>,
    lengths: Vec<u64>,
}

impl Snapshot {
    pub(crate) fn new(
        inner: Arc<Inner>,
        key: String,
        sequence_number: u64,
        files: Vec<File>,
        lengths: Vec<u64>,
    ) -> Self {
        Self {
            inner,
            key,
            sequence_number,
            files,
            lengths,
        }
    }

    /// Internal key of the entry
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Commit sequence number observed by this snapshot
    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    fn check_slot(&self, slot: usize) -> Result<()> {
        if slot >= self.files.len() {
            return Err(Error::SlotOutOfRange {
                slot,
                value_count: self.files.len(),
            });
        }
        Ok(())
    }

    /// Length in bytes of `slot`
    pub fn length(&self, slot: usize) -> Result<u64> {
        self.check_slot(slot)?;
        Ok(self.lengths[slot])
    }

    /// Raw file of `slot`, positioned wherever the last read left it
    pub fn reader(&mut self, slot: usize) -> Result<&mut File> {
        self.check_slot(slot)?;
        Ok(&mut self.files[slot])
    }

    /// Read all of `slot`
    pub fn value(&mut self, slot: usize) -> Result<Vec<u8>> {
        self.check_slot(slot)?;
        let mut buf = Vec::with_capacity(self.lengths[slot] as usize);
        let file = &mut self.files[slot];
        file.seek(SeekFrom::Start(0))?;
        file.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Edit the entry, unless it changed since this snapshot was taken
    pub fn edit(&self) -> Result<Option<Editor>> {
        self.inner.begin_edit(&self.key, Some(self.sequence_number), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CacheConfig, DirectoryRegistry, DiskCache};
    use tempfile::TempDir;

    fn open(dir: &std::path::Path) -> DiskCache {
        DiskCache::open_with_registry(CacheConfig::new(dir, 1024), &DirectoryRegistry::new()).unwrap()
    }

    #[test]
    fn test_snapshot_reads() {
        let dir = TempDir::new().unwrap();
        let cache = open(dir.path());
        cache.put("k", b"payload").unwrap();

        let mut snapshot = cache.snapshot("k").unwrap().unwrap();
        assert_eq!(snapshot.length(0).unwrap(), 7);
        assert_eq!(snapshot.value(0).unwrap(), b"payload");
        // rereading starts over
        assert_eq!(snapshot.value(0).unwrap(), b"payload");

        let mut head = [0u8; 3];
        let reader = snapshot.reader(0).unwrap();
        reader.seek(SeekFrom::Start(0)).unwrap();
        reader.read_exact(&mut head).unwrap();
        assert_eq!(&head, b"pay");

        assert!(matches!(snapshot.value(1), Err(Error::SlotOutOfRange { .. })));
    }

    #[test]
    fn test_snapshot_survives_replacement() {
        let dir = TempDir::new().unwrap();
        let cache = open(dir.path());
        cache.put("k", b"first").unwrap();

        let mut snapshot = cache.snapshot("k").unwrap().unwrap();
        cache.remove("k").unwrap();

        assert_eq!(snapshot.value(0).unwrap(), b"first");
        assert_eq!(cache.get("k").unwrap(), None);
    }

    #[test]
    fn test_snapshot_edit() {
        let dir = TempDir::new().unwrap();
        let cache = open(dir.path());
        cache.put("k", b"v1").unwrap();

        let snapshot = cache.snapshot("k").unwrap().unwrap();
        let mut editor = snapshot.edit().unwrap().unwrap();
        editor.set(0, b"v2").unwrap();
        editor.commit().unwrap();

        // the snapshot is now stale
        assert!(snapshot.edit().unwrap().is_none());
        let fresh = cache.snapshot("k").unwrap().unwrap();
        assert!(fresh.sequence_number() > snapshot.sequence_number());
        fresh.edit().unwrap().unwrap().abort().unwrap();
    }

    #[test]
    fn test_snapshot_edit_after_remove() {
        let dir = TempDir::new().unwrap();
        let cache = open(dir.path());
        cache.put("k", b"v1").unwrap();

        let snapshot = cache.snapshot("k").unwrap().unwrap();
        cache.remove("k").unwrap();
        assert!(snapshot.edit().unwrap().is_none());
    }
}
