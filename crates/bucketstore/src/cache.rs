//! Disk cache engine
//!
//! Directory layout:
//! - `journal`: operation log replayed on open (see [`crate::journal`])
//! - `<key>.<slot>`: committed value of one slot
//! - `<key>.<slot>.tmp`: value being written by an editor
//!
//! Every structural change runs under one lock per cache. Value bytes are
//! read and written outside of it, through [`Snapshot`] and [`Editor`].

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::CacheConfig;
use crate::editor::Editor;
use crate::error::{Error, Result};
use crate::journal::{self, delete_if_exists, JournalHeader, JournalWriter, Record, Replay, JOURNAL_FILE};
use crate::key::internal_key;
use crate::lru::LruTable;
use crate::registry::{DirectoryLease, DirectoryRegistry};
use crate::snapshot::Snapshot;
use crate::stats::CacheStats;

/// Edit id given to entries left dirty by a previous process
const INTERRUPTED_EDIT: u64 = 0;

#[derive(Debug, Clone)]
struct Entry {
    lengths: Vec<u64>,
    /// A committed value exists
    readable: bool,
    /// Id of the live editor, if any
    editor: Option<u64>,
    sequence_number: u64,
}

impl Entry {
    fn new(value_count: usize) -> Self {
        Self {
            lengths: vec![0; value_count],
            readable: false,
            editor: None,
            sequence_number: 0,
        }
    }

    fn size(&self) -> u64 {
        self.lengths.iter().sum()
    }
}

struct State {
    /// `None` once the cache is closed
    journal: Option<JournalWriter>,
    entries: LruTable<String, Entry>,
    /// Sum of lengths over readable entries
    size: u64,
    max_size: u64,
    journal_records: usize,
    next_sequence: u64,
    next_edit_id: u64,
    lease: Option<DirectoryLease>,
}

impl State {
    fn ensure_open(&self) -> Result<()> {
        if self.journal.is_some() {
            Ok(())
        } else {
            Err(Error::Closed)
        }
    }

    fn append(&mut self, record: Record) -> Result<()> {
        let journal = self.journal.as_mut().ok_or(Error::Closed)?;
        journal.append(&record)?;
        self.journal_records += 1;
        Ok(())
    }

    fn rebuild_required(&self, threshold: usize) -> bool {
        let redundant = self.journal_records.saturating_sub(self.entries.len());
        redundant >= threshold && redundant >= self.entries.len()
    }

    fn take_sequence(&mut self) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        sequence
    }

    fn keys_where<F>(&self, mut pred: F) -> Vec<String>
    where
        F: FnMut(&Entry) -> bool,
    {
        self.entries
            .iter()
            .filter(|(_, entry)| pred(entry))
            .map(|(key, _)| key.clone())
            .collect()
    }
}

/// Apply `f` to the entry for `key`, creating it first if needed.
/// Either way the entry becomes most recently used.
fn upsert<F>(entries: &mut LruTable<String, Entry>, key: &str, value_count: usize, f: F)
where
    F: FnOnce(&mut Entry),
{
    if let Some(entry) = entries.get_mut(key) {
        f(entry);
        return;
    }
    let mut entry = Entry::new(value_count);
    f(&mut entry);
    entries.insert(key.to_string(), entry);
}

/// Delete every file directly inside `dir`
fn delete_contents(dir: &Path) -> io::Result<()> {
    for dirent in fs::read_dir(dir)? {
        let dirent = dirent?;
        if dirent.file_type()?.is_file() {
            delete_if_exists(&dirent.path())?;
        }
    }
    Ok(())
}

pub(crate) struct Inner {
    directory: PathBuf,
    header: JournalHeader,
    rebuild_threshold: usize,
    stats: CacheStats,
    state: Mutex<State>,
}

impl Inner {
    pub(crate) fn value_count(&self) -> usize {
        self.header.value_count
    }

    pub(crate) fn clean_file(&self, key: &str, slot: usize) -> PathBuf {
        self.directory.join(format!("{}.{}", key, slot))
    }

    pub(crate) fn dirty_file(&self, key: &str, slot: usize) -> PathBuf {
        self.directory.join(format!("{}.{}.tmp", key, slot))
    }

    pub(crate) fn directory(&self) -> &Path {
        &self.directory
    }

    /// Best-effort removal of an entry's temp files
    fn discard_dirty(&self, key: &str) {
        for slot in 0..self.value_count() {
            if let Err(e) = delete_if_exists(&self.dirty_file(key, slot)) {
                debug!("Failed to delete temp file for {} slot {}: {}", key, slot, e);
            }
        }
    }

    fn delete_clean(&self, key: &str) -> io::Result<()> {
        for slot in 0..self.value_count() {
            delete_if_exists(&self.clean_file(key, slot))?;
        }
        Ok(())
    }

    /// Rebuild in-memory state from a replayed journal
    fn restore(&self, state: &mut State, replay: Replay) -> Result<()> {
        let record_count = replay.records.len();
        let dropped_bytes = replay.dropped_bytes;
        let value_count = self.value_count();

        for record in replay.records {
            match record {
                Record::Remove(key) => {
                    state.entries.remove(&key);
                }
                Record::Read(key) => {
                    state.entries.get_mut(&key);
                }
                Record::Dirty(key) => upsert(&mut state.entries, &key, value_count, |entry| {
                    entry.editor = Some(INTERRUPTED_EDIT);
                }),
                Record::Clean(key, lengths) => upsert(&mut state.entries, &key, value_count, |entry| {
                    entry.readable = true;
                    entry.editor = None;
                    entry.lengths = lengths;
                }),
            }
        }

        // An edit that never completed leaves the last committed value, if any.
        let interrupted = state.keys_where(|entry| entry.editor.is_some());
        for key in &interrupted {
            self.discard_dirty(key);
            let readable = match state.entries.peek_mut(key.as_str()) {
                Some(entry) => {
                    entry.editor = None;
                    entry.readable
                }
                None => continue,
            };
            if !readable {
                self.delete_clean(key)?;
                state.entries.remove(key.as_str());
            }
        }

        let mut size = 0;
        for key in state.keys_where(|_| true) {
            let sequence = state.take_sequence();
            if let Some(entry) = state.entries.peek_mut(key.as_str()) {
                entry.sequence_number = sequence;
                size += entry.size();
            }
        }
        state.size = size;
        state.journal_records = record_count;

        if dropped_bytes > 0 {
            warn!(
                "Recovered journal in {:?}: dropped {} bytes after the last complete record",
                self.directory, dropped_bytes
            );
            self.stats.record_recovered_corruption();
        }
        if !interrupted.is_empty() {
            debug!("Discarded {} interrupted edit(s)", interrupted.len());
        }

        if dropped_bytes > 0 || !interrupted.is_empty() {
            self.rebuild_journal(state)
        } else {
            state.journal = Some(JournalWriter::open_append(&self.directory.join(JOURNAL_FILE))?);
            Ok(())
        }
    }

    /// Rewrite the journal from the entry table
    fn rebuild_journal(&self, state: &mut State) -> Result<()> {
        let mut records = Vec::with_capacity(state.entries.len());
        for key in state.keys_where(|_| true) {
            let sequence = state.take_sequence();
            let Some(entry) = state.entries.peek_mut(key.as_str()) else {
                continue;
            };
            entry.sequence_number = sequence;
            if entry.readable {
                records.push(Record::Clean(key.clone(), entry.lengths.clone()));
            }
            if entry.editor.is_some() {
                records.push(Record::Dirty(key));
            }
        }

        let record_count = records.len();
        state.journal = Some(journal::rebuild(&self.directory, self.header, records)?);
        state.journal_records = record_count;
        self.stats.record_rebuild();
        info!(
            "Rebuilt journal in {:?}: {} entries, {} records",
            self.directory,
            state.entries.len(),
            record_count
        );
        Ok(())
    }

    /// Evict until the size budget holds, then compact the journal if due
    fn cleanup(&self, state: &mut State) -> Result<()> {
        self.trim_to_size(state)?;
        if state.rebuild_required(self.rebuild_threshold) {
            self.rebuild_journal(state)?;
        }
        Ok(())
    }

    fn trim_to_size(&self, state: &mut State) -> Result<()> {
        while state.size > state.max_size {
            let victim = state
                .entries
                .find_lru(|entry| entry.readable && entry.editor.is_none());
            let Some(key) = victim else {
                break;
            };
            debug!("Evicting {} ({} > {} bytes)", key, state.size, state.max_size);
            self.remove_entry(state, &key)?;
            self.stats.record_eviction();
        }
        Ok(())
    }

    /// Remove a readable entry that has no live editor
    fn remove_entry(&self, state: &mut State, key: &str) -> Result<bool> {
        match state.entries.peek(key) {
            Some(entry) if entry.editor.is_none() => {}
            _ => return Ok(false),
        }

        self.delete_clean(key)?;
        if let Some(entry) = state.entries.remove(key) {
            if entry.readable {
                state.size -= entry.size();
            }
        }
        state.append(Record::Remove(key.to_string()))?;
        Ok(true)
    }

    pub(crate) fn snapshot(self: &Arc<Self>, key: &str) -> Result<Option<Snapshot>> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.ensure_open()?;

        let (lengths, sequence_number) = match state.entries.peek(key) {
            Some(entry) if entry.readable => (entry.lengths.clone(), entry.sequence_number),
            _ => {
                self.stats.record_miss();
                return Ok(None);
            }
        };

        let mut files = Vec::with_capacity(lengths.len());
        for slot in 0..lengths.len() {
            match File::open(self.clean_file(key, slot)) {
                Ok(file) => files.push(file),
                // deleted behind our back
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    self.stats.record_miss();
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            }
        }

        state.entries.get_mut(key);
        state.append(Record::Read(key.to_string()))?;
        self.cleanup(state)?;
        self.stats.record_hit();

        Ok(Some(Snapshot::new(
            Arc::clone(self),
            key.to_string(),
            sequence_number,
            files,
            lengths,
        )))
    }

    /// Start an edit. With `expected_sequence`, only an entry still carrying
    /// that sequence number may be edited; otherwise `Ok(None)`.
    ///
    /// `planned` gives the length each slot will be written with, `None` for
    /// a slot that keeps its committed value. An entry that would end up
    /// larger than the budget is refused with [`Error::Capacity`].
    pub(crate) fn begin_edit(
        self: &Arc<Self>,
        key: &str,
        expected_sequence: Option<u64>,
        planned: Option<&[Option<u64>]>,
    ) -> Result<Option<Editor>> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.ensure_open()?;

        let current = state.entries.peek(key);
        if let Some(planned) = planned {
            let retained = |slot: usize| match current {
                Some(entry) if entry.readable => entry.lengths.get(slot).copied().unwrap_or(0),
                _ => 0,
            };
            let size: u64 = planned
                .iter()
                .enumerate()
                .map(|(slot, len)| len.unwrap_or_else(|| retained(slot)))
                .sum();
            if size > state.max_size {
                return Err(Error::Capacity {
                    size,
                    max: state.max_size,
                });
            }
        }
        if let Some(expected) = expected_sequence {
            match current {
                Some(entry) if entry.readable && entry.sequence_number == expected => {}
                _ => return Ok(None),
            }
        }
        if current.is_some_and(|entry| entry.editor.is_some()) {
            return Err(Error::ConcurrentEdit(key.to_string()));
        }
        let readable = current.is_some_and(|entry| entry.readable);

        // flushed before any temp file exists, so a crash cannot leak them
        state.append(Record::Dirty(key.to_string()))?;

        let edit_id = state.next_edit_id;
        state.next_edit_id += 1;
        upsert(&mut state.entries, key, self.value_count(), |entry| {
            entry.editor = Some(edit_id);
        });

        Ok(Some(Editor::new(
            Arc::clone(self),
            key.to_string(),
            edit_id,
            readable,
        )))
    }

    /// Fail unless `edit_id` still owns the entry
    pub(crate) fn check_editor(&self, key: &str, edit_id: u64) -> Result<()> {
        let state = self.state.lock();
        state.ensure_open()?;
        match state.entries.peek(key) {
            Some(entry) if entry.editor == Some(edit_id) => Ok(()),
            _ => Err(Error::EditorDetached(key.to_string())),
        }
    }

    /// Committed value of `slot` as seen by the editor `edit_id`
    pub(crate) fn read_committed(&self, key: &str, edit_id: u64, slot: usize) -> Result<Option<Vec<u8>>> {
        let path = {
            let state = self.state.lock();
            state.ensure_open()?;
            match state.entries.peek(key) {
                Some(entry) if entry.editor == Some(edit_id) => {
                    if !entry.readable {
                        return Ok(None);
                    }
                }
                _ => return Err(Error::EditorDetached(key.to_string())),
            }
            self.clean_file(key, slot)
        };

        match fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Move written temp files into place, returning the new slot lengths
    fn publish(&self, key: &str, written: &[bool], old_lengths: &[u64]) -> io::Result<Vec<u64>> {
        let mut lengths = old_lengths.to_vec();
        for (slot, _) in written.iter().enumerate().filter(|(_, w)| **w) {
            let clean = self.clean_file(key, slot);
            fs::rename(self.dirty_file(key, slot), &clean)?;
            lengths[slot] = fs::metadata(&clean)?.len();
        }
        Ok(lengths)
    }

    /// Abort bookkeeping for an owned entry: the committed value, if any,
    /// stays readable
    fn abandon_edit(&self, state: &mut State, key: &str) -> Result<()> {
        self.discard_dirty(key);
        self.stats.record_abort();

        // CLEAN touches the entry on replay, so it does here too
        let old_lengths = match state.entries.get_mut(key) {
            Some(entry) if entry.readable => {
                entry.editor = None;
                Some(entry.lengths.clone())
            }
            _ => None,
        };

        match old_lengths {
            Some(lengths) => state.append(Record::Clean(key.to_string(), lengths)),
            None => {
                state.entries.remove(key);
                state.append(Record::Remove(key.to_string()))
            }
        }
    }

    /// Finish the edit `edit_id` of `key`: publish it when `commit` is set
    /// and every required slot was written, discard it otherwise
    pub(crate) fn complete_edit(&self, key: &str, edit_id: u64, written: &[bool], commit: bool) -> Result<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        // Closing or clearing already deleted this editor's temp files, and
        // the paths may now belong to a newer editor of the same key.
        if state.journal.is_none() {
            return if commit { Err(Error::Closed) } else { Ok(()) };
        }

        let (readable, old_lengths) = match state.entries.peek(key) {
            Some(entry) if entry.editor == Some(edit_id) => (entry.readable, entry.lengths.clone()),
            _ => {
                return if commit {
                    Err(Error::EditorDetached(key.to_string()))
                } else {
                    Ok(())
                };
            }
        };

        let mut outcome = Ok(());
        let mut commit = commit;
        if commit && !readable {
            if let Some(slot) = written.iter().position(|w| !w) {
                commit = false;
                outcome = Err(Error::IncompleteEdit {
                    key: key.to_string(),
                    slot,
                });
            }
        }

        if !commit {
            debug!("Aborting edit of {}", key);
            let abandoned = self.abandon_edit(state, key);
            let cleaned = self.cleanup(state);
            return outcome.and(abandoned).and(cleaned);
        }

        let old_size: u64 = if readable { old_lengths.iter().sum() } else { 0 };
        match self.publish(key, written, &old_lengths) {
            Ok(lengths) => {
                let sequence = state.take_sequence();
                if let Some(entry) = state.entries.get_mut(key) {
                    entry.editor = None;
                    entry.readable = true;
                    entry.lengths = lengths.clone();
                    entry.sequence_number = sequence;
                }
                state.size = state.size + lengths.iter().sum::<u64>() - old_size;
                self.stats.record_commit();
                outcome = state.append(Record::Clean(key.to_string(), lengths));
            }
            Err(e) => {
                // some slots may already be swapped: drop the entry entirely
                warn!("Commit of {} failed, removing entry: {}", key, e);
                self.discard_dirty(key);
                if let Err(delete_err) = self.delete_clean(key) {
                    debug!("Failed to delete value files for {}: {}", key, delete_err);
                }
                state.entries.remove(key);
                state.size -= old_size;
                self.stats.record_abort();
                if let Err(journal_err) = state.append(Record::Remove(key.to_string())) {
                    debug!("Failed to journal removal of {}: {}", key, journal_err);
                }
                outcome = Err(e.into());
            }
        }

        let cleaned = self.cleanup(state);
        outcome.and(cleaned)
    }

    /// Abort live edits, enforce the budget and close the journal
    fn shutdown(&self, state: &mut State) -> Result<()> {
        if state.journal.is_none() {
            return Ok(());
        }

        let editing = state.keys_where(|entry| entry.editor.is_some());
        let mut outcome = Ok(());
        for key in &editing {
            outcome = outcome.and(self.abandon_edit(state, key));
        }
        outcome = outcome.and(self.trim_to_size(state));

        if let Some(mut journal) = state.journal.take() {
            outcome = outcome.and(journal.sync());
        }
        outcome
    }
}

/// Size-bounded LRU cache of byte values stored in one directory
///
/// At most one `DiskCache` may be open per directory. Dropping the cache
/// closes it; outstanding [`Editor`]s and [`Snapshot`]s then fail with
/// [`Error::Closed`].
pub struct DiskCache {
    inner: Arc<Inner>,
}

impl DiskCache {
    /// Open or create a cache, claiming its directory in the global registry
    pub fn open(config: CacheConfig) -> Result<Self> {
        Self::open_with_registry(config, &DirectoryRegistry::global())
    }

    /// Open or create a cache, claiming its directory in `registry`
    pub fn open_with_registry(config: CacheConfig, registry: &DirectoryRegistry) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.directory)?;
        let directory = config.directory.canonicalize()?;
        let lease = registry.acquire(&directory)?;

        let header = JournalHeader {
            app_version: config.app_version,
            value_count: config.value_count,
        };

        journal::recover_backup(&directory)?;
        let journal_path = directory.join(JOURNAL_FILE);
        let replay = if journal_path.exists() {
            match journal::read_journal(&journal_path, header) {
                Ok(replay) => Some(replay),
                Err(Error::Journal(reason)) => {
                    warn!("Discarding unusable journal in {:?}: {}", directory, reason);
                    delete_contents(&directory)?;
                    None
                }
                Err(e) => return Err(e),
            }
        } else {
            None
        };

        let inner = Arc::new(Inner {
            directory,
            header,
            rebuild_threshold: config.rebuild_threshold,
            stats: CacheStats::new(),
            state: Mutex::new(State {
                journal: None,
                entries: LruTable::new(),
                size: 0,
                max_size: config.max_size,
                journal_records: 0,
                next_sequence: 1,
                next_edit_id: INTERRUPTED_EDIT + 1,
                lease: Some(lease),
            }),
        });

        {
            let mut guard = inner.state.lock();
            let state = &mut *guard;
            match replay {
                Some(replay) => inner.restore(state, replay)?,
                None => inner.rebuild_journal(state)?,
            }
            inner.cleanup(state)?;

            info!(
                "Opened cache at {:?}: {} entries, {} of {} bytes",
                inner.directory,
                state.entries.len(),
                state.size,
                state.max_size
            );
        }

        Ok(Self { inner })
    }

    /// Read slot 0 of the entry for `key`
    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.snapshot(key)? {
            Some(mut snapshot) => Ok(Some(snapshot.value(0)?)),
            None => Ok(None),
        }
    }

    /// Open a read handle on every slot of the entry for `key`
    ///
    /// Marks the entry most recently used.
    pub fn snapshot(&self, key: &str) -> Result<Option<Snapshot>> {
        self.inner.snapshot(&internal_key(key))
    }

    /// Whether a committed value exists for `key`
    ///
    /// Does not count as an access.
    pub fn contains(&self, key: &str) -> Result<bool> {
        let key = internal_key(key);
        let state = self.inner.state.lock();
        state.ensure_open()?;
        Ok(state.entries.peek(key.as_str()).is_some_and(|entry| entry.readable))
    }

    /// Open an exclusive editor for `key`
    ///
    /// Fails with [`Error::ConcurrentEdit`] while another editor is live.
    pub fn edit(&self, key: &str) -> Result<Editor> {
        self.edit_planned(key, None)
    }

    fn edit_planned(&self, key: &str, planned: Option<&[Option<u64>]>) -> Result<Editor> {
        let key = internal_key(key);
        // without an expected sequence number begin_edit never yields None
        self.inner
            .begin_edit(&key, None, planned)?
            .ok_or(Error::ConcurrentEdit(key))
    }

    /// Store `value` in slot 0; a new entry gets empty values in other slots
    ///
    /// Other slots of an existing entry are kept and count towards the
    /// capacity check.
    pub fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut planned = vec![None; self.value_count()];
        planned[0] = Some(value.len() as u64);

        let mut editor = self.edit_planned(key, Some(&planned))?;
        editor.set(0, value)?;
        if !editor.is_replacing() {
            for slot in 1..self.value_count() {
                editor.set(slot, &[])?;
            }
        }
        editor.commit()
    }

    /// Store one value per slot
    pub fn put_values(&self, key: &str, values: &[&[u8]]) -> Result<()> {
        if values.len() != self.value_count() {
            return Err(Error::config(format!(
                "expected {} values, got {}",
                self.value_count(),
                values.len()
            )));
        }
        let planned: Vec<Option<u64>> = values.iter().map(|v| Some(v.len() as u64)).collect();

        let mut editor = self.edit_planned(key, Some(&planned))?;
        for (slot, value) in values.iter().enumerate() {
            editor.set(slot, value)?;
        }
        editor.commit()
    }

    /// Remove the entry for `key`
    ///
    /// Returns `false` if there was nothing to remove or the entry is being
    /// edited.
    pub fn remove(&self, key: &str) -> Result<bool> {
        let key = internal_key(key);
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        state.ensure_open()?;

        let removed = self.inner.remove_entry(state, &key)?;
        if removed {
            debug!("Removed {}", key);
            self.inner.stats.record_removal();
        }
        self.inner.cleanup(state)?;
        Ok(removed)
    }

    /// Delete every entry and start a fresh journal
    ///
    /// Live editors are detached: their commit fails with
    /// [`Error::EditorDetached`].
    pub fn clear(&self) -> Result<()> {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        state.ensure_open()?;

        state.entries.clear();
        state.size = 0;
        state.journal = None;

        let deleted = delete_contents(&self.inner.directory);
        let rebuilt = self.inner.rebuild_journal(state);
        info!("Cleared cache at {:?}", self.inner.directory);
        deleted?;
        rebuilt
    }

    /// Enforce the size budget and fsync the journal
    pub fn flush(&self) -> Result<()> {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        state.ensure_open()?;

        self.inner.trim_to_size(state)?;
        match state.journal.as_mut() {
            Some(journal) => journal.sync(),
            None => Err(Error::Closed),
        }
    }

    /// Close the cache and release its directory
    pub fn close(self) -> Result<()> {
        self.release()
    }

    fn release(&self) -> Result<()> {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        let outcome = self.inner.shutdown(state);
        state.journal = None;
        state.lease = None;
        outcome
    }

    /// Close the cache and delete all of its files
    pub fn destroy(self) -> Result<()> {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        let shutdown = self.inner.shutdown(state);
        state.journal = None;
        state.entries.clear();
        state.size = 0;

        let deleted = delete_contents(&self.inner.directory);
        state.lease = None;
        info!("Destroyed cache at {:?}", self.inner.directory);
        deleted?;
        shutdown
    }

    /// Bytes used by readable values
    pub fn size(&self) -> u64 {
        self.inner.state.lock().size
    }

    /// Byte budget
    pub fn max_size(&self) -> u64 {
        self.inner.state.lock().max_size
    }

    /// Change the byte budget, evicting immediately if it shrank
    pub fn set_max_size(&self, max_size: u64) -> Result<()> {
        if max_size == 0 {
            return Err(Error::config("max size must be positive"));
        }
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        state.ensure_open()?;
        state.max_size = max_size;
        self.inner.cleanup(state)
    }

    /// Number of entries, including ones whose first edit is in progress
    pub fn len(&self) -> usize {
        self.inner.state.lock().entries.len()
    }

    /// Check if the cache has no entries
    pub fn is_empty(&self) -> bool {
        self.inner.state.lock().entries.is_empty()
    }

    /// Canonical cache directory
    pub fn directory(&self) -> &Path {
        self.inner.directory()
    }

    /// Number of value slots per entry
    pub fn value_count(&self) -> usize {
        self.inner.value_count()
    }

    /// Activity counters
    pub fn stats(&self) -> &CacheStats {
        &self.inner.stats
    }

    /// Whether the cache has been closed
    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().journal.is_none()
    }
}

impl Drop for DiskCache {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("Error closing cache at {:?}: {}", self.inner.directory, e);
        }
    }
}
