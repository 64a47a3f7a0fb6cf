//! Editors: exclusive, atomic writes to one entry
//!
//! An editor stages each slot in `<key>.<slot>.tmp`. [`Editor::commit`]
//! renames the staged files over the committed ones; [`Editor::abort`]
//! deletes them. An editor dropped without either is aborted, so every
//! acquired editor reaches exactly one terminal state.
//!
//! Write failures are remembered: committing an editor whose writers failed
//! aborts it instead and returns the first failure.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::sync::Arc;

use tracing::debug;

use crate::cache::Inner;
use crate::error::{Error, Result};

/// Exclusive write handle on one entry
pub struct Editor {
    inner: Arc<Inner>,
    key: String,
    edit_id: u64,
    replacing: bool,
    written: Vec<bool>,
    failure: Option<io::Error>,
    done: bool,
}

impl Editor {
    pub(crate) fn new(inner: Arc<Inner>, key: String, edit_id: u64, replacing: bool) -> Self {
        let written = vec![false; inner.value_count()];
        Self {
            inner,
            key,
            edit_id,
            replacing,
            written,
            failure: None,
            done: false,
        }
    }

    /// Internal key of the entry being edited
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether the entry already had a committed value when the edit began
    ///
    /// Slots left unwritten keep that value. A new entry must have every
    /// slot written before commit.
    pub fn is_replacing(&self) -> bool {
        self.replacing
    }

    fn check_slot(&self, slot: usize) -> Result<()> {
        let value_count = self.written.len();
        if slot >= value_count {
            return Err(Error::SlotOutOfRange { slot, value_count });
        }
        Ok(())
    }

    fn create_dirty(&mut self, slot: usize) -> Result<File> {
        self.check_slot(slot)?;
        self.inner.check_editor(&self.key, self.edit_id)?;

        let path = self.inner.dirty_file(&self.key, slot);
        let file = match File::create(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                // the directory was removed underneath us
                fs::create_dir_all(self.inner.directory())?;
                File::create(&path)?
            }
            Err(e) => return Err(e.into()),
        };
        self.written[slot] = true;
        Ok(file)
    }

    pub(crate) fn record_failure(&mut self, e: &io::Error) {
        if self.failure.is_none() {
            self.failure = Some(io::Error::new(e.kind(), e.to_string()));
        }
    }

    /// Open a buffered writer on `slot`, replacing anything staged there
    pub fn writer(&mut self, slot: usize) -> Result<SlotWriter<'_>> {
        let file = self.create_dirty(slot)?;
        Ok(SlotWriter {
            out: BufWriter::new(file),
            editor: self,
        })
    }

    /// Stage `value` for `slot`
    pub fn set(&mut self, slot: usize, value: &[u8]) -> Result<()> {
        let mut writer = self.writer(slot)?;
        writer.write_all(value)?;
        writer.finish()
    }

    /// Turn the editor into a stream over `slot` that commits on close
    pub fn value_stream(mut self, slot: usize) -> Result<ValueStream> {
        let file = self.create_dirty(slot)?;
        Ok(ValueStream {
            out: Some(BufWriter::new(file)),
            editor: Some(self),
        })
    }

    /// The committed value of `slot`, or `None` for a new entry
    pub fn read_committed(&self, slot: usize) -> Result<Option<Vec<u8>>> {
        self.check_slot(slot)?;
        self.inner.read_committed(&self.key, self.edit_id, slot)
    }

    /// Publish the staged slots
    pub fn commit(mut self) -> Result<()> {
        self.done = true;
        if let Some(failure) = self.failure.take() {
            self.inner
                .complete_edit(&self.key, self.edit_id, &self.written, false)?;
            return Err(Error::Io(failure));
        }
        self.inner
            .complete_edit(&self.key, self.edit_id, &self.written, true)
    }

    /// Discard the staged slots
    pub fn abort(mut self) -> Result<()> {
        self.done = true;
        self.inner
            .complete_edit(&self.key, self.edit_id, &self.written, false)
    }
}

impl Drop for Editor {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        if let Err(e) = self
            .inner
            .complete_edit(&self.key, self.edit_id, &self.written, false)
        {
            debug!("Abort of dropped editor for {} failed: {}", self.key, e);
        }
    }
}

/// Buffered writer on one staged slot
///
/// Errors are reported to the caller and remembered by the editor.
pub struct SlotWriter<'a> {
    out: BufWriter<File>,
    editor: &'a mut Editor,
}

impl SlotWriter<'_> {
    /// Flush buffered bytes, reporting any failure
    pub fn finish(mut self) -> Result<()> {
        self.flush()?;
        Ok(())
    }
}

impl Write for SlotWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.out.write(buf).map_err(|e| {
            self.editor.record_failure(&e);
            e
        })
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush().map_err(|e| {
            self.editor.record_failure(&e);
            e
        })
    }
}

impl Drop for SlotWriter<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.out.flush() {
            self.editor.record_failure(&e);
        }
    }
}

/// Single-slot output stream owning its editor
///
/// [`ValueStream::close`] commits when every write succeeded and aborts
/// otherwise. Dropping an unclosed stream aborts.
pub struct ValueStream {
    out: Option<BufWriter<File>>,
    editor: Option<Editor>,
}

impl ValueStream {
    fn fail(&mut self, e: &io::Error) {
        if let Some(editor) = self.editor.as_mut() {
            editor.record_failure(e);
        }
    }

    /// Flush, then commit or abort
    pub fn close(mut self) -> Result<()> {
        if let Some(mut out) = self.out.take() {
            if let Err(e) = out.flush() {
                self.fail(&e);
            }
        }
        match self.editor.take() {
            Some(editor) => editor.commit(),
            None => Ok(()),
        }
    }
}

impl Write for ValueStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let Some(out) = self.out.as_mut() else {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "stream closed"));
        };
        match out.write(buf) {
            Ok(n) => Ok(n),
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        let Some(out) = self.out.as_mut() else {
            return Ok(());
        };
        match out.flush() {
            Ok(()) => Ok(()),
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }
}

impl Drop for ValueStream {
    fn drop(&mut self) {
        // close the file before the editor deletes it
        drop(self.out.take());
        drop(self.editor.take());
    }
}
