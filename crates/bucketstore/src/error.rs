//! Error types for bucketstore

use std::io;

use thiserror::Error;

/// Result type alias for bucketstore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for cache operations
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid arguments or a directory that is already open
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Value can never fit in the cache
    #[error("Value too large: {size} bytes (max {max} bytes)")]
    Capacity {
        /// Size of the rejected value
        size: u64,
        /// Configured maximum cache size
        max: u64,
    },

    /// Another editor is live for this key
    #[error("Entry {0} is already being edited")]
    ConcurrentEdit(String),

    /// A new entry was committed without a value for every slot
    #[error("Edit of new entry {key} did not write slot {slot}")]
    IncompleteEdit {
        /// Internal key of the entry
        key: String,
        /// First slot left unwritten
        slot: usize,
    },

    /// The entry behind an editor was cleared away
    #[error("Editor for {0} was detached by clear")]
    EditorDetached(String),

    /// Slot index outside `0..value_count`
    #[error("Slot {slot} out of range (value count {value_count})")]
    SlotOutOfRange {
        /// Requested slot
        slot: usize,
        /// Configured value count
        value_count: usize,
    },

    /// Journal header does not describe this cache
    #[error("Journal error: {0}")]
    Journal(String),

    /// Cache is closed
    #[error("Cache is closed")]
    Closed,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }
}

impl From<nom::Err<nom::error::Error<&[u8]>>> for Error {
    fn from(err: nom::Err<nom::error::Error<&[u8]>>) -> Self {
        Error::Journal(format!("{:?}", err))
    }
}
