//! # bucketstore
//!
//! Disk-backed, size-bounded LRU cache of byte values.
//!
//! ## Design
//! - One directory per cache, claimed in a process-wide registry
//! - Append-only journal replayed on open, compacted when redundant
//! - Values staged in temp files and renamed into place on commit
//! - Least recently used entries evicted once the byte budget is exceeded
//!
//! ```no_run
//! use bucketstore::{CacheConfig, DiskCache};
//!
//! # fn main() -> bucketstore::Result<()> {
//! let cache = DiskCache::open(CacheConfig::new("/tmp/bucket", 10 * 1024 * 1024))?;
//! cache.put("greeting", b"hello")?;
//! assert_eq!(cache.get("greeting")?, Some(b"hello".to_vec()));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod cache;
mod config;
mod editor;
mod error;
pub mod journal;
pub mod key;
mod lru;
mod registry;
mod snapshot;
mod stats;

pub use cache::DiskCache;
pub use config::{CacheConfig, DEFAULT_REBUILD_THRESHOLD};
pub use editor::{Editor, SlotWriter, ValueStream};
pub use error::{Error, Result};
pub use registry::DirectoryRegistry;
pub use snapshot::Snapshot;
pub use stats::CacheStats;
