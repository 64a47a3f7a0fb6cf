//! # bucket
//!
//! Typed values in a size-bounded disk cache.
//!
//! [`Bucket`] encodes values with a [`Codec`] (JSON by default) and stores
//! them in a [`bucketstore::DiskCache`]. [`AsyncBucket`] exposes the same
//! operations to async code by running them on tokio's blocking pool.
//!
//! ```no_run
//! use bucket::Bucket;
//!
//! # fn main() -> bucket::Result<()> {
//! let bucket = Bucket::builder("/tmp/bucket", 10 * 1024 * 1024).build()?;
//! bucket.put("answer", &42)?;
//! assert_eq!(bucket.get::<i32>("answer")?, Some(42));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod async_bucket;
mod bucket;
mod codec;
mod error;

pub use async_bucket::AsyncBucket;
pub use bucket::{Bucket, Builder, METADATA_SLOT, VALUE_SLOT};
pub use codec::{Codec, JsonCodec};
pub use error::{BucketError, Result};
