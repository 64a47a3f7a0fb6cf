//! Async front end for [`Bucket`]
//!
//! Each call is moved onto tokio's blocking pool and its result or error is
//! handed back to the awaiting task.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::bucket::{check_key, Bucket};
use crate::codec::{Codec, JsonCodec};
use crate::error::{BucketError, Result};

/// Cloneable async handle on a [`Bucket`]
pub struct AsyncBucket<C = JsonCodec> {
    bucket: Arc<Bucket<C>>,
}

impl<C> Clone for AsyncBucket<C> {
    fn clone(&self) -> Self {
        Self {
            bucket: Arc::clone(&self.bucket),
        }
    }
}

impl<C: Codec> From<Bucket<C>> for AsyncBucket<C> {
    fn from(bucket: Bucket<C>) -> Self {
        Self::new(bucket)
    }
}

impl<C: Codec> AsyncBucket<C> {
    /// Wrap `bucket`
    pub fn new(bucket: Bucket<C>) -> Self {
        Self {
            bucket: Arc::new(bucket),
        }
    }

    /// Blocking view of the same bucket
    pub fn blocking(&self) -> &Bucket<C> {
        &self.bucket
    }

    async fn run<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Bucket<C>) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let bucket = Arc::clone(&self.bucket);
        tokio::task::spawn_blocking(move || f(&bucket)).await?
    }

    /// See [`Bucket::get`]
    pub async fn get<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        check_key(key)?;
        let key = key.to_string();
        self.run(move |bucket| bucket.get(&key)).await
    }

    /// See [`Bucket::put`]
    ///
    /// The value is encoded on the calling task; only the write is offloaded.
    pub async fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        check_key(key)?;
        let bytes = self.bucket.codec().encode(value)?;
        let key = key.to_string();
        self.run(move |bucket| bucket.put_encoded(&key, &bytes)).await
    }

    /// See [`Bucket::contains`]
    pub async fn contains(&self, key: &str) -> Result<bool> {
        check_key(key)?;
        let key = key.to_string();
        self.run(move |bucket| bucket.contains(&key)).await
    }

    /// See [`Bucket::remove`]
    pub async fn remove(&self, key: &str) -> Result<()> {
        check_key(key)?;
        let key = key.to_string();
        self.run(move |bucket| bucket.remove(&key)).await
    }

    /// See [`Bucket::clear`]
    pub async fn clear(&self) -> Result<()> {
        self.run(|bucket| bucket.clear()).await
    }

    /// Close the bucket and delete its files
    ///
    /// Fails with [`BucketError::InvalidArgument`] while other clones of this
    /// handle are alive.
    pub async fn destroy(self) -> Result<()> {
        let bucket = Arc::try_unwrap(self.bucket).map_err(|shared| {
            warn!(
                "Refusing to destroy bucket with {} live handles",
                Arc::strong_count(&shared)
            );
            BucketError::InvalidArgument("bucket is shared by other handles")
        })?;
        tokio::task::spawn_blocking(move || bucket.destroy()).await?
    }
}
