//! Typed key-value bucket over a [`DiskCache`]

use std::path::{Path, PathBuf};

use bucketstore::{CacheConfig, CacheStats, DirectoryRegistry, DiskCache};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::codec::{Codec, JsonCodec};
use crate::error::{BucketError, Result};

/// Slot holding the encoded value
pub const VALUE_SLOT: usize = 0;
/// Slot reserved for per-entry metadata, written empty
pub const METADATA_SLOT: usize = 1;
const SLOT_COUNT: usize = 2;

pub(crate) fn check_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(BucketError::InvalidArgument("key is null or empty"));
    }
    Ok(())
}

/// Disk-backed store of encoded values, one per key
///
/// All methods block on disk I/O; see [`crate::AsyncBucket`] for an async
/// front end.
pub struct Bucket<C = JsonCodec> {
    cache: DiskCache,
    codec: C,
}

impl Bucket<JsonCodec> {
    /// Start configuring a bucket stored in `directory` with a byte budget
    pub fn builder(directory: impl AsRef<Path>, max_size: u64) -> Builder<JsonCodec> {
        Builder {
            directory: directory.as_ref().to_path_buf(),
            max_size,
            app_version: 1,
            codec: JsonCodec,
            registry: None,
        }
    }
}

impl<C: Codec> Bucket<C> {
    /// Wrap an already open cache
    pub fn with_cache(cache: DiskCache, codec: C) -> Self {
        Self { cache, codec }
    }

    /// Read and decode the value stored under `key`
    ///
    /// An empty stored value reads as `None`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        check_key(key)?;
        let Some(mut snapshot) = self.cache.snapshot(key)? else {
            return Ok(None);
        };
        let bytes = snapshot.value(VALUE_SLOT)?;
        if bytes.is_empty() {
            return Ok(None);
        }
        self.codec.decode(&bytes).map(Some)
    }

    /// Encode and store `value` under `key`
    pub fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        check_key(key)?;
        let bytes = self.codec.encode(value)?;
        self.put_encoded(key, &bytes)
    }

    /// Store already encoded bytes, resetting the metadata slot
    pub(crate) fn put_encoded(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let empty: &[u8] = &[];
        let mut values = [empty; SLOT_COUNT];
        values[VALUE_SLOT] = bytes;
        self.cache.put_values(key, &values)?;
        Ok(())
    }

    /// Whether a value is stored under `key`
    pub fn contains(&self, key: &str) -> Result<bool> {
        check_key(key)?;
        Ok(self.cache.contains(key)?)
    }

    /// Remove the value stored under `key`, if any
    pub fn remove(&self, key: &str) -> Result<()> {
        check_key(key)?;
        if !self.cache.remove(key)? {
            debug!("Nothing removed for key {:?}", key);
        }
        Ok(())
    }

    /// Remove every value
    pub fn clear(&self) -> Result<()> {
        Ok(self.cache.clear()?)
    }

    /// Close the bucket and delete its files
    pub fn destroy(self) -> Result<()> {
        Ok(self.cache.destroy()?)
    }

    /// Close the bucket, keeping its files for the next open
    pub fn close(self) -> Result<()> {
        Ok(self.cache.close()?)
    }

    /// Activity counters of the underlying cache
    pub fn stats(&self) -> &CacheStats {
        self.cache.stats()
    }

    /// Underlying byte cache
    pub fn cache(&self) -> &DiskCache {
        &self.cache
    }

    /// Codec used for values
    pub fn codec(&self) -> &C {
        &self.codec
    }
}

/// Builder for [`Bucket`]
pub struct Builder<C> {
    directory: PathBuf,
    max_size: u64,
    app_version: u32,
    codec: C,
    registry: Option<DirectoryRegistry>,
}

impl<C: Codec> Builder<C> {
    /// Encode values with `codec` instead
    pub fn with_codec<D: Codec>(self, codec: D) -> Builder<D> {
        Builder {
            directory: self.directory,
            max_size: self.max_size,
            app_version: self.app_version,
            codec,
            registry: self.registry,
        }
    }

    /// Version of the stored data; opening with a different version
    /// discards the existing contents
    pub fn with_app_version(mut self, app_version: u32) -> Self {
        self.app_version = app_version;
        self
    }

    /// Claim the directory in `registry` instead of the process-wide one
    pub fn with_registry(mut self, registry: DirectoryRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Open the bucket
    pub fn build(self) -> Result<Bucket<C>> {
        let config = CacheConfig::new(&self.directory, self.max_size)
            .with_app_version(self.app_version)
            .with_value_count(SLOT_COUNT);
        let cache = match &self.registry {
            Some(registry) => DiskCache::open_with_registry(config, registry)?,
            None => DiskCache::open(config)?,
        };
        info!("Opened bucket at {:?}", cache.directory());
        Ok(Bucket::with_cache(cache, self.codec))
    }
}
