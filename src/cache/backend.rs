//! Key-value cache backends
//!
//! `CacheBackend` is the byte-level contract the metadata store relies on.
//! `MokaBackend` implements it in process with per-entry expiry.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use moka::future::Cache;
use moka::Expiry;
use tracing::debug;

use super::errors::CacheError;

/// Default maximum number of cached entries
pub const DEFAULT_CACHE_CAPACITY: u64 = 10_000;

/// Byte-keyed cache with TTL writes
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError>;

    async fn set_with_ttl(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Check that the backend is reachable
    async fn ping(&self) -> Result<(), CacheError>;
}

/// Cached bytes together with the TTL they were written with
#[derive(Clone)]
struct CachedValue {
    bytes: Bytes,
    ttl: Duration,
}

/// Expires each entry after the TTL given at write time
///
/// Overwriting an entry restarts its TTL.
struct WriteTtl;

impl Expiry<String, CachedValue> for WriteTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process cache backend using Moka
pub struct MokaBackend {
    entries: Cache<String, CachedValue>,
}

impl MokaBackend {
    /// Create a backend holding at most `max_capacity` entries
    pub fn new(max_capacity: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(WriteTtl)
            .name("file_metadata_cache")
            .build();

        debug!(max_capacity = max_capacity, "Created in-process cache backend");
        Self { entries }
    }
}

impl Default for MokaBackend {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

#[async_trait]
impl CacheBackend for MokaBackend {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        Ok(self.entries.get(key).await.map(|cached| cached.bytes))
    }

    async fn set_with_ttl(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), CacheError> {
        self.entries
            .insert(key.to_string(), CachedValue { bytes: value, ttl })
            .await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.invalidate(key).await;
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}
