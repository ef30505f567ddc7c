//! Cache-backed metadata store
//!
//! Typed get/put/invalidate operations for single file records and the
//! aggregate listing, on top of a byte-level `CacheBackend`.
//!
//! Every backend result passes through `absorb`, which logs failures and
//! turns them into a miss (reads) or a no-op (writes).

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, trace, warn};

use super::backend::CacheBackend;
use super::errors::CacheError;
use crate::metadata::{FileId, FileRecord};

/// TTL for single file records
pub const RECORD_TTL: Duration = Duration::from_secs(60 * 60);

/// TTL for the aggregate listing
pub const LISTING_TTL: Duration = Duration::from_secs(5 * 60);

/// Upper bound on any single backend round-trip
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_millis(500);

/// Cache key of the aggregate listing
const LISTING_KEY: &str = "files:all";

fn record_key(id: &FileId) -> String {
    format!("file:{}", id.as_str())
}

/// Typed metadata cache with best-effort semantics
pub struct MetadataStore {
    backend: Arc<dyn CacheBackend>,
    record_ttl: Duration,
    listing_ttl: Duration,
    op_timeout: Duration,
    /// Cache hit counter
    hits: AtomicU64,
    /// Cache miss counter
    misses: AtomicU64,
}

impl MetadataStore {
    /// Create a store with the default TTLs and timeout
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend,
            record_ttl: RECORD_TTL,
            listing_ttl: LISTING_TTL,
            op_timeout: DEFAULT_OP_TIMEOUT,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Override the TTLs
    ///
    /// # Arguments
    /// * `record_ttl` - TTL for single file records
    /// * `listing_ttl` - TTL for the aggregate listing
    pub fn with_ttls(mut self, record_ttl: Duration, listing_ttl: Duration) -> Self {
        self.record_ttl = record_ttl;
        self.listing_ttl = listing_ttl;
        self
    }

    /// Override the per-operation backend timeout
    pub fn with_op_timeout(mut self, op_timeout: Duration) -> Self {
        self.op_timeout = op_timeout;
        self
    }

    pub fn record_ttl(&self) -> Duration {
        self.record_ttl
    }

    pub fn listing_ttl(&self) -> Duration {
        self.listing_ttl
    }

    /// Get a cached file record
    ///
    /// Returns None on miss, backend failure, or an undecodable entry.
    pub async fn get_record(&self, id: &FileId) -> Option<FileRecord> {
        self.fetch(&record_key(id)).await
    }

    /// Cache a file record
    pub async fn put_record(&self, record: &FileRecord, ttl: Duration) {
        self.write(&record_key(&record.id), record, ttl).await;
    }

    /// Drop a cached file record
    pub async fn invalidate_record(&self, id: &FileId) {
        self.remove(&record_key(id)).await;
    }

    /// Get the cached aggregate listing
    pub async fn get_listing(&self) -> Option<Vec<FileRecord>> {
        self.fetch(LISTING_KEY).await
    }

    /// Cache the aggregate listing, replacing any previous one
    pub async fn put_listing(&self, records: &[FileRecord], ttl: Duration) {
        self.write(LISTING_KEY, records, ttl).await;
    }

    /// Drop the cached aggregate listing
    ///
    /// Call after every successful write to storage.
    pub async fn invalidate_listing(&self) {
        self.remove(LISTING_KEY).await;
    }

    /// Whether the backend currently answers, bypassing any caching
    pub async fn is_reachable(&self) -> bool {
        let result = self.call(self.backend.ping()).await;
        absorb("ping", "-", result).is_some()
    }

    async fn fetch<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let result = self.call(self.backend.get(key)).await;
        let Some(bytes) = absorb("get", key, result).flatten() else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            trace!(key = key, "Cache MISS");
            return None;
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                trace!(key = key, "Cache HIT");
                Some(value)
            }
            Err(e) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                absorb::<()>("decode", key, Err(CacheError::Codec(e)));
                self.remove(key).await;
                None
            }
        }
    }

    async fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) {
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => Bytes::from(bytes),
            Err(e) => {
                absorb::<()>("encode", key, Err(CacheError::Codec(e)));
                return;
            }
        };
        let size = bytes.len();

        let result = self.call(self.backend.set_with_ttl(key, bytes, ttl)).await;
        if absorb("set", key, result).is_some() {
            debug!(key = key, size = size, ttl_secs = ttl.as_secs(), "Cached metadata");
        }
    }

    async fn remove(&self, key: &str) {
        let result = self.call(self.backend.delete(key)).await;
        if absorb("delete", key, result).is_some() {
            debug!(key = key, "Invalidated cached metadata");
        }
    }

    /// Run a backend call under the operation timeout
    async fn call<T, F>(&self, op: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, CacheError>>,
    {
        tokio::time::timeout(self.op_timeout, op)
            .await
            .map_err(|_| CacheError::Timeout(self.op_timeout))?
    }

    /// Get cache statistics
    ///
    /// Returns (hits, misses, hit_rate)
    pub fn stats(&self) -> (u64, u64, f64) {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        (hits, misses, hit_rate)
    }

    /// Log current cache metrics
    pub fn log_metrics(&self) {
        let (hits, misses, hit_rate) = self.stats();
        debug!(
            hits = hits,
            misses = misses,
            hit_rate = format!("{:.1}%", hit_rate),
            "Cache metrics"
        );
    }
}

/// Single policy for cache failures: log and continue
fn absorb<T>(operation: &'static str, key: &str, result: Result<T, CacheError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(operation = operation, key = key, error = %e, "Cache operation failed, continuing without cache");
            None
        }
    }
}
