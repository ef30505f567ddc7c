//! Consistency coordinator
//!
//! Reads consult the metadata cache first and fall back to storage on a
//! miss, repopulating the cache. Uploads write through storage, then cache
//! the new record, then invalidate the listing. No lock spans storage and
//! cache: concurrent misses may recompute the same record or listing, which
//! is harmless because cache writes are full overwrites.

use std::sync::Arc;

use bytes::Bytes;
use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, warn};

use super::validation::{validate_upload, DEFAULT_MAX_UPLOAD_BYTES};
use crate::cache::MetadataStore;
use crate::error::{FileStoreError, Result};
use crate::metadata::{derive_record, FileId, FileRecord};
use crate::storage::{ByteStore, ByteStream, StorageHandle};

/// Maximum concurrent stat calls while rebuilding the listing
const LISTING_CONCURRENCY: usize = 16;

/// A validated-by-the-caller upload
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Original client file name
    pub display_name: String,
    /// Content type declared by the client
    pub declared_content_type: String,
    pub content: Bytes,
}

/// Result of listing all files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    /// Records, newest first
    pub files: Vec<FileRecord>,
    /// Whether the listing was served from cache
    pub cached: bool,
}

/// Order records newest first, ties broken by ascending ID
pub fn sort_listing(records: &mut [FileRecord]) {
    records.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Coordinates storage and metadata cache for every file operation
pub struct FileService {
    store: Arc<dyn ByteStore>,
    cache: MetadataStore,
    max_upload_bytes: u64,
}

impl FileService {
    /// Create a service over an existing store and cache
    pub fn new(store: Arc<dyn ByteStore>, cache: MetadataStore) -> Self {
        Self {
            store,
            cache,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    /// Override the upload size limit
    pub fn with_max_upload_bytes(mut self, max_upload_bytes: u64) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    /// Store a new file and publish its metadata
    ///
    /// The durable write completes before any cache write, and the listing
    /// is invalidated only after the record has been cached.
    pub async fn upload(&self, request: UploadRequest) -> Result<FileRecord> {
        validate_upload(
            &request.declared_content_type,
            request.content.len() as u64,
            self.max_upload_bytes,
        )?;

        let handle = StorageHandle::new(FileId::generate(), request.display_name)?;
        let stat = self.store.store(&handle, request.content).await.map_err(|e| {
            error!(id = %handle.id(), error = %e, "Failed to store upload");
            FileStoreError::from(e)
        })?;

        let record = FileRecord::new(&handle, stat);
        self.cache.put_record(&record, self.cache.record_ttl()).await;
        self.cache.invalidate_listing().await;

        info!(
            id = %record.id,
            name = %record.display_name,
            size = record.size_bytes,
            "Stored upload"
        );
        Ok(record)
    }

    /// Look up a file's record
    ///
    /// A cached record is only trusted while its object still exists; stale
    /// entries are dropped and the record is re-resolved from storage.
    pub async fn fetch_by_id(&self, id: &FileId) -> Result<FileRecord> {
        if let Some(record) = self.cache.get_record(id).await {
            match record.handle() {
                Ok(handle) if self.store.exists(&handle).await? => return Ok(record),
                Ok(_) => debug!(id = %id, "Cached record points at a missing object"),
                Err(e) => warn!(id = %id, error = %e, "Cached record is malformed"),
            }
            self.cache.invalidate_record(id).await;
        }

        let handle = self.find_handle(id).await?;
        let record = derive_record(self.store.as_ref(), &handle).await?;
        self.cache.put_record(&record, self.cache.record_ttl()).await;

        debug!(id = %id, "Resolved record from storage");
        Ok(record)
    }

    /// Look up a file and open its content for download
    ///
    /// All metadata work finishes before the stream is returned; streaming
    /// never touches the cache.
    pub async fn open_download(&self, id: &FileId) -> Result<(FileRecord, ByteStream)> {
        let record = self.fetch_by_id(id).await?;
        let handle = record.handle()?;

        match self.store.open_read(&handle).await {
            Ok(stream) => Ok((record, stream)),
            Err(e) if e.is_not_found() => {
                // Removed between lookup and open
                self.cache.invalidate_record(id).await;
                Err(FileStoreError::NotFound(id.to_string()))
            }
            Err(e) => {
                error!(id = %id, error = %e, "Failed to open file for download");
                Err(e.into())
            }
        }
    }

    /// List all files, newest first
    ///
    /// On a cache miss the listing is rebuilt from storage in full. Entries
    /// that fail derivation are skipped rather than failing the listing.
    pub async fn list_all(&self) -> Result<Listing> {
        if let Some(files) = self.cache.get_listing().await {
            return Ok(Listing { files, cached: true });
        }

        let handles = self.store.list().await.map_err(|e| {
            error!(error = %e, "Failed to enumerate storage");
            FileStoreError::from(e)
        })?;

        let store = self.store.as_ref();
        let mut files: Vec<FileRecord> = stream::iter(handles)
            .map(|handle| async move {
                let result = derive_record(store, &handle).await;
                (handle, result)
            })
            .buffer_unordered(LISTING_CONCURRENCY)
            .filter_map(|(handle, result)| async move {
                match result {
                    Ok(record) => Some(record),
                    Err(e) => {
                        warn!(id = %handle.id(), error = %e, "Skipping file in listing");
                        None
                    }
                }
            })
            .collect()
            .await;
        sort_listing(&mut files);

        self.cache.put_listing(&files, self.cache.listing_ttl()).await;
        debug!(count = files.len(), "Rebuilt file listing from storage");
        Ok(Listing {
            files,
            cached: false,
        })
    }

    /// Delete a file and every cache entry derived from it
    ///
    /// Cache entries are only touched once the physical object is gone.
    pub async fn delete(&self, id: &FileId) -> Result<FileRecord> {
        let record = self.fetch_by_id(id).await?;
        let handle = record.handle()?;

        match self.store.remove(&handle).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                // Lost a race with another delete; its entries may still be cached
                self.cache.invalidate_record(id).await;
                self.cache.invalidate_listing().await;
                return Err(FileStoreError::NotFound(id.to_string()));
            }
            Err(e) => {
                error!(id = %id, error = %e, "Failed to delete file");
                return Err(e.into());
            }
        }

        self.cache.invalidate_record(id).await;
        self.cache.invalidate_listing().await;

        info!(id = %id, name = %record.display_name, "Deleted file");
        Ok(record)
    }

    /// Whether the cache backend is reachable
    pub async fn health(&self) -> bool {
        self.cache.is_reachable().await
    }

    /// Release-on-shutdown hook
    pub fn shutdown(&self) {
        self.cache.log_metrics();
        info!("File service shut down");
    }

    /// Scan storage for the handle carrying `id`
    async fn find_handle(&self, id: &FileId) -> Result<StorageHandle> {
        self.store
            .list()
            .await?
            .into_iter()
            .find(|handle| handle.id() == id)
            .ok_or_else(|| FileStoreError::NotFound(id.to_string()))
    }
}
