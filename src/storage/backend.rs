//! Byte storage abstraction

use async_trait::async_trait;
use bytes::Bytes;

use super::errors::StorageError;
use super::types::{ByteStream, FileStat, StorageHandle};

/// Durable store for immutable file content
///
/// Every operation may block on I/O; implementations must not stall the
/// async runtime while doing so.
#[async_trait]
pub trait ByteStore: Send + Sync {
    /// Durably write content under a new handle and return its stat
    async fn store(&self, handle: &StorageHandle, content: Bytes) -> Result<FileStat, StorageError>;

    /// Size and creation time of an object
    async fn stat(&self, handle: &StorageHandle) -> Result<FileStat, StorageError>;

    /// Whether the object is still physically present
    async fn exists(&self, handle: &StorageHandle) -> Result<bool, StorageError>;

    /// All stored handles, in no particular order
    async fn list(&self) -> Result<Vec<StorageHandle>, StorageError>;

    /// Open the object's content for streaming
    async fn open_read(&self, handle: &StorageHandle) -> Result<ByteStream, StorageError>;

    /// Delete the object
    async fn remove(&self, handle: &StorageHandle) -> Result<(), StorageError>;
}
