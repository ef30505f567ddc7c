//! Metadata derivation from durable storage

use tracing::trace;

use super::record::FileRecord;
use crate::storage::{ByteStore, StorageError, StorageHandle};

/// Compute a file's record from the current state of storage
///
/// Fails with `StorageError::NotFound` when the handle vanished before it
/// could be stat'ed. Bulk callers skip such entries instead of aborting.
pub async fn derive_record(
    store: &dyn ByteStore,
    handle: &StorageHandle,
) -> Result<FileRecord, StorageError> {
    let stat = store.stat(handle).await?;
    trace!(id = %handle.id(), size = stat.size_bytes, "Derived file record from storage");
    Ok(FileRecord::new(handle, stat))
}
