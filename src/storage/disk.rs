//! Disk-backed byte store
//!
//! Stores each file as a single flat file under the storage root. Writes
//! go through a temp file in the same directory and are renamed into place,
//! so a handle never refers to partially written content.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, info};

use super::backend::ByteStore;
use super::errors::StorageError;
use super::types::{ByteStream, FileStat, StorageHandle};

/// Prefix of in-flight upload temp files
const TEMP_PREFIX: &str = ".upload-";
/// Suffix of in-flight upload temp files
const TEMP_SUFFIX: &str = ".tmp";

/// Byte store rooted at a local directory
#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    /// Open a store, creating the root directory if needed
    ///
    /// Temp files left behind by interrupted uploads are removed.
    pub fn open(root: PathBuf) -> Result<Self, StorageError> {
        fs::create_dir_all(&root).map_err(|e| StorageError::io("create storage root", e))?;

        let store = Self { root };
        store.cleanup();

        info!(root = %store.root.display(), "Disk store initialized");
        Ok(store)
    }

    /// Remove stale temp files from previous runs
    pub fn cleanup(&self) {
        let Ok(read_dir) = fs::read_dir(&self.root) else {
            return;
        };
        for entry in read_dir.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name.starts_with(TEMP_PREFIX) && name.ends_with(TEMP_SUFFIX) {
                debug!(path = %entry.path().display(), "Removing stale temp file");
                let _ = fs::remove_file(entry.path());
            }
        }
    }

    fn path_for(&self, handle: &StorageHandle) -> PathBuf {
        self.root.join(handle.encode())
    }
}

/// Write content atomically at `target`, refusing to replace an existing file
fn write_atomic(root: &Path, target: &Path, content: &[u8]) -> std::io::Result<FileStat> {
    let mut tmp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(TEMP_SUFFIX)
        .tempfile_in(root)?;

    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;

    let file = tmp.persist_noclobber(target).map_err(|e| e.error)?;
    FileStat::from_metadata(&file.metadata()?)
}

#[async_trait]
impl ByteStore for DiskStore {
    async fn store(&self, handle: &StorageHandle, content: Bytes) -> Result<FileStat, StorageError> {
        let root = self.root.clone();
        let target = self.path_for(handle);
        let id = handle.id().clone();

        let stat = tokio::task::spawn_blocking(move || write_atomic(&root, &target, &content))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))?
            .map_err(|e| StorageError::io("write", e))?;

        debug!(id = %id, size = stat.size_bytes, "Stored file content");
        Ok(stat)
    }

    async fn stat(&self, handle: &StorageHandle) -> Result<FileStat, StorageError> {
        let metadata = tokio::fs::metadata(self.path_for(handle))
            .await
            .map_err(|e| StorageError::for_object("stat", handle.id(), e))?;
        if !metadata.is_file() {
            return Err(StorageError::NotFound {
                id: handle.id().clone(),
            });
        }
        FileStat::from_metadata(&metadata).map_err(|e| StorageError::io("stat", e))
    }

    async fn exists(&self, handle: &StorageHandle) -> Result<bool, StorageError> {
        match tokio::fs::metadata(self.path_for(handle)).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::io("exists", e)),
        }
    }

    async fn list(&self) -> Result<Vec<StorageHandle>, StorageError> {
        let mut read_dir = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| StorageError::io("list", e))?;

        let mut handles = Vec::new();
        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| StorageError::io("list", e))?
        {
            let Some(handle) = entry.file_name().to_str().and_then(StorageHandle::decode) else {
                continue;
            };
            // Entries can vanish mid-scan; those are simply not listed
            match entry.file_type().await {
                Ok(file_type) if file_type.is_file() => handles.push(handle),
                _ => {}
            }
        }

        Ok(handles)
    }

    async fn open_read(&self, handle: &StorageHandle) -> Result<ByteStream, StorageError> {
        let file = tokio::fs::File::open(self.path_for(handle))
            .await
            .map_err(|e| StorageError::for_object("open", handle.id(), e))?;
        Ok(Box::new(file))
    }

    async fn remove(&self, handle: &StorageHandle) -> Result<(), StorageError> {
        tokio::fs::remove_file(self.path_for(handle))
            .await
            .map_err(|e| StorageError::for_object("remove", handle.id(), e))?;
        debug!(id = %handle.id(), "Removed file content");
        Ok(())
    }
}
