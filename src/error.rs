//! Client-facing error taxonomy
//!
//! Cache failures have no variant here: they are absorbed inside the cache
//! layer and never surface to callers.

use crate::storage::{InvalidName, StorageError};

/// Errors returned by file service operations
#[derive(Debug, thiserror::Error)]
pub enum FileStoreError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Content type '{0}' is not permitted")]
    InvalidType(String),

    #[error("File of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },

    #[error(transparent)]
    InvalidName(#[from] InvalidName),

    #[error("Storage failure: {0}")]
    Storage(StorageError),
}

impl FileStoreError {
    /// Stable machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            FileStoreError::NotFound(_) => "not_found",
            FileStoreError::InvalidType(_) => "invalid_type",
            FileStoreError::TooLarge { .. } => "too_large",
            FileStoreError::InvalidName(_) => "invalid_name",
            FileStoreError::Storage(_) => "storage_failure",
        }
    }
}

impl From<StorageError> for FileStoreError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound { id } => FileStoreError::NotFound(id.to_string()),
            other => FileStoreError::Storage(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, FileStoreError>;
