//! Storage error types
//!
//! Distinguishes "the object is gone" from real I/O failures so callers can
//! turn the former into a client-facing not-found.

use std::io;

use crate::metadata::FileId;

/// Durable storage error types
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Stored object not found for file {id}")]
    NotFound { id: FileId },

    #[error("Storage I/O failed during {operation}: {source}")]
    Io {
        operation: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("Storage task failed: {0}")]
    Task(String),
}

impl StorageError {
    /// Map an I/O error on a specific object
    ///
    /// `ErrorKind::NotFound` becomes `StorageError::NotFound`, everything
    /// else is an I/O failure.
    pub fn for_object(operation: &'static str, id: &FileId, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            StorageError::NotFound { id: id.clone() }
        } else {
            StorageError::Io { operation, source }
        }
    }

    /// Map an I/O error that is not tied to a single object
    pub fn io(operation: &'static str, source: io::Error) -> Self {
        StorageError::Io { operation, source }
    }

    /// Whether the referenced object does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_kind_maps_to_not_found() {
        let id = FileId::generate();
        let err = StorageError::for_object(
            "stat",
            &id,
            io::Error::new(io::ErrorKind::NotFound, "missing"),
        );
        assert!(err.is_not_found());
    }

    #[test]
    fn test_other_kinds_map_to_io() {
        let id = FileId::generate();
        let err = StorageError::for_object(
            "write",
            &id,
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("write"));
    }
}
