//! Storage handles and stat results

use std::fmt;
use std::fs::Metadata;
use std::io;

use chrono::{DateTime, Utc};
use tokio::io::AsyncRead;

use crate::metadata::FileId;

/// Separator between the ID and display name in the on-disk file name
const HANDLE_SEPARATOR: char = '_';

/// Longest accepted display name in bytes
///
/// Leaves room for the ID and separator within a 255 byte file name.
pub const MAX_DISPLAY_NAME_BYTES: usize = 200;

/// Readable content of a stored object, positioned at offset 0
pub type ByteStream = Box<dyn AsyncRead + Send + Unpin>;

/// A display name that cannot be used as part of a storage handle
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid file name: {reason}")]
pub struct InvalidName {
    pub reason: &'static str,
}

/// Structured reference to a physical object
///
/// The ID and display name are kept apart; the combined file name is an
/// encoding detail of the disk layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageHandle {
    id: FileId,
    display_name: String,
}

impl StorageHandle {
    /// Create a handle, validating the display name
    pub fn new(id: FileId, display_name: String) -> Result<Self, InvalidName> {
        validate_display_name(&display_name)?;
        Ok(Self { id, display_name })
    }

    pub fn id(&self) -> &FileId {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// On-disk file name for this handle
    pub(crate) fn encode(&self) -> String {
        format!("{}{}{}", self.id, HANDLE_SEPARATOR, self.display_name)
    }

    /// Decode an on-disk file name
    ///
    /// Returns None for names this layout did not produce.
    pub(crate) fn decode(file_name: &str) -> Option<Self> {
        let (id, display_name) = file_name.split_once(HANDLE_SEPARATOR)?;
        let id = FileId::parse(id)?;
        Self::new(id, display_name.to_string()).ok()
    }
}

impl fmt::Display for StorageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

fn validate_display_name(name: &str) -> Result<(), InvalidName> {
    let reason = if name.is_empty() {
        "name is empty"
    } else if name == "." || name == ".." {
        "name is a relative path component"
    } else if name.contains(['/', '\\', '\0']) {
        "name contains a path separator or NUL"
    } else if name.len() > MAX_DISPLAY_NAME_BYTES {
        "name is too long"
    } else {
        return Ok(());
    };
    Err(InvalidName { reason })
}

/// Size and creation time of a stored object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

impl FileStat {
    /// Build from filesystem metadata
    ///
    /// Uses the birth time where the filesystem records one, otherwise the
    /// modification time. Content is immutable, so both are stable.
    pub fn from_metadata(metadata: &Metadata) -> io::Result<Self> {
        let created = metadata.created().or_else(|_| metadata.modified())?;
        Ok(Self {
            size_bytes: metadata.len(),
            created_at: DateTime::<Utc>::from(created),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(name: &str) -> Result<StorageHandle, InvalidName> {
        StorageHandle::new(FileId::generate(), name.to_string())
    }

    #[test]
    fn test_encode_decode_keeps_fields_apart() {
        // Separator inside the display name must survive decoding
        let original = handle("my_holiday_photo.jpg").unwrap();
        let encoded = original.encode();
        assert!(encoded.starts_with(original.id().as_str()));

        let decoded = StorageHandle::decode(&encoded).unwrap();
        assert_eq!(decoded, original);
        assert_eq!(decoded.display_name(), "my_holiday_photo.jpg");
    }

    #[test]
    fn test_decode_skips_foreign_names() {
        assert!(StorageHandle::decode(".upload-abc123.tmp").is_none());
        assert!(StorageHandle::decode("notes.txt").is_none());
        assert!(StorageHandle::decode("deadbeef_a.pdf").is_none());
        let id = FileId::generate();
        assert!(StorageHandle::decode(&format!("{}_", id)).is_none());
    }

    #[test]
    fn test_display_name_validation() {
        assert!(handle("a.pdf").is_ok());
        assert!(handle("résumé 2024.pdf").is_ok());
        assert!(handle("").is_err());
        assert!(handle(".").is_err());
        assert!(handle("..").is_err());
        assert!(handle("dir/a.pdf").is_err());
        assert!(handle("dir\\a.pdf").is_err());
        assert!(handle("a\0.pdf").is_err());
        assert!(handle(&"x".repeat(MAX_DISPLAY_NAME_BYTES + 1)).is_err());
        assert!(handle(&"x".repeat(MAX_DISPLAY_NAME_BYTES)).is_ok());
    }
}
