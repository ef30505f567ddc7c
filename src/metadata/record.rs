//! File records and identifiers

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::content_type::content_type_for;
use crate::storage::{FileStat, InvalidName, StorageHandle};

/// Length of a rendered file ID (128 bits as lowercase hex)
const FILE_ID_LEN: usize = 32;

/// Opaque, randomly generated identifier of an uploaded file
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(String);

impl FileId {
    /// Generate a fresh identifier from a random UUID v4
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Parse an identifier received from a client or decoded from storage
    ///
    /// Returns None unless the input has the exact generated shape, so a
    /// parsed ID never contains the storage separator or path characters.
    pub fn parse(value: &str) -> Option<Self> {
        let well_formed = value.len() == FILE_ID_LEN
            && value
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        well_formed.then(|| Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Descriptive record of one stored file
///
/// Every field is fixed at upload time; content is never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// Unique file identifier
    pub id: FileId,
    /// Original client-supplied file name
    pub display_name: String,
    /// Content length in bytes
    pub size_bytes: u64,
    /// Physical creation time reported by storage
    pub created_at: DateTime<Utc>,
    /// MIME type derived from the display name's extension
    pub content_type: String,
}

impl FileRecord {
    /// Build a record from a storage handle and its stat result
    pub fn new(handle: &StorageHandle, stat: FileStat) -> Self {
        Self {
            id: handle.id().clone(),
            display_name: handle.display_name().to_string(),
            size_bytes: stat.size_bytes,
            created_at: stat.created_at,
            content_type: content_type_for(handle.display_name()).to_string(),
        }
    }

    /// Storage handle locating this record's content
    ///
    /// Fails only when the record did not come from a validated handle,
    /// e.g. a corrupted cache entry.
    pub fn handle(&self) -> Result<StorageHandle, InvalidName> {
        StorageHandle::new(self.id.clone(), self.display_name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_generated_ids_parse_and_differ() {
        let a = FileId::generate();
        let b = FileId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), FILE_ID_LEN);
        assert_eq!(FileId::parse(a.as_str()), Some(a));
    }

    #[test]
    fn test_parse_rejects_malformed_ids() {
        assert!(FileId::parse("").is_none());
        assert!(FileId::parse("not-an-id").is_none());
        // Uppercase hex and hyphenated UUIDs are not the generated form
        assert!(FileId::parse("0123456789ABCDEF0123456789ABCDEF").is_none());
        assert!(FileId::parse("01234567-89ab-cdef-0123-456789abcdef").is_none());
        assert!(FileId::parse("../../../../etc/passwd/aaaaaaaaaaa").is_none());
    }

    #[test]
    fn test_record_from_handle_and_stat() {
        let id = FileId::generate();
        let handle = StorageHandle::new(id.clone(), "Report.PDF".to_string()).unwrap();
        let created_at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let record = FileRecord::new(
            &handle,
            FileStat {
                size_bytes: 10,
                created_at,
            },
        );

        assert_eq!(record.id, id);
        assert_eq!(record.display_name, "Report.PDF");
        assert_eq!(record.size_bytes, 10);
        assert_eq!(record.created_at, created_at);
        assert_eq!(record.content_type, "application/pdf");
        assert_eq!(record.handle().unwrap(), handle);
    }

    #[test]
    fn test_record_json_uses_camel_case() {
        let handle = StorageHandle::new(FileId::generate(), "a.png".to_string()).unwrap();
        let record = FileRecord::new(
            &handle,
            FileStat {
                size_bytes: 3,
                created_at: Utc::now(),
            },
        );
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"displayName\":\"a.png\""));
        assert!(json.contains("\"sizeBytes\":3"));
        assert!(json.contains("\"contentType\":\"image/png\""));

        let decoded: FileRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_handle_rejects_corrupted_display_name() {
        let record = FileRecord {
            id: FileId::generate(),
            display_name: "../escape.pdf".to_string(),
            size_bytes: 1,
            created_at: Utc::now(),
            content_type: "application/pdf".to_string(),
        };
        assert!(record.handle().is_err());
    }
}
