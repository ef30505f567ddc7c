//! Upload admission checks

use crate::error::{FileStoreError, Result};

/// Default upload size limit: 100 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;

/// Content types accepted for upload
const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "application/pdf",
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "video/mp4",
    "video/mpeg",
    "video/quicktime",
];

/// Strip parameters and normalise case, e.g. `Image/PNG; q=1` -> `image/png`
pub fn normalize_content_type(declared: &str) -> String {
    declared
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Reject uploads with a disallowed content type or oversized content
pub fn validate_upload(declared_content_type: &str, size: u64, limit: u64) -> Result<()> {
    let content_type = normalize_content_type(declared_content_type);
    if !ALLOWED_CONTENT_TYPES.contains(&content_type.as_str()) {
        return Err(FileStoreError::InvalidType(content_type));
    }
    if size > limit {
        return Err(FileStoreError::TooLarge { size, limit });
    }
    Ok(())
}
