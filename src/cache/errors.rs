//! Cache error types

use std::time::Duration;

/// Failures of the key-value cache backend
///
/// These are always absorbed by `MetadataStore` and never reach clients.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Cache entry codec error: {0}")]
    Codec(#[from] serde_json::Error),
}
