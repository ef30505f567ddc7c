//! Runtime configuration
//!
//! Every setting can come from a CLI flag or its environment variable.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use crate::cache::backend::DEFAULT_CACHE_CAPACITY;
use crate::cache::metadata::{DEFAULT_OP_TIMEOUT, LISTING_TTL, RECORD_TTL};
use crate::service::DEFAULT_MAX_UPLOAD_BYTES;

/// Service configuration shared by all commands
#[derive(Debug, Clone, Args)]
pub struct Config {
    /// Directory holding stored files [default: <data dir>/filestore]
    #[arg(long, env = "FILESTORE_ROOT", global = true)]
    pub storage_root: Option<PathBuf>,

    /// HTTP bind address
    #[arg(long, env = "FILESTORE_LISTEN", default_value = "0.0.0.0:8080", global = true)]
    pub listen: SocketAddr,

    /// Maximum accepted upload size in bytes
    #[arg(long, env = "FILESTORE_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES, global = true)]
    pub max_upload_bytes: u64,

    /// TTL of cached file records in seconds
    #[arg(long, env = "FILESTORE_RECORD_TTL_SECS", default_value_t = RECORD_TTL.as_secs(), global = true)]
    pub record_ttl_secs: u64,

    /// TTL of the cached listing in seconds
    #[arg(long, env = "FILESTORE_LISTING_TTL_SECS", default_value_t = LISTING_TTL.as_secs(), global = true)]
    pub listing_ttl_secs: u64,

    /// Maximum number of cached entries
    #[arg(long, env = "FILESTORE_CACHE_CAPACITY", default_value_t = DEFAULT_CACHE_CAPACITY, global = true)]
    pub cache_capacity: u64,

    /// Timeout for a single cache operation in milliseconds
    #[arg(long, env = "FILESTORE_CACHE_TIMEOUT_MS", default_value_t = DEFAULT_OP_TIMEOUT.as_millis() as u64, global = true)]
    pub cache_timeout_ms: u64,

    /// Output logs as JSON
    #[arg(long, env = "FILESTORE_LOG_JSON", global = true)]
    pub log_json: bool,
}

impl Config {
    /// Storage root, falling back to the platform data directory
    pub fn storage_root(&self) -> PathBuf {
        self.storage_root.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|dir| dir.join("filestore"))
                .unwrap_or_else(|| PathBuf::from("./data"))
        })
    }

    pub fn record_ttl(&self) -> Duration {
        Duration::from_secs(self.record_ttl_secs)
    }

    pub fn listing_ttl(&self) -> Duration {
        Duration::from_secs(self.listing_ttl_secs)
    }

    pub fn cache_timeout(&self) -> Duration {
        Duration::from_millis(self.cache_timeout_ms)
    }
}
