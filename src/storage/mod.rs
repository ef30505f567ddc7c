//! Durable byte storage
//!
//! File content lives on disk; this module is the only place that knows
//! how a `StorageHandle` maps onto a physical file.

pub mod backend;
pub mod disk;
pub mod errors;
pub mod types;

pub use backend::ByteStore;
pub use disk::DiskStore;
pub use errors::StorageError;
pub use types::*;
