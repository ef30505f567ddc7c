//! File service
//!
//! Coordinates durable storage and the metadata cache so uploads,
//! downloads and listings observe a coherent view.

pub mod coordinator;
pub mod validation;

pub use coordinator::{FileService, UploadRequest};
pub use validation::DEFAULT_MAX_UPLOAD_BYTES;
