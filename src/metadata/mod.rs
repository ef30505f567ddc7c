//! File metadata model and derivation
//!
//! Defines the `FileRecord` unit of metadata and how it is computed from
//! the physical state of durable storage.

pub mod content_type;
pub mod derive;
pub mod record;

pub use derive::derive_record;
pub use record::{FileId, FileRecord};
