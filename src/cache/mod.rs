//! Metadata caching layer
//!
//! A key-value backend with per-entry TTLs, wrapped by a typed store for
//! file records and the aggregate listing. The cache is a derived view:
//! every failure in here degrades to a miss, never to an error.

pub mod backend;
pub mod errors;
pub mod metadata;

pub use backend::MokaBackend;
pub use metadata::MetadataStore;
