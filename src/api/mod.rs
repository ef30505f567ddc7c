//! HTTP API for upload, download and listing

pub mod routes;
pub mod server;

pub use server::HttpServer;
