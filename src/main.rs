//! Filestore Daemon - file storage over HTTP with cached metadata
//!
//! File content lives on local disk; file metadata and the aggregate
//! listing are cached in process and rebuilt from disk on a miss.

mod api;
mod cache;
mod config;
mod error;
mod metadata;
mod service;
mod storage;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use api::HttpServer;
use cache::{MetadataStore, MokaBackend};
use config::Config;
use service::FileService;
use storage::DiskStore;

/// Filestore Daemon - upload, download and list files over HTTP
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Option<Command>,
}

/// CLI command
#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Print the stored files, newest first
    List,
}

fn init_logging(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = if config.log_json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}

/// Acquire the process-lifetime store and cache and build the service
fn build_service(config: &Config) -> Result<FileService> {
    let root = config.storage_root();
    let store = DiskStore::open(root.clone())
        .with_context(|| format!("Failed to open storage root {}", root.display()))?;

    let backend = Arc::new(MokaBackend::new(config.cache_capacity));
    let cache = MetadataStore::new(backend)
        .with_ttls(config.record_ttl(), config.listing_ttl())
        .with_op_timeout(config.cache_timeout());

    Ok(FileService::new(Arc::new(store), cache).with_max_upload_bytes(config.max_upload_bytes))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.config)?;

    let service = Arc::new(build_service(&cli.config)?);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            info!(
                listen = %cli.config.listen,
                max_upload_bytes = cli.config.max_upload_bytes,
                "Starting filestore daemon"
            );

            let mut server = HttpServer::new(Arc::clone(&service), cli.config.listen);
            server.start().await?;

            server
                .run(async {
                    match tokio::signal::ctrl_c().await {
                        Ok(()) => info!("Received shutdown signal"),
                        Err(e) => error!(error = %e, "Failed to listen for shutdown signal, stopping"),
                    }
                })
                .await?;

            service.shutdown();
            info!("Shutdown complete.");
        }
        Command::List => {
            let listing = service
                .list_all()
                .await
                .context("Failed to list stored files")?;
            if listing.files.is_empty() {
                println!("No files stored.");
            } else {
                println!("Stored files:");
                for record in listing.files {
                    println!(
                        "  {}  {}  {} bytes  {}  {}",
                        record.id,
                        record.created_at.to_rfc3339(),
                        record.size_bytes,
                        record.content_type,
                        record.display_name
                    );
                }
            }
        }
    }

    Ok(())
}
