//! HTTP Server - serves the REST API over TCP
//!
//! Binds the listener up front so address errors surface at start-up, then
//! serves until the shutdown future resolves.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;

use super::routes::router;
use crate::service::FileService;

/// HTTP server for the file service
pub struct HttpServer {
    /// Service handling every request
    service: Arc<FileService>,
    /// Address to bind
    listen: SocketAddr,
    /// Bound listener, present after `start`
    listener: Option<TcpListener>,
}

impl HttpServer {
    /// Create a new HTTP server
    pub fn new(service: Arc<FileService>, listen: SocketAddr) -> Self {
        Self {
            service,
            listen,
            listener: None,
        }
    }

    /// Bind the listening socket
    pub async fn start(&mut self) -> Result<()> {
        let listener = TcpListener::bind(self.listen)
            .await
            .with_context(|| format!("Failed to bind HTTP listener on {}", self.listen))?;

        info!(addr = %listener.local_addr()?, "HTTP server started");
        self.listener = Some(listener);
        Ok(())
    }

    /// Serve requests until `shutdown` completes
    ///
    /// In-flight requests are allowed to finish.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = self.listener.context("Server not started")?;
        let app = router(self.service);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .context("HTTP server error")?;

        info!("HTTP server stopped");
        Ok(())
    }
}
