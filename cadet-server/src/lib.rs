//! cadet-server - HTTP server for the cadet-learn daemon
//!
//! This crate owns the LearnerService and exposes its start, annotate and
//! stop operations over a JSON API. The broker is the only client.

mod error;
pub mod http;
mod state;

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;

pub use error::{ErrorResponse, ServerError};
pub use http::create_router;
pub use state::AppState;

/// The main cadet server
pub struct CadetServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl CadetServer {
    pub fn new(config: ServerConfig, state: Arc<AppState>) -> Self {
        Self { config, state }
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the shared application state
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Run the server, binding to the configured address
    ///
    /// Serves until ctrl-c, then stops every live session.
    pub async fn run(self) -> Result<(), ServerError> {
        let addr = self.config.addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.clone(),
                source: e,
            })?;

        tracing::info!("cadet server listening on {}", addr);
        self.run_with_listener(listener).await
    }

    /// Run the server on an already bound listener until ctrl-c
    pub async fn run_with_listener(self, listener: TcpListener) -> Result<(), ServerError> {
        self.serve(listener, shutdown_signal()).await
    }

    /// Run the server until `shutdown` resolves, then stop every live session
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = create_router(Arc::clone(&self.state));
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;

        tracing::info!("HTTP server stopped, shutting down sessions");
        self.state.learner.shutdown_all().await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Received ctrl-c");
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9095,
        }
    }
}

impl ServerConfig {
    /// Create a new ServerConfig with the specified host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Returns the socket address string (e.g., "127.0.0.1:9095")
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
