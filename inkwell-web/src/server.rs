//! Inkwell Web Server
//!
//! Main web server implementation using Axum.

use crate::{create_app, AppState, WebError, WebResult};
use axum::serve;
use inkwell_core::InkwellConfig;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Main Inkwell web server
pub struct InkwellServer {
    state: AppState,
}

impl InkwellServer {
    /// Connect storage and build the server
    pub async fn new(config: InkwellConfig) -> WebResult<Self> {
        let state = AppState::from_config(config).await?;
        Ok(Self { state })
    }

    /// Serve until ctrl-c
    pub async fn start(self) -> WebResult<()> {
        let address = self.state.config.server.address();

        info!(address = %address, "Starting Inkwell web server");
        if !self.state.config.server.is_loopback() {
            warn!(
                header = %self.state.config.auth.identity_header,
                "Listening on a non-loopback address; the identity header must be set by a trusted proxy"
            );
        }

        let app = create_app(self.state.clone());
        let listener = TcpListener::bind(&address)
            .await
            .map_err(WebError::Server)?;

        info!("Server listening on http://{}", address);

        if let Err(e) = serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
        {
            error!(error = %e, "Server error");
            return Err(WebError::Server(e));
        }

        info!("Server shut down");
        Ok(())
    }

    pub fn config(&self) -> &InkwellConfig {
        &self.state.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for ctrl-c");
    }
}

/// Builder for InkwellServer
pub struct InkwellServerBuilder {
    config: InkwellConfig,
}

impl InkwellServerBuilder {
    pub fn new() -> Self {
        Self {
            config: InkwellConfig::default(),
        }
    }

    /// Start from an already loaded configuration
    pub fn with_config(config: InkwellConfig) -> Self {
        Self { config }
    }

    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.config.server.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn database_url<S: Into<String>>(mut self, database_url: S) -> Self {
        self.config.database.url = database_url.into();
        self
    }

    /// Validate the configuration and build the server
    pub async fn build(self) -> WebResult<InkwellServer> {
        self.config.validate()?;
        InkwellServer::new(self.config).await
    }
}

impl Default for InkwellServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_server_creation() {
        let server = InkwellServerBuilder::new()
            .database_url("sqlite::memory:")
            .build()
            .await;
        assert!(server.is_ok());
    }

    #[test]
    fn test_server_builder() {
        let builder = InkwellServerBuilder::new()
            .host("localhost")
            .port(3000)
            .database_url("sqlite://inkwell-test.db");

        assert_eq!(builder.config.server.host, "localhost");
        assert_eq!(builder.config.server.port, 3000);
        assert_eq!(builder.config.database.url, "sqlite://inkwell-test.db");
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let result = InkwellServerBuilder::new()
            .database_url("postgres://localhost/inkwell")
            .build()
            .await;
        assert!(matches!(result, Err(WebError::Core(_))));
    }
}
