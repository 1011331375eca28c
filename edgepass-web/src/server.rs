//! Edgepass Web Server
//!
//! Binds the router to a TCP listener and serves until Ctrl-C.

use crate::{create_app, AppState, WebConfig, WebError, WebResult};
use axum::serve;
use edgepass_applications::EdgepassApplication;
use edgepass_core::EdgepassConfig;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Main edgepass web server
pub struct EdgepassServer {
    config: WebConfig,
    state: AppState,
}

impl EdgepassServer {
    pub fn new(config: WebConfig, application: EdgepassApplication) -> Self {
        let state = AppState::new(application, config.clone());
        Self { config, state }
    }

    pub fn builder() -> EdgepassServerBuilder {
        EdgepassServerBuilder::new()
    }

    /// Serve until the process receives Ctrl-C
    pub async fn start(self) -> WebResult<()> {
        let listener = TcpListener::bind(self.config.address())
            .await
            .map_err(WebError::Server)?;

        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> WebResult<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let address = listener.local_addr().map_err(WebError::Server)?;
        let app = create_app(self.state.clone());

        info!(%address, "Edgepass server listening");

        if let Err(e) = serve(listener, app).with_graceful_shutdown(shutdown).await {
            error!(error = %e, "Server error");
            return Err(WebError::Server(e));
        }

        info!("Edgepass server shut down");
        Ok(())
    }

    /// Get server configuration
    pub fn config(&self) -> &WebConfig {
        &self.config
    }

    /// Get application state
    pub fn state(&self) -> &AppState {
        &self.state
    }
}

/// Builder for EdgepassServer
pub struct EdgepassServerBuilder {
    config: WebConfig,
}

impl EdgepassServerBuilder {
    pub fn new() -> Self {
        Self {
            config: WebConfig::default(),
        }
    }

    pub fn web_config(mut self, config: WebConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the server host
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the server port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Build the application from `config`, loading the edge key once
    pub fn build(self, config: EdgepassConfig) -> WebResult<EdgepassServer> {
        let application = EdgepassApplication::from_config(config)?;
        Ok(EdgepassServer::new(self.config, application))
    }
}

impl Default for EdgepassServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_builder() {
        let builder = EdgepassServerBuilder::new().host("localhost").port(3000);

        assert_eq!(builder.config.host, "localhost");
        assert_eq!(builder.config.port, 3000);
        assert_eq!(builder.config.address(), "localhost:3000");
    }

    #[test]
    fn build_fails_without_the_edge_key() {
        let mut config = EdgepassConfig::default();
        config.edge.private_key_path = "/nonexistent/edgepass.pem".into();

        let result = EdgepassServerBuilder::new().build(config);
        assert!(matches!(result, Err(WebError::Application(_))));
    }
}
