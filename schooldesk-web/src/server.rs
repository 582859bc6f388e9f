//! SchoolDesk Web Server
//!
//! Binds the router and runs the revalidation sweep next to it.

use crate::{create_app, AppState, WebConfig, WebError, WebResult};
use axum::serve;
use schooldesk_core::SchoolDeskConfig;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Main SchoolDesk web server
pub struct SchoolDeskServer {
    config: WebConfig,
    state: AppState,
}

impl SchoolDeskServer {
    /// Create a server from the full configuration
    pub fn new(config: &SchoolDeskConfig) -> WebResult<Self> {
        let state = AppState::new(config)?;

        Ok(Self {
            config: state.config.clone(),
            state,
        })
    }

    /// Start the web server
    pub async fn start(self) -> WebResult<()> {
        let address = self.config.address();

        info!("Starting SchoolDesk web server");
        info!("Server address: http://{}", address);
        info!("Development mode: {}", self.config.dev_mode);

        let app = create_app(self.state.clone());

        let listener = TcpListener::bind(&address)
            .await
            .map_err(WebError::Server)?;

        info!("Server listening on http://{}", address);

        // Revalidate every browser context on a fixed interval
        let sweep_state = self.state.clone();
        let period = self.state.policy.revalidation_interval();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                sweep_state.sweep_expired().await;
            }
        });

        if let Err(e) = serve(listener, app).await {
            error!("Server error: {}", e);
            return Err(WebError::Server(e));
        }

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

/// Builder for SchoolDeskServer
pub struct SchoolDeskServerBuilder {
    config: SchoolDeskConfig,
}

impl SchoolDeskServerBuilder {
    pub fn new() -> Self {
        Self {
            config: SchoolDeskConfig::default(),
        }
    }

    /// Start from a loaded configuration
    pub fn config(mut self, config: SchoolDeskConfig) -> Self {
        self.config = config;
        self
    }

    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.config.server.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn dev_mode(mut self, dev_mode: bool) -> Self {
        self.config.server.dev_mode = dev_mode;
        self
    }

    /// Load the demo school and accounts
    pub fn seed_demo_data(mut self, seed: bool) -> Self {
        self.config.seed_demo_data = seed;
        self
    }

    pub fn build(self) -> WebResult<SchoolDeskServer> {
        SchoolDeskServer::new(&self.config)
    }
}

impl Default for SchoolDeskServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_builder() {
        let server = SchoolDeskServerBuilder::new()
            .host("localhost")
            .port(3000)
            .dev_mode(true)
            .seed_demo_data(false)
            .build()
            .unwrap();

        assert_eq!(server.config().host, "localhost");
        assert_eq!(server.config().port, 3000);
        assert!(server.config().dev_mode);
        assert_eq!(server.state().users.len(), 1);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = SchoolDeskConfig::default();
        config.session.login_path = "login".to_string();
        assert!(SchoolDeskServerBuilder::new().config(config).build().is_err());
    }
}
