//! SchoolDesk Web Server
//!
//! Server-rendered role dashboards. Every browser is tracked as a browser
//! context identified by a cookie; each context owns one session store and
//! every protected page runs the route guard before rendering.

pub mod auth;
pub mod context;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;
pub mod templates;

// Re-export main types
pub use context::{BrowserContext, ContextRegistry, CONTEXT_COOKIE};
pub use server::SchoolDeskServer;
pub use state::AppState;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::{Html, IntoResponse, Response},
    Router,
};
use schooldesk_core::{LoggingConfig, SchoolDeskConfig, SchoolDeskError};
use schooldesk_records::RecordsError;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

/// Create the main application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(routes::page_routes())
        .merge(routes::session_routes())
        .merge(routes::report_routes())
        .layer(from_fn_with_state(
            state.clone(),
            middleware::browser_context_middleware,
        ))
        // Health checks need no browser context
        .merge(routes::health_routes())
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(64 * 1024))
        .with_state(state)
}

/// Configuration for the web server
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Enable development mode
    pub dev_mode: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self::from(&SchoolDeskConfig::default())
    }
}

impl From<&SchoolDeskConfig> for WebConfig {
    fn from(config: &SchoolDeskConfig) -> Self {
        Self {
            host: config.server.host.clone(),
            port: config.server.port,
            dev_mode: config.server.dev_mode,
        }
    }
}

impl WebConfig {
    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Error types for the web server
#[derive(thiserror::Error, Debug)]
pub enum WebError {
    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    #[error("Records error: {0}")]
    Records(#[from] RecordsError),

    #[error(transparent)]
    Core(#[from] SchoolDeskError),

    #[error("Session storage error: {0}")]
    Storage(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WebError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebError::BadRequest(_) => StatusCode::BAD_REQUEST,
            WebError::NotFound(_) => StatusCode::NOT_FOUND,
            WebError::Records(RecordsError::NotFound { .. }) => StatusCode::NOT_FOUND,
            WebError::Records(RecordsError::InvalidRange { .. }) => StatusCode::BAD_REQUEST,
            WebError::Records(RecordsError::Unavailable { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            WebError::Core(SchoolDeskError::Validation { .. }) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to end users
    fn public_message(&self) -> String {
        match self.status() {
            StatusCode::INTERNAL_SERVER_ERROR => "Something went wrong on our side.".to_string(),
            StatusCode::SERVICE_UNAVAILABLE => "School records are unavailable right now.".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let WebError::Core(e) = &self {
            e.log();
        } else if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected: {}", self);
        }

        let page = templates::ErrorTemplate::new(status.as_u16(), self.public_message());
        match askama::Template::render(&page) {
            Ok(html) => (status, Html(html)).into_response(),
            Err(_) => (status, self.public_message()).into_response(),
        }
    }
}

/// Result type for web operations
pub type WebResult<T> = Result<T, WebError>;

/// Initialize logging for the web server
pub fn init_logging(config: &LoggingConfig) -> WebResult<()> {
    schooldesk_core::init_logging(config)
        .map_err(|e| WebError::Config(format!("Failed to initialize logging: {}", e)))
}
