//! Configuration management

use crate::error::{ErrorContext, SchoolDeskError, SchoolDeskResult};
use crate::logging::LoggingConfig;
use crate::types::RoleTable;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Longest accepted activity coalescing window: one day
pub const MAX_ACTIVITY_DEBOUNCE_SECS: u64 = 24 * 60 * 60;
/// Longest accepted role session: one year
pub const MAX_SESSION_MINUTES: u32 = 366 * 24 * 60;

/// Top-level SchoolDesk configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchoolDeskConfig {
    /// Load the bundled demo school and accounts at startup
    pub seed_demo_data: bool,
    pub server: ServerConfig,
    pub session: SessionSettings,
    pub logging: LoggingConfig,
}

impl Default for SchoolDeskConfig {
    fn default() -> Self {
        Self {
            seed_demo_data: true,
            server: ServerConfig::default(),
            session: SessionSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub dev_mode: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            dev_mode: false,
        }
    }
}

/// Session lifecycle settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Seconds between background revalidation sweeps
    pub revalidation_interval_secs: u64,
    /// Minimum seconds between two activity-triggered extensions
    pub activity_debounce_secs: u64,
    /// Login entry point
    pub login_path: String,
    /// Forced password change page
    pub change_password_path: String,
    /// Where session records are persisted
    pub storage: StorageBackend,
    /// Per-role duration and dashboard table
    pub roles: RoleTable,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            revalidation_interval_secs: 60,
            activity_debounce_secs: 30,
            login_path: "/login".to_string(),
            change_password_path: "/change-password".to_string(),
            storage: StorageBackend::default(),
            roles: RoleTable::default(),
        }
    }
}

/// Session storage backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StorageBackend {
    /// Records live only as long as the browser context
    #[default]
    Memory,
    /// Records are written as JSON under one directory per browser context
    File { dir: Option<PathBuf> },
}

impl StorageBackend {
    /// Directory used by the file backend, defaulting to the platform data dir
    pub fn resolved_dir(&self) -> Option<PathBuf> {
        match self {
            StorageBackend::Memory => None,
            StorageBackend::File { dir: Some(dir) } => Some(dir.clone()),
            StorageBackend::File { dir: None } => Some(
                dirs::data_local_dir()
                    .unwrap_or_else(std::env::temp_dir)
                    .join("schooldesk")
                    .join("sessions"),
            ),
        }
    }
}

impl SchoolDeskConfig {
    /// Load configuration from defaults, an optional TOML file and
    /// `SCHOOLDESK__*` environment variables, in that order of precedence
    pub fn load(path: Option<&Path>) -> SchoolDeskResult<Self> {
        let defaults = config::Config::try_from(&Self::default()).map_err(|e| {
            SchoolDeskError::Config {
                message: format!("Failed to build default config: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("config").with_operation("defaults"),
            }
        })?;

        let mut builder = config::Config::builder().add_source(defaults);
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("SCHOOLDESK")
                .separator("__")
                .try_parsing(true),
        );

        let loaded = builder.build().map_err(|e| SchoolDeskError::Config {
            message: format!("Failed to load config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("load")
                .with_suggestion("Check if the config file exists and is valid TOML"),
        })?;

        let config: SchoolDeskConfig =
            loaded
                .try_deserialize()
                .map_err(|e| SchoolDeskError::Config {
                    message: format!("Failed to parse config: {}", e),
                    source: Some(Box::new(e)),
                    context: ErrorContext::new("config").with_operation("deserialize"),
                })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file only
    pub fn from_file<P: AsRef<Path>>(path: P) -> SchoolDeskResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| SchoolDeskError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("read_file")
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        let config: SchoolDeskConfig =
            toml::from_str(&content).map_err(|e| SchoolDeskError::Config {
                message: format!("Failed to parse config: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("config")
                    .with_operation("parse_toml")
                    .with_suggestion("Check TOML syntax in config file"),
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> SchoolDeskResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| SchoolDeskError::Config {
            message: format!("Failed to serialize config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config").with_operation("serialize_toml"),
        })?;

        std::fs::write(path, content).map_err(|e| SchoolDeskError::Config {
            message: format!("Failed to write config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("write_file")
                .with_suggestion("Check if the directory exists and is writable"),
        })?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SchoolDeskResult<()> {
        let session = &self.session;

        if session.revalidation_interval_secs == 0 {
            return Err(invalid(
                "session.revalidation_interval_secs must be greater than 0",
                "Set session.revalidation_interval_secs to a positive value",
            ));
        }

        if session.activity_debounce_secs > MAX_ACTIVITY_DEBOUNCE_SECS {
            return Err(invalid(
                &format!(
                    "session.activity_debounce_secs must not exceed {}",
                    MAX_ACTIVITY_DEBOUNCE_SECS
                ),
                "Lower session.activity_debounce_secs",
            ));
        }

        for (name, settings) in session
            .roles
            .roles
            .iter()
            .map(|(name, settings)| (name.as_str(), settings))
            .chain(std::iter::once(("fallback", &session.roles.fallback)))
        {
            if settings.session_minutes == 0 {
                return Err(invalid(
                    &format!("Session duration for role '{}' must be positive", name),
                    "Set session_minutes to a positive value",
                ));
            }
            if settings.session_minutes > MAX_SESSION_MINUTES {
                return Err(invalid(
                    &format!("Session duration for role '{}' exceeds one year", name),
                    "Lower session_minutes",
                ));
            }
            if !settings.dashboard_path.starts_with('/') {
                return Err(invalid(
                    &format!("Dashboard path for role '{}' must be absolute", name),
                    "Start dashboard_path with '/'",
                ));
            }
        }

        for path in [&session.login_path, &session.change_password_path] {
            if !path.starts_with('/') {
                return Err(invalid(
                    &format!("Path '{}' must be absolute", path),
                    "Start login_path and change_password_path with '/'",
                ));
            }
        }

        if self.server.port == 0 {
            return Err(invalid(
                "server.port must be greater than 0",
                "Set server.port to a free TCP port",
            ));
        }

        Ok(())
    }
}

fn invalid(message: &str, suggestion: &str) -> SchoolDeskError {
    SchoolDeskError::Config {
        message: message.to_string(),
        source: None,
        context: ErrorContext::new("config")
            .with_operation("validate")
            .with_suggestion(suggestion),
    }
}
