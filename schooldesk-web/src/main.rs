//! SchoolDesk Web Server
//!
//! Role dashboards for administrators, teachers, guidance counselors,
//! students and parents.

use anyhow::Context;
use clap::Parser;
use schooldesk_core::SchoolDeskConfig;
use schooldesk_web::init_logging;
use schooldesk_web::server::SchoolDeskServerBuilder;
use std::path::PathBuf;
use tracing::{info, warn};

/// SchoolDesk Web Server - role dashboards behind a session guard
#[derive(Parser)]
#[command(name = "schooldesk-web")]
#[command(about = "Role dashboards for a school")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server host to bind to
    #[arg(long)]
    host: Option<String>,

    /// Server port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable development mode
    #[arg(long)]
    dev: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,

    /// Start without the demo school and accounts
    #[arg(long)]
    no_demo: bool,
}

impl Args {
    /// Apply command line overrides on top of the loaded configuration
    fn apply(&self, config: &mut SchoolDeskConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if self.dev {
            config.server.dev_mode = true;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if self.no_demo {
            config.seed_demo_data = false;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load environment variables before the config reads SCHOOLDESK__*
    dotenvy::dotenv().ok();

    let mut config = SchoolDeskConfig::load(args.config.as_deref())
        .context("Failed to load configuration")?;
    args.apply(&mut config);

    init_logging(&config.logging).context("Failed to initialize logging")?;

    if config.seed_demo_data {
        warn!("Demo accounts are enabled; do not expose this server publicly");
    }

    let server = SchoolDeskServerBuilder::new()
        .config(config)
        .build()
        .context("Failed to build server")?;

    info!("Server built successfully");
    server.start().await.context("Server failed")?;

    info!("Server shut down gracefully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from(["schooldesk-web"]);
        assert!(args.config.is_none());
        assert!(args.port.is_none());
        assert!(!args.dev);

        let args = Args::parse_from([
            "schooldesk-web",
            "--host",
            "0.0.0.0",
            "--port",
            "3000",
            "--dev",
            "--no-demo",
        ]);
        let mut config = SchoolDeskConfig::default();
        args.apply(&mut config);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert!(config.server.dev_mode);
        assert!(!config.seed_demo_data);
    }
}
