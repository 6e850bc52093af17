//! Cluster frontend (v1)
//!
//! Accepts client connections and routes each request to this node or to a
//! cluster member.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌────────────────────────────────────────────────────────┐
//!                      │                   CLUSTER FRONTEND                      │
//!                      │                                                         │
//!   ws / tcp / tls     │  ┌──────────┐   ┌──────────┐   ┌──────────────────┐    │
//!   ───────────────────┼─▶│   net    │──▶│ protocol │──▶│ frontend context │    │
//!                      │  │acceptors │   │ envelope │   │    dispatch      │    │
//!                      │  └──────────┘   └──────────┘   └────────┬─────────┘    │
//!                      │                                          │              │
//!                      │                       local route ◀──────┴──▶ remote    │
//!                      │                            │                    │       │
//!                      │                            ▼                    ▼       │
//!                      │                    ┌──────────────┐    ┌─────────────┐  │
//!                      │                    │local handlers│    │  strategy   │  │
//!                      │                    │ (connector)  │    │  registry   │  │
//!                      │                    └──────────────┘    └──────┬──────┘  │
//!                      │                                               ▼         │
//!                      │                                        ┌─────────────┐  │     Cluster
//!                      │                                        │  forwarder  │──┼───▶ member
//!                      │                                        └─────────────┘  │
//!                      └────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use cluster_frontend::config::{self, FrontendConfig};
use cluster_frontend::lifecycle::{signals, Shutdown};
use cluster_frontend::observability::{logging, metrics};
use cluster_frontend::FrontendBuilder;

/// Command-line flags. Flags override values from the config file.
#[derive(Debug, Parser)]
#[command(name = "cluster-frontend", version, about = "Client-facing frontend for a clustered server")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Base listen port.
    #[arg(long)]
    port: Option<u16>,

    /// Server type of this node.
    #[arg(long = "type", value_name = "SERVER_TYPE")]
    server_type: Option<String>,

    /// Run as a backend node (no client acceptors).
    #[arg(long)]
    backend: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("cluster-frontend: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init(&config.observability) {
        eprintln!("cluster-frontend: failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        server_type = %config.server_type,
        frontend = config.frontend,
        listen_port = config.listen_port,
        "cluster-frontend starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let frontend = match FrontendBuilder::from_config(&config).start().await {
        Ok(frontend) => frontend,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = Shutdown::new();
    let run = frontend.run(&shutdown);
    tokio::spawn(signals::trigger_on_signal(shutdown));
    run.await;

    tracing::info!("Shutdown complete");
    ExitCode::SUCCESS
}

/// Read the config file (or the built-in one), apply CLI overrides, then validate.
fn load(cli: &Cli) -> Result<FrontendConfig, config::ConfigError> {
    let mut config = match &cli.config {
        Some(path) => config::parse_config(path)?,
        None => config::builtin_config()?,
    };

    if let Some(port) = cli.port {
        config.listen_port = port;
    }
    if let Some(server_type) = &cli.server_type {
        config.server_type = server_type.clone();
    }
    if cli.backend {
        config.frontend = false;
    }

    config::validate_config(&config).map_err(config::ConfigError::Validation)?;
    Ok(config)
}
