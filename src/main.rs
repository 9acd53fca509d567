//! RDM web edge.
//!
//! ```text
//!     Browser
//!        │
//!        ▼
//!  ┌───────────────────────────────────────────────┐
//!  │ request id → trace → body limit → headers     │
//!  │   → CORS guard → CSRF guard                   │
//!  │       ├─ public routes (/api/version, login)  │
//!  │       ├─ /ws guard → WebSocket → EventHub     │
//!  │       └─ auth guard → protected routes        │
//!  └───────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use rdm_web::config::{load_config, validation::validate_config, AppConfig, ConfigError};
use rdm_web::lifecycle::{wait_for_signal, Shutdown};
use rdm_web::observability::{logging, metrics};
use rdm_web::HttpServer;

#[derive(Parser)]
#[command(name = "rdm-web")]
#[command(about = "Web edge for the RDM database browser", long_about = None)]
struct Cli {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,

    /// Run without the login gate.
    #[arg(long)]
    no_auth: bool,

    /// Override `assets.dir`.
    #[arg(long)]
    assets: Option<String>,
}

fn resolve_config(cli: &Cli) -> Result<AppConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };

    if let Some(bind) = &cli.bind {
        config.listener.bind_address = bind.clone();
    }
    if cli.no_auth {
        config.auth.enabled = false;
    }
    if let Some(dir) = &cli.assets {
        config.assets.dir = Some(dir.clone());
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    logging::init(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "rdm-web starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        auth_enabled = config.auth.enabled,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        trigger.trigger();
    });

    HttpServer::new(config).run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
