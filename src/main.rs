//! Edge augmentation proxy
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────┐
//!                 │                  EDGE AUGMENT                     │
//!   Client        │  ┌─────────┐    ┌──────────┐   rules  ┌────────┐  │   Configuration
//!   ──────────────┼─▶│  http   │───▶│ pipeline │─────────▶│ rules  │──┼──▶ service
//!                 │  │ server  │    │          │          └────────┘  │
//!                 │  └─────────┘    │          │  origin  ┌────────┐  │
//!                 │                 │          │─────────▶│ origin │──┼──▶ Origin
//!                 │                 └────┬─────┘          └────────┘  │   server
//!                 │                      ▼                            │
//!   ◀─────────────┼──────────────── rewrite (streaming HTML)          │
//!                 │                                                   │
//!                 │  config · observability · lifecycle               │
//!                 └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use edge_augment::config::{read_config, validate_config, AugmentConfig};
use edge_augment::lifecycle::{wait_for_signal, Shutdown};
use edge_augment::observability::{logging, metrics};
use edge_augment::HttpServer;

#[derive(Parser)]
#[command(name = "edge-augment")]
#[command(about = "Reverse proxy that rewrites origin HTML with per-page rules", long_about = None)]
struct Args {
    /// TOML configuration file.
    #[arg(short, long, env = "EDGE_AUGMENT_CONFIG")]
    config: Option<PathBuf>,

    /// Tenant identifier at the configuration service.
    #[arg(short, long, env = "EDGE_AUGMENT_TENANT")]
    tenant: Option<String>,

    /// Origin server address (host:port).
    #[arg(short, long)]
    origin: Option<String>,

    /// Listen address.
    #[arg(short, long)]
    bind: Option<String>,
}

impl Args {
    fn apply(self, config: &mut AugmentConfig) {
        if let Some(tenant) = self.tenant {
            config.rules.tenant_id = tenant;
        }
        if let Some(origin) = self.origin {
            config.origin.address = origin;
        }
        if let Some(bind) = self.bind {
            config.listener.bind_address = bind;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = Args::parse();

    let mut config = match args.config.take() {
        Some(path) => read_config(&path)?,
        None => AugmentConfig::default(),
    };
    args.apply(&mut config);

    logging::init(&config.observability);
    tracing::info!("edge-augment v{} starting", env!("CARGO_PKG_VERSION"));

    if let Err(errors) = validate_config(&config) {
        for error in &errors {
            tracing::error!(error = %error, "Invalid configuration");
        }
        return Err(format!("configuration has {} error(s)", errors.len()).into());
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        origin = %config.origin.address,
        rules_base_url = %config.rules.base_url,
        tenant = %config.rules.tenant_id,
        transform_enabled = config.transform.enabled,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
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

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Arc::new(Shutdown::new());
    let server_shutdown = shutdown.subscribe();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move { wait_for_signal(&shutdown).await }
    });

    let server = HttpServer::new(config)?;
    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
