use std::sync::Arc;

use tokio::signal;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use pgtopo::config::{self, Config};
use pgtopo::dsn::Dsn;
use pgtopo::metrics;
use pgtopo::probe::PgConnector;
use pgtopo::topology::Topology;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    let config = load_or_default_config();

    let dsns: Vec<Dsn> = config.cluster.hosts.iter().map(|h| Dsn::new(h.clone())).collect();
    if dsns.is_empty() {
        warn!("No hosts configured, published views will stay empty");
    }

    info!(
        hosts = dsns.len(),
        interval_ms = config.discovery.interval_ms,
        check_timeout_ms = config.discovery.check_timeout_ms,
        "Starting topology discovery"
    );

    // The initial discovery cycle completes before start() returns, so the
    // views are populated before anything can read them.
    let topology = Topology::start(&config.discovery, dsns, Arc::new(PgConnector::new())).await;

    // Start metrics server in background
    if config.metrics.enabled {
        let metrics_addr = config.metrics.addr();
        info!(metrics_addr = %metrics_addr, "Metrics server starting");
        tokio::spawn(async move {
            if let Err(e) = metrics::start_metrics_server(&metrics_addr).await {
                error!(error = %e, "Metrics server failed");
            }
        });
    }

    shutdown_signal().await;
    info!("Shutdown signal received, stopping discovery");
    topology.stop().await;

    info!("pgtopo shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

fn load_or_default_config() -> Config {
    // Try to load from config file
    let config_paths = ["config/pgtopo.toml", "pgtopo.toml"];

    for path in config_paths {
        match config::load_config(path) {
            Ok(config) => {
                info!(path = path, "Loaded configuration");
                return config;
            }
            Err(e) => {
                warn!(path = path, error = %e, "Failed to load config");
            }
        }
    }

    info!("Using default configuration");
    Config::default()
}
