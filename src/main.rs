//! # LCD Status Agent
//!
//! Publishes host status into a Redis-compatible key-value store for an
//! external LCD display driver to render:
//! - `lcd:0` — `hostname=<short hostname>`
//! - `lcd:1` — primary non-loopback IPv4 address (empty if none)
//! - `lcd:2` — local wall-clock time, `:` / ` ` separator alternating
//!   once per publish period so the display blinks
//!
//! One connection, opened at startup and held for the process lifetime;
//! three `SET`s per period. Any store or host-lookup failure ends the
//! process — supervision belongs to the service manager, not this agent.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::{debug, error, info};

pub mod config;
pub mod error;
mod hostinfo;
mod publisher;
mod status;
mod store;

pub use config::AgentConfig;
pub use error::{PublisherError, PublisherResult};

use crate::hostinfo::SystemHostInfo;
use crate::publisher::StatusPublisher;
use crate::store::StoreClient;

/// Initialize tracing/logging based on configuration
fn init_logging(config: &AgentConfig) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    // If log file is configured, add a daily-rolling file layer
    if !config.log_file.is_empty() {
        let log_path = Path::new(&config.log_file);
        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        if let (Some(dir), Some(file_name)) = (log_path.parent(), log_path.file_name()) {
            let file_appender = tracing_appender::rolling::daily(dir, file_name);

            if config.log_format == config::LogFormat::Json {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().json())
                    .with(fmt::layer().json().with_writer(file_appender).with_ansi(false))
                    .init();
            } else {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().pretty())
                    .with(fmt::layer().json().with_writer(file_appender).with_ansi(false))
                    .init();
            }
            return;
        }
    }

    // Fallback: stdout only
    if config.log_format == config::LogFormat::Json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().pretty())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (before logging init)
    let config = AgentConfig::load();

    if let Err(e) = config.validate() {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    }

    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        store_addr = %config.store_addr,
        config_path = config::DEFAULT_CONFIG_PATH,
        "LCD status agent starting"
    );

    debug!(?config, "Configuration loaded");

    // Shutdown signal feeds a watch channel the publish loop selects on
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "Shutdown signal handler failed");
        }
        let _ = shutdown_tx.send(true);
    });

    // One connection for the process lifetime; fail fast if the store is
    // unreachable and let the service manager decide what happens next.
    let mut store = StoreClient::connect_with_timeout(
        &config.store_addr,
        Duration::from_secs(config.connect_timeout_secs),
    )
    .await
    .with_context(|| {
        format!(
            "Failed to connect to key-value store at {}",
            config.store_addr
        )
    })?;

    store
        .ping()
        .await
        .context("Key-value store did not answer PING")?;

    let publisher = StatusPublisher::new(
        store,
        SystemHostInfo,
        Duration::from_secs(config.publish_interval_secs),
    );

    let frames = publisher
        .run(shutdown_rx)
        .await
        .context("Status publish loop failed")?;

    info!(frames_published = frames, "LCD status agent stopped");
    Ok(())
}

/// Wait for shutdown signal (SIGTERM, SIGINT, or Ctrl+C)
async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(windows)]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}
