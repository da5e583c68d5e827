//! Shadowlocal - Shadowsocks Local Client
//!
//! This is the main entry point for the Shadowlocal application.

use anyhow::{bail, Result};
use clap::Parser;
use shadowlocal::config::{load_config, Config, LocalConfig};
use shadowlocal::run_local;
use std::path::PathBuf;
use tokio::sync::broadcast;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Shadowlocal - SOCKS5 in, encrypted Shadowsocks tunnel out
#[derive(Parser, Debug)]
#[command(name = "shadowlocal")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server URL, e.g. ss://aes-256-gcm:secret@relay.example:8388
    #[arg(short, long, conflicts_with = "config")]
    server: Option<String>,

    /// SOCKS5 listen address
    #[arg(short = 'L', long, default_value = "127.0.0.1:1080")]
    listen: String,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable JSON logging format
    #[arg(long)]
    json_log: bool,
}

impl Args {
    /// Resolve the effective configuration from the file or the flags
    fn into_config(self) -> Result<Config> {
        match (self.config, self.server) {
            (Some(path), _) => {
                let config = load_config(&path)?;
                info!("Configuration loaded from: {:?}", path);
                Ok(config)
            }
            (None, Some(server)) => Ok(Config {
                local: LocalConfig::new(server, self.listen),
            }),
            (None, None) => bail!("either --server or --config is required"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    setup_logging(&args.log_level, args.json_log)?;

    info!("Shadowlocal v{}", shadowlocal::VERSION);

    let config = args.into_config()?;

    // Setup shutdown signal
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    // Handle Ctrl+C and termination signals (cross-platform)
    tokio::spawn(async move {
        wait_for_signal().await;
        let _ = shutdown_tx.send(true);
    });

    run_local(config, shutdown_rx).await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            tracing::warn!("Failed to setup SIGTERM handler: {}", e);
            let _ = tokio::signal::ctrl_c().await;
            info!("Received Ctrl+C, shutting down...");
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Received Ctrl+C, shutting down...");
}

/// Setup logging based on command-line flags
fn setup_logging(level: &str, json: bool) -> Result<()> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    if json {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(())
}
