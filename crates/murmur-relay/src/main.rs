//! # murmur-relay
//!
//! Relay server binary: loads settings, installs logging and metrics, and
//! serves `/ws`, `/health` and `/metrics` until Ctrl-C.

#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use murmur_server::config::ServerConfig;
use murmur_server::server::RelayServer;
use murmur_settings::MurmurSettings;

/// murmur relay server.
#[derive(Parser, Debug)]
#[command(name = "murmur-relay", version, about = "Private-messaging relay")]
struct Cli {
    /// Settings file (defaults to `~/.murmur/settings.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Maximum concurrent connections (overrides settings).
    #[arg(long)]
    max_connections: Option<usize>,

    /// Log filter directive, e.g. `debug` or `murmur_server=trace,info`.
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    fn load_settings(&self) -> Result<MurmurSettings> {
        let mut settings = match &self.config {
            Some(path) => murmur_settings::load_settings_from_path(path)
                .with_context(|| format!("Failed to load settings from {}", path.display()))?,
            None => murmur_settings::load_settings().context("Failed to load settings")?,
        };
        self.apply_overrides(&mut settings);
        Ok(settings)
    }

    fn apply_overrides(&self, settings: &mut MurmurSettings) {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(max) = self.max_connections {
            settings.server.max_connections = max;
        }
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
        if self.log_json {
            settings.logging.json = true;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let _ = murmur_settings::init_settings(args.load_settings()?);
    let settings = murmur_settings::get_settings();
    murmur_logging::init(&settings.logging.level, settings.logging.json);

    let metrics = murmur_server::metrics::install_recorder().context("Failed to install metrics recorder")?;
    let server = RelayServer::new(ServerConfig::from(&settings.server)).with_metrics(metrics);

    let (addr, handle) = server.listen().await.context("Failed to bind relay")?;
    tracing::info!("murmur relay listening on ws://{addr}/ws");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    let _ = server.shutdown().graceful_shutdown(vec![handle], None).await;
    tracing::info!("Shutdown complete");
    Ok(())
}
