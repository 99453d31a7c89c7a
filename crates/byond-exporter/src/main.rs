//! byond-exporter — Prometheus exporter for BYOND game servers.
//!
//! Resolves the comms key once, then answers every scrape of `/metrics`
//! with a fresh `prometheus_metrics` topic query against the game server.
//!
//! # Usage
//!
//! ```text
//! byond-exporter --bind 0.0.0.0:9100 --host game.example.org:8000 \
//!     --config-file /srv/ss13/config/config.txt
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use byond_metrics::MetricsGatherer;
use clap::Parser;
use tracing::info;

#[derive(Parser)]
#[command(name = "byond-exporter", about = "Prometheus exporter for BYOND game servers")]
struct Cli {
    /// Address to serve /metrics on.
    #[arg(long)]
    bind: String,

    /// Game server to gather metrics from (host:port).
    #[arg(long)]
    host: String,

    /// Key used to authenticate to the game server.
    #[arg(long, default_value = "")]
    key: String,

    /// Path to a config.txt whose COMMS_PASSWORD overrides --key.
    #[arg(long, alias = "config_file")]
    config_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,byond_exporter=debug,byond_metrics=debug".into()),
        )
        .init();

    let cli = Cli::parse();
    run(cli).await
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let key = byond_metrics::resolve_key(cli.config_file.as_deref(), &cli.key)
        .context("failed to extract key from config file")?;

    info!(
        host = %cli.host,
        authenticated = !key.is_empty(),
        "starting"
    );

    let gatherer = Arc::new(MetricsGatherer::connect(&cli.host, key));
    let router = byond_api::build_router(gatherer);

    let listener = tokio::net::TcpListener::bind(&cli.bind)
        .await
        .with_context(|| format!("failed to bind {}", cli.bind))?;
    info!(addr = %listener.local_addr()?, "serving /metrics");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            info!("shutdown signal received");
        })
        .await?;

    info!("byond-exporter stopped");
    Ok(())
}
