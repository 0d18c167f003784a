//! Reporthive daemon - build-result ingestion and retrieval service

use anyhow::Result;
use clap::Parser;
use reporthive_core::ServiceConfig;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod files;
mod ingest;
mod retention;
mod routes;
mod state;
mod views;

use state::AppState;

#[derive(Parser)]
#[command(name = "reporthived", about = "Build-result ingestion and retrieval service", version)]
struct Cli {
    /// Path of the configuration file
    #[arg(short, long, default_value = "reporthive.toml", env = "REPORTHIVE_CONFIG")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reporthived=info,reporthive_db=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    info!("Reporthive starting (config: {})", cli.config.display());
    let config = ServiceConfig::load(&cli.config)?;

    let state = AppState::from_config(&config).await?;
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info!("Listening on {}", config.bind);

    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down...");
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down...");
        }
    }

    info!("Shutdown complete");
    Ok(())
}
