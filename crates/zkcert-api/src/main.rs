//! # zkcert-api — Binary Entry Point
//!
//! Starts the Axum HTTP server. Configuration comes from the environment
//! (see [`AppConfig::from_env`]); the listen port defaults to 5000.

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;
use zkcert_api::state::{AppConfig, AppState, LogFormat};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;

    // Initialize structured tracing.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")?;

    if !config.circuit_dir.is_dir() {
        tracing::warn!(
            dir = %config.circuit_dir.display(),
            "circuit directory not found; readiness will report unavailable"
        );
    }
    tracing::info!(
        circuit_dir = %config.circuit_dir.display(),
        runs_dir = %config.runs_dir.display(),
        nargo = %config.toolchain.nargo_bin,
        bb = %config.toolchain.bb_bin,
        retain_runs = config.retain_runs,
        max_retained_runs = config.max_retained_runs,
        "configuration loaded"
    );

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    let runs_dir = config.runs_dir.clone();
    let state = AppState::new(config).with_metrics(metrics);
    let pruned = state
        .retention
        .adopt_existing(&runs_dir)
        .await
        .context("failed to scan runs directory")?;
    if pruned > 0 {
        tracing::info!(pruned, dir = %runs_dir.display(), "pruned old run directories");
    }
    let app = zkcert_api::app(state);

    tracing::info!("zkcert API listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
