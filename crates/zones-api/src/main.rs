//! # zones-api — Binary Entry Point
//!
//! `zones-api [--config <path>] [serve|migrate]`. `serve` (the default)
//! connects to PostGIS, optionally applies migrations, and runs the HTTP
//! server until SIGINT/SIGTERM. `migrate` applies migrations and exits.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use zones_api::{app, telemetry, AppConfig, AppState};
use zones_batch::BatchContainmentCoordinator;
use zones_store::{postgres, PgZoneStore};

/// Zones service: stores geofencing zones and answers point containment
/// queries, singly or in keyed batches.
#[derive(Parser, Debug)]
#[command(name = "zones-api", version, about)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, env = "CONFIG_PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(clap::Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Run the HTTP server.
    Serve,
    /// Apply database migrations and exit.
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    telemetry::init(config.env)?;
    tracing::debug!(?config, "configuration loaded");

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Migrate => migrate(&config).await,
    }
}

async fn migrate(config: &AppConfig) -> anyhow::Result<()> {
    let pool = postgres::connect(&config.pool_settings()?).await?;
    postgres::migrate(&pool).await?;
    pool.close().await;
    Ok(())
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    if let Some(addr) = config.metrics.listen {
        PrometheusBuilder::new().with_http_listener(addr).install()?;
        tracing::info!(%addr, "Prometheus exporter listening");
    }

    let pool: sqlx::PgPool = postgres::connect(&config.pool_settings()?).await?;
    if config.storage.run_migrations {
        postgres::migrate(&pool).await?;
    }

    let store = Arc::new(PgZoneStore::new(pool.clone()));
    let coordinator = BatchContainmentCoordinator::new(
        Arc::new(pool.clone()),
        Arc::clone(&store),
        config.coordinator_config(),
    );
    tracing::info!(
        max_workers = config.coordinator_config().max_workers(),
        workers_per_batch = coordinator.worker_count(usize::MAX),
        "batch coordinator ready"
    );

    let addr = config.bind_addr();
    let state = AppState::new(store, Arc::new(coordinator), config);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("zones API listening on {}", addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("zones API stopped");
    Ok(())
}

/// Resolves on SIGINT or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown signal received, draining connections");
}
