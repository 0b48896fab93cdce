//! salesdash-ingest - Sales CSV ingestion microservice
//!
//! Accepts CSV uploads from the sales dashboard, aggregates them and serves
//! the resulting summaries. State is in memory for the process lifetime.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, FmtSubscriber};

use salesdash_ingest::config::{Args, ServiceConfig};
use salesdash_ingest::service::IngestionService;
use salesdash_ingest::store::SummaryStore;
use salesdash_ingest::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config loading logs before the configured level is known
    let bootstrap = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    let config = tracing::subscriber::with_default(bootstrap, || ServiceConfig::load(&args))
        .context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "salesdash_ingest={level},tower_http={level}",
                    level = config.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting salesdash-ingest v{} on {}",
        env!("CARGO_PKG_VERSION"),
        config.bind_addr()
    );
    info!(
        max_upload_bytes = config.max_upload_bytes,
        max_summaries = ?config.max_summaries,
        delimiter = %char::from(config.schema.delimiter),
        "Ingestion limits"
    );

    // Constructed once, shared by every request for the process lifetime
    let store = Arc::new(SummaryStore::with_capacity_limit(config.max_summaries));
    let ingestion = IngestionService::new(store, config.schema.clone(), config.max_upload_bytes);
    let app = build_router(AppState::new(ingestion));

    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr()))?;
    info!("Listening on http://{}", config.bind_addr());
    info!("Health check: http://{}/health", config.bind_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
