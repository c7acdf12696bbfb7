//! docimp-ie - Document Import Engine
//!
//! Drives the import wizard for the presentation layer over HTTP + SSE and
//! hands finalized jobs to the processing collaborator as `ImportJobFinalized`
//! events.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docimp_common::config::resolve_config;
use docimp_common::events::EventBus;
use docimp_ie::config::EngineSettings;
use docimp_ie::db::SqliteRecordIndex;
use docimp_ie::services::{analyzers_from_config, SessionServices};
use docimp_ie::AppState;

/// Command-line arguments for docimp-ie
#[derive(Parser, Debug)]
#[command(name = "docimp-ie")]
#[command(about = "Document import engine")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "DOCIMP_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on (overrides bind_address)
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = resolve_config(args.config.as_deref(), "docimp-ie");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    format!(
                        "docimp_ie={0},docimp_common={0},tower_http=info",
                        config.logging.level
                    )
                    .into()
                }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting docimp-ie (Document Import Engine)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let db_path = config.database_path_or_default();
    info!("Database: {}", db_path.display());
    let db_pool = docimp_ie::db::init_database_pool(&db_path)
        .await
        .context("Failed to open database")?;

    let event_bus = EventBus::new(config.event_bus_capacity);
    let (quality, extractor) =
        analyzers_from_config(&config.analyzer).context("Failed to build content analyzer")?;

    let services = SessionServices {
        record_index: Arc::new(SqliteRecordIndex::new(db_pool.clone())),
        quality,
        extractor,
        settings: EngineSettings::from(&config),
        event_bus,
    };
    let state = AppState::new(db_pool, services);
    let app = docimp_ie::build_router(state);

    let bind_address = args.bind.unwrap_or(config.bind_address);
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_address))?;
    info!("Listening on http://{}", bind_address);
    info!("Health check: http://{}/health", bind_address);

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
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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
