//! retune-ap - Audio transformation & analysis microservice
//!
//! **Module Identity:**
//! - Name: retune-ap (Audio Processing)
//! - Port: 5780 (default)
//!
//! Downloads a recording, detects key and tempo, transposes/retimes it on
//! request, transcribes it to MIDI and publishes the artifacts.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use retune_ap::config::{ServiceConfig, DEFAULT_PORT};
use retune_ap::db::SqliteMetadataStore;
use retune_ap::pipeline::Pipeline;
use retune_ap::{AppState, PipelineBackend};
use retune_common::config::{default_config_path, load_toml_config, RootFolderResolver};
use retune_common::events::EventBus;

const MODULE_NAME: &str = "retune-ap";

/// Command-line arguments for retune-ap
#[derive(Parser, Debug)]
#[command(name = "retune-ap")]
#[command(about = "Audio transformation and analysis microservice")]
#[command(version)]
struct Args {
    /// Port to listen on (default 5780)
    #[arg(short, long, env = "RETUNE_PORT")]
    port: Option<u16>,

    /// Root folder for job workspaces and the job database
    #[arg(short, long, env = "RETUNE_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// TOML config file (default ~/.config/retune/retune-ap.toml)
    #[arg(short, long, env = "RETUNE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args
        .config
        .clone()
        .or_else(|| default_config_path(MODULE_NAME));
    let config: ServiceConfig = match &config_path {
        Some(path) => load_toml_config(path)
            .with_context(|| format!("Failed to load {}", path.display()))?
            .unwrap_or_default(),
        None => ServiceConfig::default(),
    };

    // RUST_LOG wins over the [logging] level
    let default_filter = format!(
        "retune_ap={level},retune_common={level},tower_http={level}",
        level = config.logging.level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting retune-ap (Audio Processing) microservice");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &config_path {
        info!("Config file: {}", path.display());
    }

    // Root folder: CLI/ENV → TOML → compiled default
    let root_folder = RootFolderResolver::new(MODULE_NAME)
        .with_cli_arg(args.root_folder.clone())
        .with_toml_root(config.root_folder.clone())
        .resolve();
    std::fs::create_dir_all(&root_folder)
        .with_context(|| format!("Failed to create root folder {}", root_folder.display()))?;
    info!("Root folder: {}", root_folder.display());

    let db_path = config.database_path(&root_folder);
    info!("Database: {}", db_path.display());
    let db_pool = retune_ap::db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    let event_bus = EventBus::new(100);

    let settings = config.pipeline_settings(&root_folder);
    info!("Workspace root: {}", settings.workspace_root.display());

    // Configuration problems keep the server up so every job reports them
    let backend = PipelineBackend::from_result(
        retune_ap::services::build_collaborators(&config, &root_folder, db_pool.clone())
            .and_then(|collaborators| Pipeline::new(settings, collaborators, event_bus.clone())),
    );
    match &backend {
        PipelineBackend::Ready(_) => info!("Pipeline ready"),
        PipelineBackend::Misconfigured(message) => {
            warn!("Pipeline misconfigured, jobs will fail: {}", message)
        }
    }

    let metadata = Arc::new(SqliteMetadataStore::new(db_pool));
    let state = AppState::new(event_bus, backend, metadata);
    let app = retune_ap::build_router(state).layer(TraceLayer::new_for_http());

    let port = args.port.or(config.port).unwrap_or(DEFAULT_PORT);
    let bind_address = config
        .bind_address
        .clone()
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let addr = format!("{}:{}", bind_address, port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

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
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
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
