// src/main.rs
use dotenv::dotenv;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::PathBuf;
use std::{net::SocketAddr, str::FromStr, sync::Arc};
use tokio::{net::TcpListener, sync::watch, sync::RwLock};
use tracing::{info, warn};

// ============================================================================
// MODULE IMPORTS
// ============================================================================

mod app;
mod auth;
mod candidates;
mod common;
mod logging_middleware;
mod services;
mod users;

// ============================================================================
// COMMON IMPORTS
// ============================================================================

use common::dev_mode::{apply_cli_override, print_dev_mode_status, DevModeConfig};
use common::telemetry::{init_sentry, init_tracing};
use common::{AppConfig, AppState};
use services::{
    FileStorage, IngestionPipeline, IngestionWorker, OpenAIOracle, RetryPolicy, TaskQueue,
};

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = AppConfig::from_env();
    let _sentry_guard = init_sentry(config.sentry_dsn.as_deref());
    init_tracing();

    info!(
        name = app::APP_NAME,
        version = app::APP_VERSION,
        "Starting service"
    );

    // ========================================================================
    // DEV MODE CONFIGURATION
    // ========================================================================

    let dev_mode = apply_cli_override(DevModeConfig::from_env());
    print_dev_mode_status(&dev_mode);

    // ========================================================================
    // DIRECTORY SETUP
    // ========================================================================

    let storage = FileStorage::new(config.upload_dir.clone());
    storage.ensure_dir().await?;

    // ========================================================================
    // DATABASE SETUP
    // ========================================================================

    if let Some(path_part) = config.database_url.strip_prefix("sqlite://") {
        let path_without_params = path_part.split('?').next().unwrap_or("");
        if !path_without_params.is_empty() && !path_without_params.starts_with(':') {
            let db_path = PathBuf::from(path_without_params);
            if let Some(parent) = db_path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
        }
    }

    let connect_options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .connect_with(connect_options)
        .await?;

    // Run database migrations
    common::migrations::run_migrations(&pool).await?;
    dev_mode.ensure_dev_user(&pool).await?;

    // ========================================================================
    // SERVICE INITIALIZATION
    // ========================================================================

    if config.openai.api_key.is_none() {
        warn!("OPENAI_API_KEY is not set; resume extraction will fail until it is configured");
    }
    let oracle = Arc::new(OpenAIOracle::new(config.openai.clone()));
    info!(model = %config.openai.model, mode = ?config.openai.mode, "Extraction oracle initialized");

    let pipeline = Arc::new(IngestionPipeline::new(pool.clone(), oracle));
    let task_queue = TaskQueue::new(pool.clone(), RetryPolicy::from(&config.worker));

    let requeued = task_queue.requeue_stale_running().await?;
    if requeued > 0 {
        warn!(count = requeued, "Requeued ingestion tasks left running by a previous process");
    }

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let worker = IngestionWorker::new(task_queue.clone(), pipeline.clone(), config.worker.clone());
    let worker_handle = tokio::spawn(worker.run(async move {
        let _ = shutdown_rx.changed().await;
    }));

    // ========================================================================
    // APPLICATION STATE
    // ========================================================================

    let config = Arc::new(config);
    let app_state = AppState {
        db: pool,
        config: config.clone(),
        dev_mode,
        storage,
        pipeline,
        task_queue,
    };

    let shared = Arc::new(RwLock::new(app_state));
    let app = app::build_router(shared, &config);

    // ========================================================================
    // SERVER STARTUP
    // ========================================================================

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = worker_handle.await {
        warn!(error = %e, "Ingestion worker did not stop cleanly");
    }

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
