/// Server setup and initialization
///
/// Wires together all components: catalog storage, adapter catalog, engine
/// client, orchestrator, the async job worker, and the HTTP routes. Provides
/// the main application factory function for creating the axum app.

use anyhow::Result;
use axum::{routing::get, Router};
use sqlx::sqlite::SqlitePool;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::{
    adapters::{AdapterCatalog, AdapterMetadata},
    api::{
        execution::create_execution_routes,
        items::{create_item_routes, AppState},
        wirings::create_wiring_routes,
    },
    catalog::storage::CatalogStorage,
    config::Config,
    runtime::{
        channel::{job_channel, run_job_worker, LogPublisher},
        engine::HttpEngineClient,
        orchestrator::Orchestrator,
    },
};

/// Create the main axum application with all routes and background workers
pub async fn create_app(config: Config) -> Result<Router> {
    ensure_sqlite_dir(&config.database.url)?;

    tracing::info!("📦 Connecting catalog database: {}", config.database.url);
    let pool = SqlitePool::connect(&config.database.url).await?;
    let storage = CatalogStorage::new(pool);
    storage.init_schema().await?;

    tracing::info!("🔌 Initializing engine client ({})", config.engine.execution_url);
    let engine = Arc::new(HttpEngineClient::new(&config.engine)?);

    let adapters = Arc::new(AdapterCatalog::new());
    if let Some(path) = &config.adapters.file {
        tracing::info!("📇 Seeding adapter catalog from {}", path);
        let raw = std::fs::read_to_string(path)?;
        let metadata: Vec<AdapterMetadata> = serde_json::from_str(&raw)?;
        adapters.seed(metadata);
    }

    let orchestrator = Arc::new(Orchestrator::new(storage.clone(), engine.clone()));

    // Bounded async job channel; results go to the configured publisher
    tracing::info!("🚀 Starting job worker (queue capacity {})", config.jobs.queue_capacity);
    let (jobs, job_receiver) = job_channel(config.jobs.queue_capacity);
    tokio::spawn(run_job_worker(
        job_receiver,
        Arc::clone(&orchestrator),
        Arc::new(LogPublisher),
    ));

    let app_state = AppState {
        storage,
        orchestrator,
        engine,
        adapters,
        jobs,
    };

    let app = Router::new()
        .route("/healthz", get(health_check))
        .merge(create_item_routes())
        .merge(create_wiring_routes())
        .merge(create_execution_routes())
        .with_state(app_state);

    tracing::info!("✅ Application initialized");
    Ok(app)
}

/// Start the HTTP server with the given configuration
pub async fn start_server(config: Config) -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("Starting flowsmith server...");

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let app = create_app(config).await?;

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

/// Create the parent directory of a file-backed SQLite database.
fn ensure_sqlite_dir(url: &str) -> Result<()> {
    let Some(path) = url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.starts_with(':') {
        return Ok(());
    }
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Health check endpoint handler
async fn health_check() -> &'static str {
    "ok"
}
