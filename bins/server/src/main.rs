//! Expensa API Server
//!
//! Main entry point for the Expensa backend service.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use expensa_api::{AppState, create_router};
use expensa_core::ai::HttpLanguageModel;
use expensa_core::reports::{PagedTextRenderer, RenderWorker, spawn_render_worker};
use expensa_core::storage::DocumentStorage;
use expensa_db::{ReportRepository, connect};
use expensa_shared::AppConfig;

/// Headroom over the model timeout for the rest of a request.
const REQUEST_TIMEOUT_MARGIN_SECS: u64 = 30;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing; EXPENSA_LOG_FORMAT=json switches to JSON lines
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "expensa=debug,expensa_core=debug,tower_http=debug".into());
    let json = std::env::var("EXPENSA_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Connect to database
    let db = connect(
        &config.database.url,
        config.database.max_connections,
        config.database.min_connections,
    )
    .await?;
    info!("Connected to database");

    // Document storage and the background renderer
    let documents = DocumentStorage::from_config(&config.storage)?;
    info!(provider = documents.provider_name(), "Document storage configured");

    let worker = RenderWorker::new(
        Arc::new(ReportRepository::new(db.clone())),
        Arc::new(PagedTextRenderer::default()),
        documents.clone(),
    );
    let (render_queue, render_handle) =
        spawn_render_worker(worker, config.reports.render_queue_capacity);

    // Language model client
    let model = HttpLanguageModel::from_config(&config.ai)?;
    info!(endpoint = %config.ai.endpoint, model = %config.ai.model, "Language model configured");

    // Create application state
    let state = AppState::new(&db, Arc::new(model), documents, render_queue, &config);

    // Create router
    let request_timeout =
        Duration::from_secs(config.ai.timeout_secs.saturating_add(REQUEST_TIMEOUT_MARGIN_SECS));
    let app = create_router(state, request_timeout);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router held the last queue sender; the worker drains and exits.
    render_handle.await?;
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
