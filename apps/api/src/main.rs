mod assistant;
mod config;
mod documents;
mod errors;
mod extract;
mod llm_client;
mod models;
mod routes;
mod state;
mod storage;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::documents::service::DocumentService;
use crate::extract::PdfTextExtractor;
use crate::llm_client::build_generator;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::JsonSidecarStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting signdesk v{}", env!("CARGO_PKG_VERSION"));

    // Data directories
    tokio::fs::create_dir_all(&config.signatures_dir)
        .await
        .with_context(|| format!("creating {}", config.signatures_dir.display()))?;
    let store = JsonSidecarStore::open(&config.uploads_dir)
        .await
        .with_context(|| format!("opening metadata store at {}", config.uploads_dir.display()))?;
    info!("Metadata store at {}", store.dir().display());

    // Initialize the generative backend
    let generator = build_generator(&config)?;
    info!(
        "LLM backend initialized ({}, model: {})",
        generator.backend_name(),
        generator.model()
    );

    let documents = DocumentService::new(
        Arc::new(store),
        &config.uploads_dir,
        generator,
        config.llm_timeout,
    );

    match documents.report_orphans().await {
        Ok(orphans) if !orphans.is_empty() => {
            warn!("{} content file(s) without metadata", orphans.len());
        }
        Ok(_) => {}
        Err(e) => warn!("Orphan scan failed: {e}"),
    }

    // Build app state
    let state = AppState {
        documents: Arc::new(documents),
        extractor: Arc::new(PdfTextExtractor::new(config.extract_timeout)),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
