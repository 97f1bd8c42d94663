mod collections;
mod config;
mod engine;
mod errors;
mod models;
mod routes;
mod schema;
mod state;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, StoreBackend};
use crate::routes::build_router;
use crate::schema::EntityRegistry;
use crate::state::AppState;
use crate::store::{MemoryStore, PocketBaseStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting JobOS API v{}", env!("CARGO_PKG_VERSION"));

    let registry = EntityRegistry::builtin().context("built-in collection schemas are invalid")?;
    info!("Registered {} collections", registry.len());

    // Initialize the record store
    let state = match config.store_backend {
        StoreBackend::PocketBase => {
            let store = PocketBaseStore::new(&config.pocketbase_url, config.store_timeout)
                .context("failed to build the PocketBase client")?;
            info!("Record store: PocketBase at {}", config.pocketbase_url);
            AppState::new(registry, Arc::new(store), config.list_page_size)
        }
        StoreBackend::Memory => {
            info!("Record store: in-memory");
            let store = MemoryStore::new(&format!("http://localhost:{}", config.port));
            AppState::new(registry, Arc::new(store), config.list_page_size)
        }
    };

    // Build router
    let app = build_router(state.with_upload_limit(config.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
