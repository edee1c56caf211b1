mod coercion;
mod config;
mod errors;
mod history;
mod llm_client;
mod models;
mod pipeline;
mod routes;
mod schema;
mod state;
mod store;
mod tailoring;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::pipeline::Pipeline;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::FileStore;
use crate::tailoring::loader::HttpContentLoader;

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

    info!("Starting Tailor API v{}", env!("CARGO_PKG_VERSION"));

    // Document store
    let store = Arc::new(FileStore::open(config.data_dir.clone()).await?);

    // LLM client
    let llm = Arc::new(LlmClient::with_base_url(
        config.anthropic_api_key.clone(),
        config.llm_base_url.clone(),
    )?);
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Job description fetcher
    let loader = Arc::new(HttpContentLoader::new(config.fetch_timeout)?);

    info!("Role schema: {}", config.role_schema);
    let pipeline = Pipeline::new(store, llm, loader, config.role_schema);

    let state = AppState {
        pipeline,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
