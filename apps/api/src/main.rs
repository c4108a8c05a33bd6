mod analysis;
mod catalog;
mod config;
mod errors;
mod extract;
mod llm_client;
mod routes;
mod state;
#[cfg(test)]
mod tests;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::catalog::CatalogClient;
use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

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

    info!("Starting Resumatch API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize model catalog client
    let catalog = CatalogClient::new(
        config.openrouter_base_url.clone(),
        config.openrouter_api_key.clone(),
    );
    info!("Model catalog client initialized");

    // Initialize LLM client
    let llm = LlmClient::new(
        config.openrouter_base_url.clone(),
        config.openrouter_api_key.clone(),
        std::time::Duration::from_secs(config.llm_timeout_secs),
    );
    info!(
        "LLM client initialized (timeout: {}s, default model: {})",
        config.llm_timeout_secs, config.default_model
    );

    // Build app state
    let state = AppState {
        catalog,
        llm,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
