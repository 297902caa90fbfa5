mod config;
mod errors;
mod jobs;
mod jobs_client;
mod models;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::jobs::search::run_search_worker;
use crate::jobs_client::JobsApiClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting JobDeck API v{}", env!("CARGO_PKG_VERSION"));

    match &config.jobs_api_url {
        Some(url) => info!("Jobs API endpoint: {url}"),
        None => warn!("JOBS_API_URL is not set; search and apply requests will fail"),
    }

    // One client serves both the search and application traits
    let client = Arc::new(JobsApiClient::new(
        config.jobs_api_url.clone(),
        Duration::from_secs(config.request_timeout_secs),
    )?);

    let (state, triggers) = AppState::new(config.clone(), client.clone(), client);

    tokio::spawn(run_search_worker(state.search.clone(), triggers));
    info!("Search worker started (limit {})", config.search_limit);

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict CORS to the web client origin

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
