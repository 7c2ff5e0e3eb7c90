mod config;
mod errors;
mod recommend;
mod routes;
mod session;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::recommend::artifacts::ArtifactBundle;
use crate::recommend::scorer::CosineRecommender;
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

    info!("Starting Job Recommender v{}", env!("CARGO_PKG_VERSION"));

    // Load the artifact bundle once; every request shares it read-only
    let artifacts = ArtifactBundle::load(&config.artifacts_path).with_context(|| {
        format!(
            "Failed to load recommendation artifacts from {}",
            config.artifacts_path.display()
        )
    })?;
    let artifacts = Arc::new(artifacts);

    let recommender = Arc::new(CosineRecommender::new(Arc::clone(&artifacts)));
    info!(
        "Recommender ready: {} postings, {} locations, default top_n {}",
        artifacts.catalog().len(),
        artifacts.locations().len(),
        config.default_top_n
    );

    // Build app state
    let state = AppState {
        config: config.clone(),
        recommender,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict CORS to the front-end origin once it is deployed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
