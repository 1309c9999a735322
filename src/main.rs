use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use interview_pipeline::{
    app,
    config::{get_config, init_config},
    services::{store_service::HttpCandidateStore, wait_service::spawn_wait_ticker},
    AppState,
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    init_config()?;
    let config = get_config();

    let store = HttpCandidateStore::new(
        &config.store_base_url,
        config.store_api_token.clone(),
        Duration::from_secs(config.store_timeout_secs),
    )?;
    let app_state = AppState::new(config.clone(), Arc::new(store));

    if let Err(e) = app_state.collections.refresh().await {
        warn!(error = %e, "Initial pipeline load failed, serving empty collections until the next refresh");
    }
    spawn_wait_ticker(app_state.collections.clone(), Duration::from_secs(1));

    let router = app(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
