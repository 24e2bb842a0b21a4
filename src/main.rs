mod ai;
mod config;
mod converter;
mod copy;
mod error;
mod handlers;
mod languages;
mod prompt;
mod readiness;
mod routes;
mod sanitize;
mod session;
mod state;
mod websocket;

use anyhow::Result;
use axum::Router;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("code_converter=debug,tower_http=debug")),
        )
        .init();

    let config_paths: Vec<String> = vec![
        std::env::var("CONFIG_PATH").ok(),
        Some("conf.yaml".to_string()),
        Some("conf.json".to_string()),
    ]
    .into_iter()
    .flatten()
    .collect();

    let (config, loaded_path) = Config::load_first(&config_paths)?;
    match loaded_path {
        Some(path) => info!("Loaded configuration from: {}", path),
        None => info!("No config file found (tried {:?}); using defaults", config_paths),
    }

    let app_state = AppState::new(config.clone())?;

    // Readiness is probed once at startup; conversion stays disabled until it succeeds
    app_state.spawn_readiness_probe();

    let app = Router::new()
        .merge(routes::create_routes(app_state.clone()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
