use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use relay_lib::{config::Settings, ws_router, AppState};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize configuration
    // Try to load with explicit path if default doesn't work
    let settings = Settings::load().or_else(|_| {
        eprintln!("Trying to load config from alternate locations");
        Settings::load_from("config/default.toml")
            .or_else(|_| Settings::load_from("./config/default.toml"))
    })?;

    // Initialize tracing, RUST_LOG taking precedence over the config file
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(settings.log_level.clone())),
        )
        .init();

    // Create application state
    let state = Arc::new(AppState::new(settings));

    // Browsers from the allow-listed origins may open signaling connections
    let origins = state
        .settings
        .allowed_origins
        .iter()
        .map(|origin| origin.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()?;
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    let addr = state.settings.socket_addr()?;

    // Create the router
    let app = ws_router::create_router(state).layer(cors);

    // Start the server
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "signaling relay listening");

    axum::serve(listener, app).await?;

    Ok(())
}
