// API Server Binary Entry Point
//
// Purpose: Start the crop advisor HTTP service
// Usage: cargo run --features api --bin api_server

use crop_advisor::{create_router, AppState, ServerConfig};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (structured logging)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    // Default log level: info for our crate, warn for others
                    "crop_advisor=info,tower_http=debug,axum=debug,warn".into()
                }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting API server...");

    let config = ServerConfig::from_env();
    tracing::info!("Configuration:");
    tracing::info!("  PORT: {}", config.port);
    tracing::info!("  MODELS_DIR: {:?}", config.models_dir);
    tracing::info!("  CROP_DATA_PATH: {:?}", config.crop_data_path);
    tracing::info!("  API_GOV_KEY: {}", if config.price_api_key.is_some() { "set" } else { "unset" });
    tracing::info!("  WEATHER_API_URL: {}", config.weather_api_url);

    let port = config.port;

    // Load catalog and models, build outbound clients
    tracing::info!("Initializing application state...");
    let state = AppState::new(config).await?;
    let status = state.models.status();
    tracing::info!(
        "Models loaded: crop_recommender={}, yield_predictor={}, disease_detector={}",
        status.crop_recommender, status.yield_predictor, status.disease_detector
    );

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
