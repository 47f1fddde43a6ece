//! Advisory server binary.

use advisory_server::{app, AppState, Config};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    let config = Config::from_env()?;
    info!(addr = %config.addr, "Starting advisory server");
    if config.openweather_api_key.is_none() {
        warn!("OPENWEATHER_API_KEY not set, /api/weather routes will return 503");
    }
    if config.gemini_api_key.is_none() {
        warn!("GEMINI_API_KEY not set, farming news uses weather-based fallback");
    }
    if config.data_gov_api_key.is_none() {
        warn!("DATA_GOV_API_KEY not set, /api/market/mandi will return 503");
    }

    let addr = config.addr;
    let state = AppState::new(config)?;
    let app = app(state).layer(TraceLayer::new_for_http());

    info!(addr = %addr, "Advisory server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
