//! Route handlers for the advisory server.

pub mod advice;
pub mod auth;
pub mod health;
pub mod market;
pub mod misc;
pub mod news;
pub mod sms;
pub mod upload;
pub mod weather;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health::welcome))
        .route("/health", get(health::health))
        // Advisory
        .route("/api/advice", post(advice::advice))
        .route("/api/advice/feedback", post(advice::feedback))
        .route("/api/upload", post(upload::upload))
        // Lookups
        .route("/api/misc/market-prices", get(misc::market_prices))
        .route("/api/misc/weather", get(misc::pincode_weather))
        .route("/api/misc/default-questions", get(misc::default_questions))
        .route("/api/weather", get(weather::current_weather))
        .route("/api/weather/forecast", get(weather::outlook))
        .route("/api/weather/advice", post(news::farm_news))
        .route("/api/market/mandi", get(market::mandi_rates))
        // Webhooks and auth
        .route("/api/sms/inbound", post(sms::inbound))
        .route("/api/auth/login", post(auth::login))
}
