//! Minimal rule-based advisory backend.
//!
//! Serves crop advice, feedback acknowledgement, a placeholder pest detector,
//! market prices, weather lookups, farming news, live mandi rates, an SMS
//! webhook and phone-number login.

pub mod agronomy;
pub mod config;
pub mod error;
pub mod farm_news;
pub mod mandi;
pub mod routes;
pub mod state;

use axum::extract::DefaultBodyLimit;
use axum::Router;

pub use config::{Config, ConfigError};
pub use error::ServerError;
pub use state::{AppState, Farmer};

/// Build the application with all routes and shared state.
pub fn app(state: AppState) -> Router {
    routes::router()
        .layer(DefaultBodyLimit::max(routes::upload::MAX_IMAGE_BYTES + 64 * 1024))
        .with_state(state)
}
