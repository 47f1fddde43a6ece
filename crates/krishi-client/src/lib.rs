//! Offline-aware API client for the Krishi advisory backend.
//!
//! This crate is the single point of egress from the farmer-facing app to
//! the backend. It provides:
//!
//! - Bearer-token handling persisted in a [`KeyValueStore`]
//! - Network-state aware dispatch: offline advisory questions are queued
//! - A durable FIFO [`OfflineQueue`] replayed when connectivity returns
//! - Typed helpers for advice, pest upload, weather and market prices
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use krishi_client::{AdvisoryQuery, ApiClient, ClientConfig, ClientError};
//! use secure_store::SqliteStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteStore::connect("sqlite:krishi.db?mode=rwc").await?;
//! store.migrate().await?;
//!
//! let client = ApiClient::connect(ClientConfig::default(), Arc::new(store)).await?;
//! client.login("9876543210").await?;
//!
//! let query = AdvisoryQuery::new("Which crop for my field?", "punjab", "en", "clay");
//! match client.ask(query).await {
//!     Ok(advice) => println!("Plant {}", advice.recommended_crop),
//!     Err(ClientError::Queued { id }) => println!("Saved offline as {}", id),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//!
//! // Later, when the platform reports connectivity again:
//! if let Some(drain) = client.set_online(true) {
//!     let report = drain.await?;
//!     println!("Delivered {} queued questions", report.delivered);
//! }
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod client;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod queue;
pub mod transport;
pub mod types;
pub mod validation;

pub use catalog::{Language, Season, SoilType};
pub use client::{ApiClient, ApiClientBuilder};
pub use config::ClientConfig;
pub use diagnostics::{Diagnostics, StorageFault, TracingDiagnostics};
pub use error::ClientError;
pub use queue::{DrainReport, OfflineQueue, QueuedMessage, Replayer};
pub use transport::{HttpTransport, Transport};
pub use types::*;
pub use validation::ValidationError;

pub use secure_store::KeyValueStore;

// Re-export async_trait for Transport implementors
pub use async_trait::async_trait;

/// Crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
