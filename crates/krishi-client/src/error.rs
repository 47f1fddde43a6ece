//! Error types for krishi-client.

use std::time::Duration;

use thiserror::Error;

use crate::validation::ValidationError;

/// Errors that can occur when talking to the advisory backend.
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed in flight (DNS, connect, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading a local file (e.g. an image to upload) failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend answered with a non-2xx status or `success: false`.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Client was offline; the request was stored for later delivery.
    #[error("Request queued for later delivery (id {id})")]
    Queued { id: String },

    /// Client was offline and the request cannot be deferred.
    #[error("Offline: request not sent")]
    Offline,

    /// Request was rejected before any network or queue interaction.
    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationError),

    /// Persistent storage failed while recording a request.
    #[error("Storage error: {0}")]
    Store(#[from] secure_store::StoreError),

    /// A replayed message exceeded its time budget.
    #[error("Replay timed out after {0:?}")]
    Timeout(Duration),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ClientError {
    /// Whether the request was accepted for later delivery.
    pub fn is_queued(&self) -> bool {
        matches!(self, Self::Queued { .. })
    }

    /// Whether the failure came from missing connectivity rather than the backend.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Queued { .. } | Self::Offline)
    }
}
