//! Application state shared across handlers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderMap;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::config::Config;

/// A logged-in farmer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Farmer {
    pub id: String,
    pub name: String,
    pub phone: String,
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<Config>,
    /// Outbound HTTP client for third-party services.
    pub http: reqwest::Client,
    /// Issued bearer tokens.
    sessions: Arc<RwLock<HashMap<String, Farmer>>>,
}

impl AppState {
    /// Create new application state.
    pub fn new(config: Config) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self {
            config: Arc::new(config),
            http,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Issue an opaque token for `farmer`.
    pub async fn open_session(&self, farmer: Farmer) -> String {
        let token = uuid::Uuid::new_v4().simple().to_string();
        self.sessions.write().await.insert(token.clone(), farmer);
        token
    }

    /// Resolve the farmer behind an `Authorization: Bearer` header, if any.
    pub async fn farmer_from_headers(&self, headers: &HeaderMap) -> Option<Farmer> {
        let token = headers
            .get(axum::http::header::AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")?;
        self.sessions.read().await.get(token).cloned()
    }
}
