//! Configuration types for krishi-client.

use std::env;
use std::time::Duration;

use crate::error::ClientError;

/// Configuration for reaching the advisory backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL of the backend (e.g., "http://localhost:8080").
    pub base_url: String,
    /// Timeout applied to every HTTP call.
    pub request_timeout: Duration,
    /// Upper bound for a single replayed message during a queue drain.
    /// If None, a replay waits as long as the HTTP timeout allows.
    pub replay_timeout: Option<Duration>,
    /// Failed replays after which a message moves to the dead-letter list.
    /// If None, failed messages are retried on every drain indefinitely.
    pub max_replay_attempts: Option<u32>,
}

impl ClientConfig {
    /// Default HTTP timeout.
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    /// Create a new configuration with the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
            replay_timeout: None,
            max_replay_attempts: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `KRISHI_API_URL` | Backend base URL | `http://localhost:8080` |
    /// | `KRISHI_REQUEST_TIMEOUT_SECS` | HTTP timeout | `10` |
    /// | `KRISHI_REPLAY_TIMEOUT_SECS` | Per-message replay timeout | (none) |
    /// | `KRISHI_MAX_REPLAY_ATTEMPTS` | Dead-letter threshold | (unbounded) |
    pub fn from_env() -> Result<Self, ClientError> {
        let base_url =
            env::var("KRISHI_API_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());
        let mut config = Self::new(base_url);

        if let Some(secs) = parse_env::<u64>("KRISHI_REQUEST_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_env::<u64>("KRISHI_REPLAY_TIMEOUT_SECS")? {
            config.replay_timeout = Some(Duration::from_secs(secs));
        }
        config.max_replay_attempts = parse_env::<u32>("KRISHI_MAX_REPLAY_ATTEMPTS")?;

        if config.max_replay_attempts == Some(0) {
            return Err(ClientError::Config(
                "KRISHI_MAX_REPLAY_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        Ok(config)
    }

    /// Point at a different backend, keeping the other settings.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Set the HTTP timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Bound each replayed message to `timeout`.
    pub fn with_replay_timeout(mut self, timeout: Duration) -> Self {
        self.replay_timeout = Some(timeout);
        self
    }

    /// Dead-letter messages after `attempts` failed replays.
    pub fn with_max_replay_attempts(mut self, attempts: u32) -> Self {
        self.max_replay_attempts = Some(attempts.max(1));
        self
    }

    /// Get the absolute URL for an API path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Get the health check endpoint URL.
    pub fn health_url(&self) -> String {
        self.url("/health")
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("http://localhost:8080")
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>, ClientError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ClientError::Config(format!("{} is not a valid number: {}", name, raw))),
        Err(_) => Ok(None),
    }
}
