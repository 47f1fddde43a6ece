//! Transport seam between the client and the network.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::types::{ApiResponse, Method, PreparedRequest, RequestBody};

/// Executes prepared requests.
///
/// The client decides *whether* and *what* to send (auth header, offline
/// routing, envelope checks); a transport only moves bytes. Tests swap in
/// fakes through this trait.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform the request and return status plus parsed body.
    ///
    /// Errors are reserved for failures where no HTTP response arrived.
    async fn execute(&self, request: PreparedRequest) -> Result<ApiResponse, ClientError>;

    /// Check whether the backend is reachable.
    async fn check_health(&self) -> bool;

    /// Get a human-readable name for this transport.
    fn name(&self) -> &str;
}

/// Transport over HTTP using reqwest.
#[derive(Clone)]
pub struct HttpTransport {
    http: Client,
    config: ClientConfig,
}

impl HttpTransport {
    /// Build a transport for the configured backend.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(ClientError::Http)?;

        Ok(Self { http, config })
    }

    async fn multipart_form(field: &str, path: &std::path::Path) -> Result<Form, ClientError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.jpg".to_string());
        let part = Part::bytes(bytes).file_name(file_name);
        Ok(Form::new().part(field.to_string(), part))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: PreparedRequest) -> Result<ApiResponse, ClientError> {
        let url = self.config.url(&request.path);
        debug!("{:?} {}", request.method, url);

        let mut builder = match request.method {
            Method::Get => self.http.get(&url),
            Method::Post => self.http.post(&url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart { field, path } => {
                builder.multipart(Self::multipart_form(field, path).await?)
            }
        };

        let response = builder.send().await.map_err(ClientError::Http)?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(ClientError::Http)?;
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));

        Ok(ApiResponse { status, body })
    }

    async fn check_health(&self) -> bool {
        match self.http.get(self.config.health_url()).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!("Health check failed: {}", e);
                false
            }
        }
    }

    fn name(&self) -> &str {
        "HttpTransport"
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.config.base_url)
            .finish()
    }
}
