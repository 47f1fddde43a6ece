//! Advisory backend API client.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secure_store::keys::TOKEN_KEY;
use secure_store::KeyValueStore;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::catalog::{self, Language};
use crate::config::ClientConfig;
use crate::diagnostics::{Diagnostics, StorageFault, TracingDiagnostics};
use crate::error::ClientError;
use crate::queue::{DrainReport, OfflineQueue, QueuedMessage, Replayer};
use crate::transport::{HttpTransport, Transport};
use crate::types::{
    Advisory, AdvisoryQuery, ApiRequest, ApiResponse, DayOutlook, FarmNews, Forecast,
    LoginResponse, MarketPrices, MarketRecord, PestDetection, PreparedRequest, WeatherSummary,
};

/// Single point of egress for backend calls.
///
/// Cloning is cheap; clones share token, online flag and queue.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    store: Arc<dyn KeyValueStore>,
    queue: Arc<OfflineQueue>,
    diagnostics: Arc<dyn Diagnostics>,
    config: ClientConfig,
    token: Arc<RwLock<Option<String>>>,
    online: Arc<AtomicBool>,
    /// Runtime that was current at build time, used for drains started
    /// from threads outside any runtime.
    runtime: Option<Handle>,
}

/// Builder for [`ApiClient`].
pub struct ApiClientBuilder {
    config: ClientConfig,
    store: Arc<dyn KeyValueStore>,
    transport: Option<Arc<dyn Transport>>,
    diagnostics: Option<Arc<dyn Diagnostics>>,
    online: bool,
}

impl ApiClientBuilder {
    /// Use a custom transport instead of HTTP.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Report recovered storage faults to `diagnostics`.
    pub fn diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    /// Initial network state. Defaults to online.
    pub fn online(mut self, online: bool) -> Self {
        self.online = online;
        self
    }

    pub fn build(self) -> Result<ApiClient, ClientError> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(self.config.clone())?),
        };
        let diagnostics = self
            .diagnostics
            .unwrap_or_else(|| Arc::new(TracingDiagnostics));

        let queue = OfflineQueue::new(self.store.clone())
            .with_diagnostics(diagnostics.clone())
            .with_replay_timeout(self.config.replay_timeout)
            .with_max_attempts(self.config.max_replay_attempts);

        Ok(ApiClient {
            transport,
            store: self.store,
            queue: Arc::new(queue),
            diagnostics,
            config: self.config,
            token: Arc::new(RwLock::new(None)),
            online: Arc::new(AtomicBool::new(self.online)),
            runtime: Handle::try_current().ok(),
        })
    }
}

#[derive(Deserialize)]
struct AdviceEnvelope {
    advisory: Advisory,
}

#[derive(Deserialize)]
struct FeedbackEnvelope {
    #[serde(default)]
    msg: String,
}

#[derive(Deserialize)]
struct UploadEnvelope {
    result: PestDetection,
}

#[derive(Deserialize)]
struct PricesEnvelope {
    prices: MarketPrices,
}

#[derive(Deserialize)]
struct ForecastEnvelope {
    forecast: Forecast,
}

#[derive(Deserialize)]
struct QuestionsEnvelope {
    questions: Vec<String>,
}

#[derive(Deserialize)]
struct OutlookEnvelope {
    days: Vec<DayOutlook>,
}

#[derive(Deserialize)]
struct MandiEnvelope {
    #[serde(default)]
    records: Vec<MarketRecord>,
}

impl ApiClient {
    /// Start building a client for `config` persisting into `store`.
    pub fn builder(config: ClientConfig, store: Arc<dyn KeyValueStore>) -> ApiClientBuilder {
        ApiClientBuilder {
            config,
            store,
            transport: None,
            diagnostics: None,
            online: true,
        }
    }

    /// Create an HTTP client and restore any persisted token.
    ///
    /// Messages left in the queue by an earlier session are replayed in the
    /// background.
    pub async fn connect(
        config: ClientConfig,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self, ClientError> {
        let client = Self::builder(config, store).build()?;
        client.load_token().await;
        info!(
            "API client ready for {} (transport: {})",
            client.config.base_url,
            client.transport.name()
        );

        let pending = client.queue.len().await;
        if client.is_online() && pending > 0 {
            info!("Replaying {} message(s) queued by an earlier session", pending);
            client.spawn_drain();
        }
        Ok(client)
    }

    // --- Token handling ---

    /// Persist `token` and attach it to every subsequent request.
    ///
    /// A storage failure is reported and the token is still used for this session.
    pub async fn set_token(&self, token: &str) {
        if let Err(e) = self.store.set(TOKEN_KEY, token).await {
            self.diagnostics.storage_fault(&StorageFault::WriteFailed {
                key: TOKEN_KEY.to_string(),
                reason: e.to_string(),
            });
        }
        *self.token.write().await = Some(token.to_string());
        debug!("Auth token set");
    }

    /// Restore the persisted token, if any.
    pub async fn load_token(&self) {
        match self.store.get(TOKEN_KEY).await {
            Ok(Some(token)) => {
                *self.token.write().await = Some(token);
                debug!("Auth token restored");
            }
            Ok(None) => {}
            Err(e) => self.diagnostics.storage_fault(&StorageFault::ReadFailed {
                key: TOKEN_KEY.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// Forget the token in storage and in memory. Safe to call repeatedly.
    pub async fn clear_token(&self) {
        if let Err(e) = self.store.delete(TOKEN_KEY).await {
            self.diagnostics.storage_fault(&StorageFault::WriteFailed {
                key: TOKEN_KEY.to_string(),
                reason: e.to_string(),
            });
        }
        *self.token.write().await = None;
        debug!("Auth token cleared");
    }

    /// Current in-memory token.
    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    // --- Network state ---

    /// Check the current network flag.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Apply an external network-state transition.
    ///
    /// Going from offline to online starts a background drain and returns
    /// its handle; every other transition returns None. Safe to call from
    /// threads outside a tokio runtime: the drain runs on the runtime the
    /// client was built in, and is skipped when there is none.
    pub fn set_online(&self, status: bool) -> Option<JoinHandle<DrainReport>> {
        let was_online = self.online.swap(status, Ordering::SeqCst);

        match (was_online, status) {
            (false, true) => {
                info!("Connectivity restored, draining offline queue");
                self.spawn_drain()
            }
            (true, false) => {
                warn!("Connectivity lost, deferring advisory requests");
                None
            }
            _ => None,
        }
    }

    fn spawn_drain(&self) -> Option<JoinHandle<DrainReport>> {
        let Some(runtime) = self.runtime.clone().or_else(|| Handle::try_current().ok()) else {
            warn!("No async runtime available, offline queue left for the next drain");
            return None;
        };
        let client = self.clone();
        Some(runtime.spawn(async move { client.process_queue().await }))
    }

    /// Replay every queued message through the online path.
    pub async fn process_queue(&self) -> DrainReport {
        self.queue.process_queue(self).await
    }

    /// Start a background task that checks backend health and feeds the result
    /// into [`set_online`](Self::set_online).
    ///
    /// Drains triggered here are awaited before the next check.
    pub fn start_connectivity_monitor(&self, interval: Duration) -> JoinHandle<()> {
        let client = self.clone();

        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;

                let reachable = client.transport.check_health().await;
                if let Some(drain) = client.set_online(reachable) {
                    match drain.await {
                        Ok(report) => debug!(
                            "Reconnect drain: {} of {} delivered",
                            report.delivered, report.attempted
                        ),
                        Err(e) => error!("Reconnect drain task failed: {}", e),
                    }
                }
            }
        })
    }

    // --- Dispatch ---

    /// Validate and send a request, or defer it when offline.
    ///
    /// Offline advisory questions are queued and reported as
    /// [`ClientError::Queued`]; other offline requests fail with
    /// [`ClientError::Offline`]. Online failures are returned as-is.
    pub async fn send(&self, request: ApiRequest) -> Result<Value, ClientError> {
        request.validate()?;

        if !self.is_online() {
            return match request.deferrable() {
                Some(query) => {
                    let message = self.queue.add_to_queue(query.clone()).await?;
                    Err(ClientError::Queued { id: message.id })
                }
                None => {
                    debug!("Offline, not sending {}", request.name());
                    Err(ClientError::Offline)
                }
            };
        }

        self.dispatch(&request).await
    }

    /// Perform the HTTP call regardless of the network flag.
    async fn dispatch(&self, request: &ApiRequest) -> Result<Value, ClientError> {
        let prepared = self.prepare(request).await;
        debug!("Sending {} {}", request.name(), prepared.path);

        let response = self.transport.execute(prepared).await?;
        check_envelope(response)
    }

    async fn prepare(&self, request: &ApiRequest) -> PreparedRequest {
        let mut headers = vec![("Accept".to_string(), "application/json".to_string())];
        if let Some(token) = self.token.read().await.as_deref() {
            headers.push(("Authorization".to_string(), format!("Bearer {}", token)));
        }

        PreparedRequest {
            method: request.method(),
            path: request.path(),
            headers,
            body: request.body(),
        }
    }

    async fn send_as<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ClientError> {
        let body = self.send(request).await?;
        Ok(serde_json::from_value(body)?)
    }

    // --- Endpoints ---

    /// Log in with a phone number and keep the returned token.
    pub async fn login(&self, phone: &str) -> Result<LoginResponse, ClientError> {
        let response: LoginResponse = self
            .send_as(ApiRequest::Login {
                phone: phone.to_string(),
            })
            .await?;
        self.set_token(&response.token).await;
        info!(user = %response.user.id, "Logged in");
        Ok(response)
    }

    /// Drop the session token.
    pub async fn logout(&self) {
        self.clear_token().await;
    }

    /// Ask for crop advice. Offline questions are queued.
    pub async fn ask(&self, query: AdvisoryQuery) -> Result<Advisory, ClientError> {
        let envelope: AdviceEnvelope = self.send_as(ApiRequest::Advice(query)).await?;
        Ok(envelope.advisory)
    }

    /// Send feedback about a previous advisory. Returns the server's acknowledgement.
    pub async fn feedback(&self, user_id: &str, feedback: &str) -> Result<String, ClientError> {
        let envelope: FeedbackEnvelope = self
            .send_as(ApiRequest::Feedback {
                user_id: user_id.to_string(),
                feedback: feedback.to_string(),
            })
            .await?;
        Ok(envelope.msg)
    }

    /// Upload a crop image for pest detection.
    pub async fn upload_image(&self, path: impl Into<PathBuf>) -> Result<PestDetection, ClientError> {
        let envelope: UploadEnvelope = self
            .send_as(ApiRequest::UploadImage { path: path.into() })
            .await?;
        Ok(envelope.result)
    }

    pub async fn market_prices(&self) -> Result<MarketPrices, ClientError> {
        let envelope: PricesEnvelope = self.send_as(ApiRequest::MarketPrices).await?;
        Ok(envelope.prices)
    }

    /// Short forecast for a pincode.
    pub async fn weather(&self, pincode: &str) -> Result<Forecast, ClientError> {
        let envelope: ForecastEnvelope = self
            .send_as(ApiRequest::PincodeWeather {
                pincode: pincode.to_string(),
            })
            .await?;
        Ok(envelope.forecast)
    }

    /// Current conditions at a coordinate.
    pub async fn current_weather(&self, lat: f64, lon: f64) -> Result<WeatherSummary, ClientError> {
        self.send_as(ApiRequest::CurrentWeather { lat, lon }).await
    }

    /// Daily outlook for up to a week at a coordinate.
    pub async fn weather_outlook(&self, lat: f64, lon: f64) -> Result<Vec<DayOutlook>, ClientError> {
        let envelope: OutlookEnvelope = self.send_as(ApiRequest::WeatherOutlook { lat, lon }).await?;
        Ok(envelope.days)
    }

    /// Regional farming news and advice for the current weather condition.
    pub async fn farm_news(&self, location: &str, condition: &str) -> Result<FarmNews, ClientError> {
        self.send_as(ApiRequest::FarmNews {
            location: location.to_string(),
            condition: condition.to_string(),
        })
        .await
    }

    /// Live mandi rates, optionally narrowed to a state and commodity.
    pub async fn mandi_rates(
        &self,
        state: Option<&str>,
        commodity: Option<&str>,
    ) -> Result<Vec<MarketRecord>, ClientError> {
        let envelope: MandiEnvelope = self
            .send_as(ApiRequest::MandiRates {
                state: state.map(str::to_string),
                commodity: commodity.map(str::to_string),
            })
            .await?;
        Ok(envelope.records)
    }

    /// Starter questions for `language`, falling back to the built-in list.
    pub async fn default_questions(&self, language: Language) -> Vec<String> {
        let request = ApiRequest::DefaultQuestions {
            language: language.code().to_string(),
        };
        match self.send_as::<QuestionsEnvelope>(request).await {
            Ok(envelope) if !envelope.questions.is_empty() => envelope.questions,
            Ok(_) => fallback(language),
            Err(e) => {
                debug!("Using fallback questions: {}", e);
                fallback(language)
            }
        }
    }

    // --- Accessors ---

    /// Get the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get the offline queue.
    pub fn queue(&self) -> &OfflineQueue {
        &self.queue
    }

    /// Get the backing store.
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }
}

#[async_trait]
impl Replayer for ApiClient {
    async fn replay(&self, message: &QueuedMessage) -> Result<(), ClientError> {
        self.dispatch(&ApiRequest::Advice(message.payload.clone()))
            .await
            .map(|_| ())
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("config", &self.config)
            .field("transport", &self.transport.name())
            .field("store", &self.store.name())
            .field("online", &self.is_online())
            .finish()
    }
}

fn fallback(language: Language) -> Vec<String> {
    catalog::fallback_questions(language)
        .iter()
        .map(|q| q.to_string())
        .collect()
}

/// Turn a raw response into the JSON envelope or an API error.
fn check_envelope(response: ApiResponse) -> Result<Value, ClientError> {
    let ApiResponse { status, body } = response;

    if !(200..300).contains(&status) {
        return Err(ClientError::Api {
            status,
            message: error_message(&body).unwrap_or_else(|| format!("HTTP {}", status)),
        });
    }

    if body.get("success").and_then(Value::as_bool) == Some(false) {
        return Err(ClientError::Api {
            status,
            message: error_message(&body).unwrap_or_else(|| "request failed".to_string()),
        });
    }

    Ok(body)
}

fn error_message(body: &Value) -> Option<String> {
    if let Value::String(text) = body {
        return (!text.is_empty()).then(|| text.clone());
    }
    ["error", "message", "err"]
        .iter()
        .find_map(|field| body.get(*field).and_then(Value::as_str))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_success() {
        let body = json!({ "success": true, "prices": {} });
        assert_eq!(check_envelope(ApiResponse::ok(body.clone())).unwrap(), body);
    }

    #[test]
    fn test_envelope_success_false() {
        let err = check_envelope(ApiResponse::ok(json!({
            "success": false,
            "message": "Phone required"
        })))
        .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Api { status: 200, ref message } if message == "Phone required"
        ));
    }

    #[test]
    fn test_envelope_http_status() {
        let err = check_envelope(ApiResponse::new(500, json!({ "success": false, "err": "boom" })))
            .unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 500, ref message } if message == "boom"));

        let err = check_envelope(ApiResponse::new(502, Value::String(String::new()))).unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 502, ref message } if message == "HTTP 502"));
    }

    #[test]
    fn test_envelope_without_success_field() {
        // The coordinate weather route answers without an envelope flag.
        let body = json!({ "location": "Delhi", "temperature": 31.0 });
        assert!(check_envelope(ApiResponse::ok(body)).is_ok());
    }
}
