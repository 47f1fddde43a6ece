//! Recording transport - answers from canned responses and remembers every request.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use krishi_client::{ApiResponse, ClientError, PreparedRequest, Transport};
use serde_json::{json, Value};

type FailurePredicate = Arc<dyn Fn(&PreparedRequest) -> bool + Send + Sync>;

/// A transport that never touches the network.
///
/// Requests are matched against registered path prefixes (first match wins);
/// unmatched requests get `{"success": true}`. A failure predicate turns
/// matching requests into `503` responses.
#[derive(Clone)]
pub struct RecordingTransport {
    routes: Arc<Mutex<Vec<(String, ApiResponse)>>>,
    fail_when: Arc<Mutex<Option<FailurePredicate>>>,
    requests: Arc<Mutex<Vec<PreparedRequest>>>,
    reachable: Arc<AtomicBool>,
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingTransport {
    /// Create a transport that accepts everything.
    pub fn new() -> Self {
        Self {
            routes: Arc::new(Mutex::new(Vec::new())),
            fail_when: Arc::new(Mutex::new(None)),
            requests: Arc::new(Mutex::new(Vec::new())),
            reachable: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Answer requests whose path starts with `prefix` with `body` (status 200).
    pub fn respond(self, prefix: impl Into<String>, body: Value) -> Self {
        self.respond_with(prefix, ApiResponse::ok(body))
    }

    /// Answer requests whose path starts with `prefix` with `response`.
    pub fn respond_with(self, prefix: impl Into<String>, response: ApiResponse) -> Self {
        self.routes
            .lock()
            .unwrap()
            .push((prefix.into(), response));
        self
    }

    /// Fail every request matching `predicate` with a 503.
    pub fn fail_when<F>(self, predicate: F) -> Self
    where
        F: Fn(&PreparedRequest) -> bool + Send + Sync + 'static,
    {
        *self.fail_when.lock().unwrap() = Some(Arc::new(predicate));
        self
    }

    /// Fail advisory requests whose `query` is one of `queries`.
    pub fn fail_queries(self, queries: &[&str]) -> Self {
        let queries: Vec<String> = queries.iter().map(|q| q.to_string()).collect();
        self.fail_when(move |request| {
            request
                .json()
                .and_then(|body| body.get("query"))
                .and_then(Value::as_str)
                .is_some_and(|query| queries.iter().any(|q| q == query))
        })
    }

    /// Stop failing requests.
    pub fn heal(&self) {
        *self.fail_when.lock().unwrap() = None;
    }

    /// Set what [`Transport::check_health`] reports.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Every request executed so far, in order.
    pub fn requests(&self) -> Vec<PreparedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// The most recent request.
    pub fn last_request(&self) -> Option<PreparedRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    /// `query` fields of advisory requests executed so far, in order.
    pub fn sent_queries(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter_map(|request| request.json()?.get("query")?.as_str().map(str::to_string))
            .collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn execute(&self, request: PreparedRequest) -> Result<ApiResponse, ClientError> {
        self.requests.lock().unwrap().push(request.clone());

        let failing = self
            .fail_when
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|predicate| predicate(&request));
        if failing {
            return Ok(ApiResponse::new(
                503,
                json!({ "success": false, "error": "service unavailable" }),
            ));
        }

        let response = self
            .routes
            .lock()
            .unwrap()
            .iter()
            .find(|(prefix, _)| request.path.starts_with(prefix.as_str()))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| ApiResponse::ok(json!({ "success": true })));

        Ok(response)
    }

    async fn check_health(&self) -> bool {
        self.reachable.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "RecordingTransport"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use krishi_client::{Method, RequestBody};

    fn post(path: &str, body: Value) -> PreparedRequest {
        PreparedRequest {
            method: Method::Post,
            path: path.to_string(),
            headers: Vec::new(),
            body: RequestBody::Json(body),
        }
    }

    #[tokio::test]
    async fn test_default_and_routed_responses() {
        let transport = RecordingTransport::new().respond("/api/misc", json!({ "success": true, "prices": {} }));

        let routed = transport.execute(post("/api/misc/market-prices", json!({}))).await.unwrap();
        assert!(routed.body.get("prices").is_some());

        let fallback = transport.execute(post("/api/advice", json!({}))).await.unwrap();
        assert_eq!(fallback.body, json!({ "success": true }));
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_fail_queries_and_heal() {
        let transport = RecordingTransport::new().fail_queries(&["B"]);

        let failed = transport.execute(post("/api/advice", json!({ "query": "B" }))).await.unwrap();
        assert_eq!(failed.status, 503);
        let ok = transport.execute(post("/api/advice", json!({ "query": "A" }))).await.unwrap();
        assert_eq!(ok.status, 200);

        transport.heal();
        let healed = transport.execute(post("/api/advice", json!({ "query": "B" }))).await.unwrap();
        assert_eq!(healed.status, 200);
        assert_eq!(transport.sent_queries(), vec!["B", "A", "B"]);
    }

    #[tokio::test]
    async fn test_health_follows_reachable_flag() {
        let transport = RecordingTransport::new();
        assert!(transport.check_health().await);
        transport.set_reachable(false);
        assert!(!transport.check_health().await);
    }
}
