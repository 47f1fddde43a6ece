//! Delayed transport - wraps another transport with artificial latency.

use std::time::Duration;

use async_trait::async_trait;
use krishi_client::{ApiResponse, ClientError, PreparedRequest, Transport};
use tokio::time::sleep;

/// A transport that waits before delegating every request.
///
/// Useful for testing replay timeouts and slow networks.
pub struct DelayedTransport<T: Transport> {
    inner: T,
    delay: Duration,
}

impl<T: Transport> DelayedTransport<T> {
    /// Wrap `inner`, delaying each request by `delay`.
    pub fn new(inner: T, delay: Duration) -> Self {
        Self { inner, delay }
    }

    /// Wrap `inner` with a delay in milliseconds.
    pub fn with_millis(inner: T, millis: u64) -> Self {
        Self::new(inner, Duration::from_millis(millis))
    }
}

#[async_trait]
impl<T: Transport> Transport for DelayedTransport<T> {
    async fn execute(&self, request: PreparedRequest) -> Result<ApiResponse, ClientError> {
        sleep(self.delay).await;
        self.inner.execute(request).await
    }

    async fn check_health(&self) -> bool {
        self.inner.check_health().await
    }

    fn name(&self) -> &str {
        "DelayedTransport"
    }
}
