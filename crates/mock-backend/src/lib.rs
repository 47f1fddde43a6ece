//! Test doubles for the Krishi client.
//!
//! - `RecordingTransport` - canned responses, scripted failures, request log
//! - `DelayedTransport` - wraps another transport with artificial latency
//! - `FaultyStore` - in-memory store with switchable read/write failures
//! - `RecordingDiagnostics` - collects reported storage faults
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use krishi_client::{AdvisoryQuery, ApiClient, ClientConfig};
//! use mock_backend::RecordingTransport;
//! use secure_store::MemoryStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), krishi_client::ClientError> {
//!     let transport = RecordingTransport::new().fail_queries(&["Is it going to rain?"]);
//!     let client = ApiClient::builder(ClientConfig::default(), Arc::new(MemoryStore::new()))
//!         .transport(Arc::new(transport.clone()))
//!         .build()?;
//!
//!     let query = AdvisoryQuery::new("Is it going to rain?", "delhi", "en", "loamy");
//!     assert!(client.send(krishi_client::ApiRequest::Advice(query)).await.is_err());
//!     assert_eq!(transport.requests().len(), 1);
//!     Ok(())
//! }
//! ```

mod delayed;
mod diagnostics;
mod faulty_store;
mod recording;

pub use delayed::DelayedTransport;
pub use diagnostics::RecordingDiagnostics;
pub use faulty_store::FaultyStore;
pub use recording::RecordingTransport;
