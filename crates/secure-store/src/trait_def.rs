//! The KeyValueStore trait definition.

use async_trait::async_trait;

use crate::error::Result;

/// A string-keyed blob store.
///
/// Implementations must make `set` and `delete` durable before returning:
/// callers treat a completed write as surviving process termination.
/// This trait is object-safe and is normally shared as `Arc<dyn KeyValueStore>`.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Get a human-readable name for this store implementation.
    fn name(&self) -> &str;
}
