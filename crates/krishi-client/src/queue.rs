//! Durable FIFO queue of advisory requests deferred while offline.
//!
//! The queue lives in the key-value store as a JSON array under
//! [`QUEUE_KEY`]. Every mutation is a read-modify-write that completes only
//! once the new array is stored, so a crash never loses an accepted message
//! and never drops one that was not delivered.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secure_store::keys::{DEAD_LETTER_KEY, QUEUE_KEY};
use secure_store::{KeyValueStore, StoreError};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::diagnostics::{Diagnostics, StorageFault, TracingDiagnostics};
use crate::error::ClientError;
use crate::types::AdvisoryQuery;

/// One deferred advisory request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedMessage {
    /// Creation-time-derived unique id.
    pub id: String,
    #[serde(flatten)]
    pub payload: AdvisoryQuery,
    /// Creation time, Unix milliseconds.
    pub timestamp: i64,
    /// Failed replay attempts so far.
    #[serde(default)]
    pub attempts: u32,
}

impl QueuedMessage {
    /// Stamp a payload with a fresh id and the current time.
    pub fn new(payload: AdvisoryQuery) -> Self {
        let timestamp = chrono::Utc::now().timestamp_millis();
        let suffix = Uuid::new_v4().simple().to_string();
        Self {
            id: format!("{}-{}", timestamp, &suffix[..8]),
            payload,
            timestamp,
            attempts: 0,
        }
    }
}

/// Sends one queued message during a drain.
#[async_trait]
pub trait Replayer: Send + Sync {
    async fn replay(&self, message: &QueuedMessage) -> Result<(), ClientError>;
}

/// Outcome of one drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Messages a replay was attempted for.
    pub attempted: usize,
    /// Messages delivered and removed.
    pub delivered: usize,
    /// Messages whose replay failed.
    pub failed: usize,
    /// Failed messages moved to the dead-letter list.
    pub dead_lettered: usize,
}

/// The offline queue.
pub struct OfflineQueue {
    store: Arc<dyn KeyValueStore>,
    diagnostics: Arc<dyn Diagnostics>,
    // Held for a whole drain so drains never interleave.
    drain_lock: Mutex<()>,
    // Held for each read-modify-write of the stored arrays.
    write_lock: Mutex<()>,
    replay_timeout: Option<Duration>,
    max_attempts: Option<u32>,
}

impl OfflineQueue {
    /// Create a queue over `store` with unbounded retries and no replay timeout.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            diagnostics: Arc::new(TracingDiagnostics),
            drain_lock: Mutex::new(()),
            write_lock: Mutex::new(()),
            replay_timeout: None,
            max_attempts: None,
        }
    }

    /// Report storage faults to `diagnostics`.
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Count a replay as failed once it runs longer than `timeout`.
    pub fn with_replay_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.replay_timeout = timeout;
        self
    }

    /// Move a message to the dead-letter list after `max` failed replays.
    pub fn with_max_attempts(mut self, max: Option<u32>) -> Self {
        self.max_attempts = max.map(|m| m.max(1));
        self
    }

    /// Append a message and persist it before returning.
    pub async fn add_to_queue(&self, payload: AdvisoryQuery) -> Result<QueuedMessage, StoreError> {
        let message = QueuedMessage::new(payload);

        let _guard = self.write_lock.lock().await;
        let mut queue = self.load_for_update(QUEUE_KEY).await?;
        queue.push(message.clone());
        self.persist(QUEUE_KEY, &queue).await?;

        info!(id = %message.id, pending = queue.len(), "Queued message for later delivery");
        Ok(message)
    }

    /// Snapshot of pending messages in replay order.
    ///
    /// Unreadable or corrupt storage yields an empty list (reported to diagnostics).
    pub async fn get_queue(&self) -> Vec<QueuedMessage> {
        self.load_or_empty(QUEUE_KEY).await
    }

    /// Number of pending messages.
    pub async fn len(&self) -> usize {
        self.get_queue().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Replay every pending message in FIFO order.
    ///
    /// A delivered message is removed immediately; a failed one stays in
    /// place (with its attempt count bumped) and the drain moves on.
    /// Concurrent calls wait for the running drain to finish. Messages removed
    /// from the store after the drain started (by [`clear_queue`](Self::clear_queue))
    /// are skipped.
    pub async fn process_queue(&self, replayer: &dyn Replayer) -> DrainReport {
        let _drain = self.drain_lock.lock().await;
        let mut report = DrainReport::default();

        let snapshot = self.get_queue().await;
        if snapshot.is_empty() {
            return report;
        }
        info!("Draining offline queue ({} pending)", snapshot.len());

        for message in snapshot {
            if !self.still_pending(&message.id).await {
                debug!(id = %message.id, "Skipping message no longer queued");
                continue;
            }
            report.attempted += 1;

            match self.replay_one(replayer, &message).await {
                Ok(()) => {
                    self.remove(&message.id).await;
                    report.delivered += 1;
                    debug!(id = %message.id, "Replayed queued message");
                }
                Err(e) => {
                    warn!(id = %message.id, "Failed to replay queued message: {}", e);
                    report.failed += 1;
                    if self.record_failure(&message.id).await {
                        report.dead_lettered += 1;
                    }
                }
            }
        }

        info!(
            "Drain finished: {} delivered, {} failed, {} dead-lettered",
            report.delivered, report.failed, report.dead_lettered
        );
        report
    }

    /// Remove every pending message.
    pub async fn clear_queue(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.store.delete(QUEUE_KEY).await.inspect_err(|e| {
            self.report(StorageFault::WriteFailed {
                key: QUEUE_KEY.to_string(),
                reason: e.to_string(),
            })
        })?;
        info!("Offline queue cleared");
        Ok(())
    }

    /// Messages that exhausted their replay attempts.
    pub async fn dead_letters(&self) -> Vec<QueuedMessage> {
        self.load_or_empty(DEAD_LETTER_KEY).await
    }

    /// Remove every dead-lettered message.
    pub async fn clear_dead_letters(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.store.delete(DEAD_LETTER_KEY).await
    }

    /// Move dead-lettered messages back to the end of the queue with a fresh
    /// attempt count. Returns how many were moved.
    pub async fn requeue_dead_letters(&self) -> Result<usize, StoreError> {
        let _guard = self.write_lock.lock().await;
        let dead = self.load_for_update(DEAD_LETTER_KEY).await?;
        if dead.is_empty() {
            return Ok(0);
        }

        let mut queue = self.load_for_update(QUEUE_KEY).await?;
        let moved = dead.len();
        queue.extend(dead.into_iter().map(|message| QueuedMessage {
            attempts: 0,
            ..message
        }));

        // Queue first: a crash in between duplicates rather than loses.
        self.persist(QUEUE_KEY, &queue).await?;
        self.store.delete(DEAD_LETTER_KEY).await?;
        Ok(moved)
    }

    async fn replay_one(
        &self,
        replayer: &dyn Replayer,
        message: &QueuedMessage,
    ) -> Result<(), ClientError> {
        match self.replay_timeout {
            Some(limit) => tokio::time::timeout(limit, replayer.replay(message))
                .await
                .unwrap_or_else(|_| Err(ClientError::Timeout(limit))),
            None => replayer.replay(message).await,
        }
    }

    /// Check the stored queue, not the drain snapshot. Unreadable storage
    /// counts as absent so the message waits for a later drain.
    async fn still_pending(&self, id: &str) -> bool {
        let _guard = self.write_lock.lock().await;
        match self.load_for_update(QUEUE_KEY).await {
            Ok(queue) => queue.iter().any(|message| message.id == id),
            Err(_) => false,
        }
    }

    async fn remove(&self, id: &str) {
        // On failure the message stays queued and is delivered again next drain.
        if let Err(e) = self.try_remove(id).await {
            warn!(id = %id, "Failed to remove delivered message: {}", e);
        }
    }

    async fn try_remove(&self, id: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut queue = self.load_for_update(QUEUE_KEY).await?;
        queue.retain(|message| message.id != id);
        self.persist(QUEUE_KEY, &queue).await
    }

    /// Bump the attempt count. Returns true if the message was dead-lettered.
    async fn record_failure(&self, id: &str) -> bool {
        self.try_record_failure(id).await.unwrap_or_else(|e| {
            warn!(id = %id, "Failed to record replay failure: {}", e);
            false
        })
    }

    async fn try_record_failure(&self, id: &str) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut queue = self.load_for_update(QUEUE_KEY).await?;
        let Some(index) = queue.iter().position(|message| message.id == id) else {
            return Ok(false);
        };
        queue[index].attempts += 1;

        let exhausted = self
            .max_attempts
            .is_some_and(|max| queue[index].attempts >= max);
        if !exhausted {
            self.persist(QUEUE_KEY, &queue).await?;
            return Ok(false);
        }

        let message = queue.remove(index);
        let mut dead = self.load_for_update(DEAD_LETTER_KEY).await?;
        warn!(id = %message.id, attempts = message.attempts, "Moving message to dead-letter list");
        dead.push(message);

        // Dead-letter list first: a crash in between duplicates rather than loses.
        self.persist(DEAD_LETTER_KEY, &dead).await?;
        self.persist(QUEUE_KEY, &queue).await?;
        Ok(true)
    }

    /// Read a stored list; corrupt data is reported and treated as empty,
    /// unreadable storage is an error so callers never overwrite it.
    async fn load_for_update(&self, key: &str) -> Result<Vec<QueuedMessage>, StoreError> {
        let raw = self.store.get(key).await.inspect_err(|e| {
            self.report(StorageFault::ReadFailed {
                key: key.to_string(),
                reason: e.to_string(),
            })
        })?;
        Ok(self.decode(key, raw))
    }

    async fn load_or_empty(&self, key: &str) -> Vec<QueuedMessage> {
        match self.store.get(key).await {
            Ok(raw) => self.decode(key, raw),
            Err(e) => {
                self.report(StorageFault::ReadFailed {
                    key: key.to_string(),
                    reason: e.to_string(),
                });
                Vec::new()
            }
        }
    }

    fn decode(&self, key: &str, raw: Option<String>) -> Vec<QueuedMessage> {
        let Some(raw) = raw else {
            return Vec::new();
        };
        match serde_json::from_str(&raw) {
            Ok(messages) => messages,
            Err(e) => {
                self.report(StorageFault::Corrupt {
                    key: key.to_string(),
                    reason: e.to_string(),
                });
                Vec::new()
            }
        }
    }

    async fn persist(&self, key: &str, messages: &[QueuedMessage]) -> Result<(), StoreError> {
        let json = serde_json::to_string(messages).map_err(|e| StoreError::InvalidValue {
            key: key.to_string(),
            reason: e.to_string(),
        })?;

        self.store.set(key, &json).await.inspect_err(|e| {
            self.report(StorageFault::WriteFailed {
                key: key.to_string(),
                reason: e.to_string(),
            })
        })
    }

    fn report(&self, fault: StorageFault) {
        self.diagnostics.storage_fault(&fault);
    }
}

impl std::fmt::Debug for OfflineQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineQueue")
            .field("store", &self.store.name())
            .field("replay_timeout", &self.replay_timeout)
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secure_store::MemoryStore;
    use std::sync::Mutex as StdMutex;

    /// Fails every message whose query is listed, records the replay order.
    struct FakeReplayer {
        failing: Vec<&'static str>,
        seen: StdMutex<Vec<String>>,
    }

    impl FakeReplayer {
        fn new(failing: Vec<&'static str>) -> Self {
            Self {
                failing,
                seen: StdMutex::new(Vec::new()),
            }
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Replayer for FakeReplayer {
        async fn replay(&self, message: &QueuedMessage) -> Result<(), ClientError> {
            self.seen.lock().unwrap().push(message.payload.query.clone());
            if self.failing.contains(&message.payload.query.as_str()) {
                Err(ClientError::Api {
                    status: 503,
                    message: "unavailable".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    fn payload(query: &str) -> AdvisoryQuery {
        AdvisoryQuery::new(query, "punjab", "en", "loamy")
    }

    fn queue_over(store: &MemoryStore) -> OfflineQueue {
        OfflineQueue::new(Arc::new(store.clone()))
    }

    fn queries(messages: &[QueuedMessage]) -> Vec<String> {
        messages.iter().map(|m| m.payload.query.clone()).collect()
    }

    #[tokio::test]
    async fn test_add_preserves_call_order() {
        let store = MemoryStore::new();
        let queue = queue_over(&store);
        for q in ["first", "second", "third"] {
            queue.add_to_queue(payload(q)).await.unwrap();
        }
        assert_eq!(queries(&queue.get_queue().await), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_ids_are_unique_for_rapid_adds() {
        let store = MemoryStore::new();
        let queue = queue_over(&store);
        for _ in 0..50 {
            queue.add_to_queue(payload("same")).await.unwrap();
        }
        let mut ids: Vec<_> = queue.get_queue().await.into_iter().map(|m| m.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 50);
    }

    #[tokio::test]
    async fn test_failed_message_keeps_position() {
        let store = MemoryStore::new();
        let queue = queue_over(&store);
        for q in ["A", "B", "C"] {
            queue.add_to_queue(payload(q)).await.unwrap();
        }

        let replayer = FakeReplayer::new(vec!["B"]);
        let report = queue.process_queue(&replayer).await;

        assert_eq!(replayer.seen(), vec!["A", "B", "C"]);
        assert_eq!(
            report,
            DrainReport {
                attempted: 3,
                delivered: 2,
                failed: 1,
                dead_lettered: 0
            }
        );
        let remaining = queue.get_queue().await;
        assert_eq!(queries(&remaining), vec!["B"]);
        assert_eq!(remaining[0].attempts, 1);
    }

    #[tokio::test]
    async fn test_empty_drain_is_noop() {
        let queue = queue_over(&MemoryStore::new());
        let replayer = FakeReplayer::new(vec![]);
        assert_eq!(queue.process_queue(&replayer).await, DrainReport::default());
        assert!(replayer.seen().is_empty());
    }

    #[tokio::test]
    async fn test_dead_letter_after_max_attempts() {
        let store = MemoryStore::new();
        let queue = queue_over(&store).with_max_attempts(Some(2));
        queue.add_to_queue(payload("poison")).await.unwrap();
        queue.add_to_queue(payload("fine")).await.unwrap();

        let replayer = FakeReplayer::new(vec!["poison"]);
        let first = queue.process_queue(&replayer).await;
        assert_eq!(first.dead_lettered, 0);
        assert_eq!(queries(&queue.get_queue().await), vec!["poison"]);

        let second = queue.process_queue(&replayer).await;
        assert_eq!(second.dead_lettered, 1);
        assert!(queue.is_empty().await);

        let dead = queue.dead_letters().await;
        assert_eq!(queries(&dead), vec!["poison"]);
        assert_eq!(dead[0].attempts, 2);

        assert_eq!(queue.requeue_dead_letters().await.unwrap(), 1);
        assert!(queue.dead_letters().await.is_empty());
        assert_eq!(queue.get_queue().await[0].attempts, 0);
    }

    #[tokio::test]
    async fn test_clear_queue() {
        let store = MemoryStore::new();
        let queue = queue_over(&store);
        queue.add_to_queue(payload("gone")).await.unwrap();
        queue.clear_queue().await.unwrap();
        assert!(queue.get_queue().await.is_empty());
        assert!(store.get(QUEUE_KEY).await.unwrap().is_none());
    }

    /// Clears the queue while replaying the first message.
    struct ClearingReplayer {
        queue: Arc<OfflineQueue>,
        seen: StdMutex<Vec<String>>,
    }

    #[async_trait]
    impl Replayer for ClearingReplayer {
        async fn replay(&self, message: &QueuedMessage) -> Result<(), ClientError> {
            let first = {
                let mut seen = self.seen.lock().unwrap();
                seen.push(message.payload.query.clone());
                seen.len() == 1
            };
            if first {
                self.queue.clear_queue().await.unwrap();
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_cleared_messages_are_not_replayed() {
        let store = MemoryStore::new();
        let queue = Arc::new(queue_over(&store));
        for q in ["A", "B", "C"] {
            queue.add_to_queue(payload(q)).await.unwrap();
        }

        let replayer = ClearingReplayer {
            queue: queue.clone(),
            seen: StdMutex::new(Vec::new()),
        };
        let report = queue.process_queue(&replayer).await;

        assert_eq!(*replayer.seen.lock().unwrap(), vec!["A"]);
        assert_eq!(report.attempted, 1);
        assert_eq!(report.delivered, 1);
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn test_corrupt_blob_reads_as_empty() {
        let store = MemoryStore::new();
        store.set(QUEUE_KEY, "{not json").await.unwrap();
        let queue = queue_over(&store);
        assert!(queue.get_queue().await.is_empty());

        // Accepting a new message replaces the unreadable blob.
        queue.add_to_queue(payload("fresh")).await.unwrap();
        assert_eq!(queries(&queue.get_queue().await), vec!["fresh"]);
    }

    #[test]
    fn test_legacy_record_without_attempts() {
        let raw = r#"[{"id":"1718000000000","query":"q?","location":"delhi","language":"hi","soilType":"clay","timestamp":1718000000000}]"#;
        let messages: Vec<QueuedMessage> = serde_json::from_str(raw).unwrap();
        assert_eq!(messages[0].attempts, 0);
        assert!(messages[0].payload.image_uri.is_none());
    }
}
