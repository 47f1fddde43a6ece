//! Offline queue behaviour through the public client API.

use std::sync::Arc;
use std::time::Duration;

use krishi_client::{
    AdvisoryQuery, ApiClient, ApiRequest, ClientConfig, ClientError, KeyValueStore, OfflineQueue,
    QueuedMessage, StorageFault,
};
use mock_backend::{DelayedTransport, FaultyStore, RecordingDiagnostics, RecordingTransport};
use secure_store::keys::{DEAD_LETTER_KEY, QUEUE_KEY};
use secure_store::{MemoryStore, SqliteStore};

fn question(text: &str) -> AdvisoryQuery {
    AdvisoryQuery::new(text, "punjab", "en", "loamy")
}

fn offline_client(store: Arc<dyn KeyValueStore>, transport: RecordingTransport) -> ApiClient {
    ApiClient::builder(ClientConfig::default(), store)
        .transport(Arc::new(transport))
        .online(false)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_offline_advice_is_queued_not_sent() {
    let transport = RecordingTransport::new();
    let client = offline_client(Arc::new(MemoryStore::new()), transport.clone());

    let err = client.ask(question("Which wheat variety?")).await.unwrap_err();
    assert!(err.is_queued());
    assert!(transport.requests().is_empty());

    let queue = client.queue().get_queue().await;
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].payload.query, "Which wheat variety?");
    assert_eq!(queue[0].attempts, 0);
}

#[tokio::test]
async fn test_drain_keeps_only_failed_messages_in_order() {
    let transport = RecordingTransport::new().fail_queries(&["B?!"]);
    let client = offline_client(Arc::new(MemoryStore::new()), transport.clone());

    for text in ["A?!", "B?!", "C?!"] {
        assert!(client.ask(question(text)).await.unwrap_err().is_queued());
    }

    let report = client.set_online(true).unwrap().await.unwrap();
    assert_eq!(report.attempted, 3);
    assert_eq!(report.delivered, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(transport.sent_queries(), vec!["A?!", "B?!", "C?!"]);

    let remaining = client.queue().get_queue().await;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].payload.query, "B?!");
    assert_eq!(remaining[0].attempts, 1);

    transport.heal();
    let report = client.process_queue().await;
    assert_eq!(report.delivered, 1);
    assert!(client.queue().is_empty().await);
}

#[tokio::test]
async fn test_ids_are_unique_and_order_is_preserved() {
    let client = offline_client(Arc::new(MemoryStore::new()), RecordingTransport::new());

    for i in 0..20 {
        let _ = client.ask(question(&format!("question {}", i))).await;
    }

    let queue = client.queue().get_queue().await;
    let mut ids: Vec<&str> = queue.iter().map(|m| m.id.as_str()).collect();
    let queries: Vec<String> = queue.iter().map(|m| m.payload.query.clone()).collect();
    assert_eq!(
        queries,
        (0..20).map(|i| format!("question {}", i)).collect::<Vec<_>>()
    );

    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 20);
}

#[tokio::test]
async fn test_invalid_query_is_rejected_before_queueing() {
    let client = offline_client(Arc::new(MemoryStore::new()), RecordingTransport::new());

    let err = client
        .send(ApiRequest::Advice(AdvisoryQuery::new("hi", "punjab", "en", "loamy")))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));

    let err = client
        .send(ApiRequest::Advice(AdvisoryQuery::new(
            "What to sow?",
            "punjab",
            "fr",
            "loamy",
        )))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
    assert!(client.queue().is_empty().await);
}

#[tokio::test]
async fn test_offline_reads_are_not_queued() {
    let transport = RecordingTransport::new();
    let client = offline_client(Arc::new(MemoryStore::new()), transport.clone());

    let err = client.market_prices().await.unwrap_err();
    assert!(matches!(err, ClientError::Offline));
    assert!(err.is_connectivity());
    assert!(client.login("9876543210").await.is_err());
    assert!(transport.requests().is_empty());
    assert!(client.queue().is_empty().await);
}

#[tokio::test]
async fn test_online_failure_is_not_queued() {
    let transport = RecordingTransport::new().fail_queries(&["Will it rain?"]);
    let client = ApiClient::builder(ClientConfig::default(), Arc::new(MemoryStore::new()))
        .transport(Arc::new(transport))
        .build()
        .unwrap();

    let err = client.ask(question("Will it rain?")).await.unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 503, .. }));
    assert!(client.queue().is_empty().await);
}

#[tokio::test]
async fn test_queue_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}?mode=rwc", dir.path().join("krishi.db").display());

    {
        let store = SqliteStore::connect(&url).await.unwrap();
        store.migrate().await.unwrap();
        let client = offline_client(Arc::new(store.clone()), RecordingTransport::new());
        let _ = client.ask(question("first question")).await;
        let _ = client.ask(question("second question")).await;
        store.close().await;
    }

    let store = SqliteStore::connect(&url).await.unwrap();
    store.migrate().await.unwrap();
    let transport = RecordingTransport::new();
    let client = offline_client(Arc::new(store), transport.clone());

    let restored = client.queue().get_queue().await;
    assert_eq!(restored.len(), 2);
    assert_eq!(restored[0].payload.query, "first question");

    client.set_online(true).unwrap().await.unwrap();
    assert_eq!(transport.sent_queries(), vec!["first question", "second question"]);
    assert!(client.queue().is_empty().await);
}

#[tokio::test]
async fn test_stored_format_round_trips() {
    let store = MemoryStore::new();
    let queue = OfflineQueue::new(Arc::new(store.clone()));

    let added = queue
        .add_to_queue(question("How much urea?").with_image("file:///leaf.jpg"))
        .await
        .unwrap();

    let raw = store.get(QUEUE_KEY).await.unwrap().unwrap();
    let stored: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(stored[0]["id"], added.id.as_str());
    assert_eq!(stored[0]["query"], "How much urea?");
    assert_eq!(stored[0]["soilType"], "loamy");
    assert_eq!(stored[0]["imageUri"], "file:///leaf.jpg");

    let decoded: Vec<QueuedMessage> = serde_json::from_str(&raw).unwrap();
    assert_eq!(decoded, vec![added]);
}

#[tokio::test]
async fn test_concurrent_drains_replay_each_message_once() {
    let transport = RecordingTransport::new();
    let delayed = DelayedTransport::with_millis(transport.clone(), 20);
    let client = ApiClient::builder(ClientConfig::default(), Arc::new(MemoryStore::new()))
        .transport(Arc::new(delayed))
        .online(false)
        .build()
        .unwrap();

    for text in ["one?", "two?", "three?"] {
        let _ = client.ask(question(text)).await;
    }
    let spawned = client.set_online(true).unwrap();

    let (spawned, a, b) = tokio::join!(spawned, client.process_queue(), client.process_queue());
    let delivered = spawned.unwrap().delivered + a.delivered + b.delivered;

    assert_eq!(delivered, 3);
    assert_eq!(transport.sent_queries(), vec!["one?", "two?", "three?"]);
    assert!(client.queue().is_empty().await);
}

#[tokio::test]
async fn test_slow_replay_times_out_and_stays_queued() {
    let transport = RecordingTransport::new();
    let delayed = DelayedTransport::with_millis(transport.clone(), 500);
    let config = ClientConfig::default().with_replay_timeout(Duration::from_millis(50));
    let client = ApiClient::builder(config, Arc::new(MemoryStore::new()))
        .transport(Arc::new(delayed))
        .online(false)
        .build()
        .unwrap();

    let _ = client.ask(question("slow question")).await;
    let report = client.set_online(true).unwrap().await.unwrap();

    assert_eq!(report.failed, 1);
    let queue = client.queue().get_queue().await;
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].attempts, 1);
}

#[tokio::test]
async fn test_dead_letters_after_max_attempts() {
    let transport = RecordingTransport::new().fail_queries(&["doomed?"]);
    let store = MemoryStore::new();
    let config = ClientConfig::default().with_max_replay_attempts(2);
    let client = ApiClient::builder(config, Arc::new(store.clone()))
        .transport(Arc::new(transport.clone()))
        .online(false)
        .build()
        .unwrap();

    let _ = client.ask(question("doomed?")).await;
    client.set_online(true).unwrap().await.unwrap();
    assert_eq!(client.queue().len().await, 1);

    let report = client.process_queue().await;
    assert_eq!(report.dead_lettered, 1);
    assert!(client.queue().is_empty().await);
    assert!(store.get(DEAD_LETTER_KEY).await.unwrap().is_some());

    transport.heal();
    assert_eq!(client.queue().requeue_dead_letters().await.unwrap(), 1);
    assert!(client.queue().dead_letters().await.is_empty());
    assert_eq!(client.process_queue().await.delivered, 1);
}

#[tokio::test]
async fn test_corrupt_queue_is_reported_and_replaced() {
    let store = MemoryStore::new();
    store.set(QUEUE_KEY, "{not json").await.unwrap();
    let diagnostics = RecordingDiagnostics::new();
    let client = ApiClient::builder(ClientConfig::default(), Arc::new(store.clone()))
        .transport(Arc::new(RecordingTransport::new()))
        .diagnostics(Arc::new(diagnostics.clone()))
        .online(false)
        .build()
        .unwrap();

    assert!(client.queue().get_queue().await.is_empty());
    assert!(diagnostics
        .faults()
        .iter()
        .any(|f| matches!(f, StorageFault::Corrupt { key, .. } if key == QUEUE_KEY)));

    let _ = client.ask(question("fresh question")).await;
    assert_eq!(client.queue().len().await, 1);
}

#[tokio::test]
async fn test_unreadable_store_fails_enqueue_without_losing_data() {
    let backing = MemoryStore::new();
    let store = FaultyStore::wrap(backing.clone());
    let diagnostics = RecordingDiagnostics::new();
    let client = ApiClient::builder(ClientConfig::default(), Arc::new(store.clone()))
        .transport(Arc::new(RecordingTransport::new()))
        .diagnostics(Arc::new(diagnostics.clone()))
        .online(false)
        .build()
        .unwrap();

    let _ = client.ask(question("kept question")).await;
    store.fail_reads(true);

    let err = client.ask(question("lost question")).await.unwrap_err();
    assert!(matches!(err, ClientError::Store(_)));
    assert!(client.queue().get_queue().await.is_empty());
    assert!(!diagnostics.faults().is_empty());
    let stored = backing.get(QUEUE_KEY).await.unwrap().unwrap();
    assert!(stored.contains("kept question"));
    assert!(!stored.contains("lost question"));

    store.fail_reads(false);
    let queue = client.queue().get_queue().await;
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].payload.query, "kept question");
}

#[tokio::test]
async fn test_clear_queue() {
    let client = offline_client(Arc::new(MemoryStore::new()), RecordingTransport::new());
    let _ = client.ask(question("to be cleared")).await;

    client.queue().clear_queue().await.unwrap();
    assert!(client.queue().is_empty().await);
    assert_eq!(client.process_queue().await.attempted, 0);
}

#[test]
fn test_reconnect_outside_runtime_does_not_drain() {
    let store = MemoryStore::new();
    let client = offline_client(Arc::new(store.clone()), RecordingTransport::new());

    assert!(client.set_online(true).is_none());
    assert!(client.is_online());
    assert!(client.set_online(false).is_none());
}

#[test]
fn test_reconnect_from_foreign_thread_drains_on_build_runtime() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let transport = RecordingTransport::new();
    let client = {
        let _entered = runtime.enter();
        offline_client(Arc::new(MemoryStore::new()), transport.clone())
    };

    let err = runtime
        .block_on(client.ask(question("Queued before reconnect")))
        .unwrap_err();
    assert!(err.is_queued());

    let drain = std::thread::spawn(move || client.set_online(true))
        .join()
        .unwrap()
        .unwrap();
    let report = runtime.block_on(drain).unwrap();

    assert_eq!(report.delivered, 1);
    assert_eq!(transport.sent_queries(), vec!["Queued before reconnect"]);
}
