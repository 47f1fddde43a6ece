//! On-disk durability tests for SqliteStore.

use secure_store::{keys, KeyValueStore, SqliteStore};

fn db_url(dir: &tempfile::TempDir) -> String {
    format!("sqlite:{}?mode=rwc", dir.path().join("krishi.db").display())
}

#[tokio::test]
async fn test_values_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let url = db_url(&dir);

    let store = SqliteStore::connect(&url).await.unwrap();
    store.migrate().await.unwrap();
    store.set(keys::TOKEN_KEY, "tok1").await.unwrap();
    store
        .set(keys::QUEUE_KEY, r#"[{"id":"1","query":"when to sow wheat"}]"#)
        .await
        .unwrap();
    store.close().await;

    let reopened = SqliteStore::connect(&url).await.unwrap();
    reopened.migrate().await.unwrap();
    assert_eq!(reopened.get(keys::TOKEN_KEY).await.unwrap().as_deref(), Some("tok1"));
    assert_eq!(
        reopened.get(keys::QUEUE_KEY).await.unwrap().as_deref(),
        Some(r#"[{"id":"1","query":"when to sow wheat"}]"#)
    );
}

#[tokio::test]
async fn test_migrate_is_repeatable() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::connect(&db_url(&dir)).await.unwrap();
    store.migrate().await.unwrap();
    store.migrate().await.unwrap();
    assert!(store.keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let url = db_url(&dir);

    let store = SqliteStore::connect(&url).await.unwrap();
    store.migrate().await.unwrap();
    store.set(keys::TOKEN_KEY, "tok1").await.unwrap();
    store.delete(keys::TOKEN_KEY).await.unwrap();
    store.close().await;

    let reopened = SqliteStore::connect(&url).await.unwrap();
    assert!(reopened.get(keys::TOKEN_KEY).await.unwrap().is_none());
}
