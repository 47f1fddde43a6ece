//! Persistent key-value storage for the Krishi client.
//!
//! Holds the auth token, the offline request queue and single-value
//! preferences as string blobs. Two implementations are provided:
//!
//! - [`SqliteStore`] - durable storage using SQLx with SQLite
//! - [`MemoryStore`] - volatile storage for tests and ephemeral sessions
//!
//! # Example
//!
//! ```no_run
//! use secure_store::{keys, KeyValueStore, SqliteStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = SqliteStore::connect("sqlite:krishi.db?mode=rwc").await?;
//!     store.migrate().await?;
//!
//!     store.set(keys::TOKEN_KEY, "tok1").await?;
//!     assert_eq!(store.get(keys::TOKEN_KEY).await?.as_deref(), Some("tok1"));
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod keys;
pub mod memory;
pub mod models;
pub mod preference;
mod trait_def;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use models::Entry;
pub use preference::PreferenceKey;
pub use trait_def::KeyValueStore;

// Re-export async_trait for implementors
pub use async_trait::async_trait;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// SQLite-backed store.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Default pool size. Writes are small and serialized by SQLite anyway.
    const DEFAULT_POOL_SIZE: u32 = 4;

    /// Connect to a SQLite database.
    ///
    /// The URL should be in the format `sqlite:path/to/krishi.db?mode=rwc`.
    /// For an in-memory database use [`SqliteStore::in_memory`], since every
    /// pooled connection to `sqlite::memory:` would see its own database.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    /// Connect to a SQLite database with a custom pool size.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await?;

        tracing::info!("Connected to store: {} (pool size: {})", url, pool_size);

        Ok(Self { pool })
    }

    /// Open a migrated in-memory store on a single connection.
    pub async fn in_memory() -> Result<Self> {
        let store = Self::connect_with_pool_size("sqlite::memory:", 1).await?;
        store.migrate().await?;
        Ok(store)
    }

    /// Run store migrations.
    ///
    /// This should be called once after connecting to ensure the schema is up to date.
    pub async fn migrate(&self) -> Result<()> {
        tracing::debug!("Running store migrations...");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Fetch a full entry including its update timestamp.
    pub async fn entry(&self, key: &str) -> Result<Option<Entry>> {
        let entry = sqlx::query_as::<_, Entry>(
            r#"
            SELECT key, value, updated_at
            FROM kv_entries
            WHERE key = ?
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    /// List all stored keys in lexical order.
    pub async fn keys(&self) -> Result<Vec<String>> {
        let keys = sqlx::query_scalar::<_, String>(
            r#"
            SELECT key FROM kv_entries ORDER BY key
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(keys)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let value = sqlx::query_scalar::<_, String>(
            r#"
            SELECT value FROM kv_entries WHERE key = ?
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO kv_entries (key, value)
            VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = datetime('now')
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query(
            r#"
            DELETE FROM kv_entries WHERE key = ?
            "#,
        )
        .bind(key)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn name(&self) -> &str {
        "SqliteStore"
    }
}
