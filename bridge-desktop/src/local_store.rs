//! Durable local storage using SQLite

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::LocalStore,
};
use sqlx::{
    sqlite::{SqlitePool, SqlitePoolOptions},
    Row,
};
use std::path::PathBuf;
use tracing::{debug, error};

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS local_store (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        value_type TEXT NOT NULL,
        updated_at INTEGER NOT NULL
    )
"#;

/// SQLite-backed [`LocalStore`]
///
/// Each key keeps the type it was written with; reading a string key as an
/// integer is an error rather than a silent coercion.
pub struct SqliteLocalStore {
    pool: SqlitePool,
}

impl SqliteLocalStore {
    /// Open (or create) the store at the given database path
    pub async fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(BridgeError::Io)?;
        }

        // SQLite URLs want forward slashes
        let path_str = db_path.to_string_lossy().replace('\\', "/");
        let db_url = format!("sqlite://{}?mode=rwc", path_str);

        let store = Self::connect(&db_url, 4).await?;
        debug!(path = ?db_path, "Initialized local store");
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    ///
    /// Every SQLite connection gets its own in-memory database, so the pool is
    /// pinned to a single connection that is never recycled.
    pub async fn in_memory() -> Result<Self> {
        Self::connect("sqlite::memory:", 1).await
    }

    async fn connect(db_url: &str, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(db_url)
            .await
            .map_err(|e| BridgeError::Storage(format!("Failed to connect to DB: {}", e)))?;

        sqlx::query(CREATE_TABLE)
            .execute(&pool)
            .await
            .map_err(|e| BridgeError::Storage(format!("Failed to create table: {}", e)))?;

        Ok(Self { pool })
    }

    async fn set_value(&self, key: &str, value: &str, value_type: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO local_store (key, value, value_type, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                value_type = excluded.value_type,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(value_type)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| BridgeError::Storage(format!("Failed to write '{}': {}", key, e)))?;

        debug!(key = key, value_type = value_type, "Stored value");
        Ok(())
    }

    async fn get_value(&self, key: &str, expected_type: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value, value_type FROM local_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| BridgeError::Storage(format!("Failed to read '{}': {}", key, e)))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let value: String = row.get(0);
        let value_type: String = row.get(1);

        if value_type != expected_type {
            error!(
                key = key,
                expected = expected_type,
                actual = %value_type,
                "Type mismatch"
            );
            return Err(BridgeError::Storage(format!(
                "Type mismatch for '{}': expected {}, got {}",
                key, expected_type, value_type
            )));
        }

        Ok(Some(value))
    }
}

#[async_trait]
impl LocalStore for SqliteLocalStore {
    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.set_value(key, value, "string").await
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        self.get_value(key, "string").await
    }

    async fn set_i64(&self, key: &str, value: i64) -> Result<()> {
        self.set_value(key, &value.to_string(), "i64").await
    }

    async fn get_i64(&self, key: &str) -> Result<Option<i64>> {
        match self.get_value(key, "i64").await? {
            Some(s) => Ok(Some(s.parse().map_err(|e| {
                BridgeError::Storage(format!("Parse error for '{}': {}", key, e))
            })?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM local_store WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| BridgeError::Storage(format!("Failed to delete '{}': {}", key, e)))?;

        debug!(key = key, "Deleted value");
        Ok(())
    }

    async fn has_key(&self, key: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM local_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| BridgeError::Storage(format!("Failed to check key: {}", e)))?;

        Ok(row.is_some())
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT key FROM local_store ORDER BY key")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| BridgeError::Storage(format!("Failed to list keys: {}", e)))?;

        Ok(rows.into_iter().map(|row| row.get(0)).collect())
    }
}
