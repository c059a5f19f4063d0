//! Storage Abstractions
//!
//! Provides platform-agnostic traits for durable key-value storage (the
//! browser's `localStorage` equivalent) and secure credential storage.

use async_trait::async_trait;

use crate::error::Result;

/// Durable key-value storage trait
///
/// Abstracts platform-specific local storage:
/// - Web: `localStorage`
/// - Desktop: SQLite-backed key-value table
/// - Tests / headless hosts: in-memory map
///
/// Values survive application restarts. The session core mirrors its minimal
/// session record here and clears it in full on sign-out.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::LocalStore;
///
/// async fn remember_login(store: &dyn LocalStore, started_at_ms: i64) -> Result<()> {
///     store.set_i64("sessionStartedAt", started_at_ms).await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Store a string value
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a string value
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Store an integer value
    async fn set_i64(&self, key: &str, value: i64) -> Result<()>;

    /// Retrieve an integer value
    async fn get_i64(&self, key: &str) -> Result<Option<i64>>;

    /// Delete a key. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if a key exists
    async fn has_key(&self, key: &str) -> Result<bool>;

    /// List all keys
    async fn list_keys(&self) -> Result<Vec<String>>;
}

/// Secure credential storage trait
///
/// Abstracts secure storage mechanisms:
/// - macOS/iOS: Keychain
/// - Windows: DPAPI
/// - Linux: Secret Service / libsecret
/// - Web: WebCrypto + encrypted IndexedDB
///
/// The identity adapter keeps its long-lived refresh token here; the bearer
/// credential itself lives in the session record.
///
/// # Security Requirements
///
/// Implementations MUST:
/// - Encrypt data at rest
/// - Never log or expose sensitive data
#[async_trait]
pub trait SecureStore: Send + Sync {
    /// Store a secret value, overwriting any previous value
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Retrieve a secret value
    ///
    /// Returns `Ok(None)` if the key doesn't exist.
    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Delete a secret
    async fn delete_secret(&self, key: &str) -> Result<()>;

    /// Check if a secret exists without retrieving it
    async fn has_secret(&self, key: &str) -> Result<bool> {
        Ok(self.get_secret(key).await?.is_some())
    }
}
