//! Secure Credential Storage using OS Keychain

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bridge_traits::{
    error::{BridgeError, Result},
    storage::SecureStore,
};
use keyring::Entry;
use tracing::{debug, error};

const DEFAULT_SERVICE_NAME: &str = "gymdesk-console";

/// Keyring-based secure storage implementation
///
/// Uses platform-specific secure storage:
/// - macOS: Keychain
/// - Windows: Credential Manager (DPAPI)
/// - Linux: Secret Service (libsecret)
///
/// Keyring entries are strings, so values are stored base64-encoded.
pub struct KeyringSecureStore {
    service_name: String,
}

impl KeyringSecureStore {
    /// Create a new secure store with default service name
    pub fn new() -> Self {
        Self::with_service_name(DEFAULT_SERVICE_NAME)
    }

    /// Create a new secure store with custom service name
    pub fn with_service_name(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Entry::new(&self.service_name, key).map_err(Self::map_keyring_error)
    }

    fn map_keyring_error(e: keyring::Error) -> BridgeError {
        BridgeError::Storage(format!("Keyring error: {}", e))
    }
}

impl Default for KeyringSecureStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecureStore for KeyringSecureStore {
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()> {
        self.entry(key)?
            .set_password(&STANDARD.encode(value))
            .map_err(Self::map_keyring_error)?;

        debug!(key = key, "Stored secret in keyring");
        Ok(())
    }

    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.entry(key)?.get_password() {
            Ok(encoded) => {
                let decoded = STANDARD.decode(encoded).map_err(|e| {
                    error!(key = key, error = %e, "Failed to decode secret");
                    BridgeError::Storage(format!("Failed to decode secret: {}", e))
                })?;
                Ok(Some(decoded))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(Self::map_keyring_error(e)),
        }
    }

    async fn delete_secret(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(_) => {
                debug!(key = key, "Deleted secret from keyring");
                Ok(())
            }
            // Already gone
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(Self::map_keyring_error(e)),
        }
    }

    async fn has_secret(&self, key: &str) -> Result<bool> {
        match self.entry(key)?.get_password() {
            Ok(_) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(e) => Err(Self::map_keyring_error(e)),
        }
    }
}
