//! Identity Token Storage
//!
//! Keeps the identity service's long-lived refresh token in the platform
//! secure store so the provider can resume its own session after a restart.
//!
//! ## Security Features
//!
//! - Tokens are never logged or exposed in error messages
//! - Storage goes through the platform `SecureStore` (Keychain, DPAPI, Secret Service)
//! - Corrupted entries are deleted on read
//!
//! ## Example
//!
//! ```no_run
//! use core_auth::{IdentityTokenStore, StoredIdentity};
//! use std::sync::Arc;
//! # use bridge_traits::storage::SecureStore;
//! # async fn example(secure_store: Arc<dyn SecureStore>) -> core_auth::Result<()> {
//! let token_store = IdentityTokenStore::new(secure_store);
//!
//! token_store
//!     .store(&StoredIdentity::new("uid-1", "refresh-token"))
//!     .await?;
//!
//! let identity = token_store.load().await?;
//! assert!(identity.is_some());
//!
//! token_store.delete().await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use bridge_traits::storage::SecureStore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Secure-store key holding the identity session.
pub const IDENTITY_KEY: &str = "identity.session";

/// Provider session persisted across restarts.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredIdentity {
    pub subject_id: String,
    pub refresh_token: String,
}

impl StoredIdentity {
    pub fn new(subject_id: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

impl fmt::Debug for StoredIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredIdentity")
            .field("subject_id", &self.subject_id)
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// Secure storage for the identity service's refresh token.
#[derive(Clone)]
pub struct IdentityTokenStore {
    secure_store: Arc<dyn SecureStore>,
}

impl IdentityTokenStore {
    pub fn new(secure_store: Arc<dyn SecureStore>) -> Self {
        Self { secure_store }
    }

    /// Store the identity session, overwriting any previous one.
    ///
    /// # Errors
    ///
    /// - [`AuthError::SerializationFailed`] if encoding fails
    /// - [`AuthError::StorageFailed`] if the secure store rejects the write
    pub async fn store(&self, identity: &StoredIdentity) -> Result<()> {
        let json = serde_json::to_vec(identity).map_err(|e| {
            warn!(subject_id = %identity.subject_id, error = %e, "Failed to serialize identity");
            AuthError::from(e)
        })?;

        self.secure_store
            .set_secret(IDENTITY_KEY, &json)
            .await
            .map_err(|e| {
                warn!(
                    subject_id = %identity.subject_id,
                    error = %e,
                    "Failed to store identity in secure storage"
                );
                AuthError::StorageFailed(e.to_string())
            })?;

        info!(subject_id = %identity.subject_id, "Identity stored securely");
        Ok(())
    }

    /// Load the identity session.
    ///
    /// Returns `Ok(None)` if nothing is stored. A corrupted entry is deleted
    /// and reported as `Ok(None)`.
    pub async fn load(&self) -> Result<Option<StoredIdentity>> {
        let bytes = match self.secure_store.get_secret(IDENTITY_KEY).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!("No stored identity");
                return Ok(None);
            }
            Err(e) => {
                warn!(error = %e, "Failed to read identity from secure storage");
                return Err(AuthError::StorageFailed(e.to_string()));
            }
        };

        match serde_json::from_slice::<StoredIdentity>(&bytes) {
            Ok(identity) => {
                debug!(subject_id = %identity.subject_id, "Identity loaded");
                Ok(Some(identity))
            }
            Err(e) => {
                warn!(error = %e, "Stored identity is corrupted, deleting");
                if let Err(delete_err) = self.delete().await {
                    warn!(error = %delete_err, "Failed to delete corrupted identity");
                }
                Ok(None)
            }
        }
    }

    /// Delete the identity session. Deleting a missing entry is not an error.
    pub async fn delete(&self) -> Result<()> {
        self.secure_store
            .delete_secret(IDENTITY_KEY)
            .await
            .map_err(|e| AuthError::StorageFailed(e.to_string()))?;
        info!("Identity deleted from secure storage");
        Ok(())
    }
}
