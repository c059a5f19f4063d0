use bridge_traits::BridgeError;
use thiserror::Error;

use crate::types::LifecyclePhase;

/// Errors produced by the session core.
///
/// Variants fall into three classes:
/// - authentication failures ([`is_auth_failure`](AuthError::is_auth_failure)), which end the session
/// - transient failures ([`is_transient`](AuthError::is_transient)), which never touch session state
/// - programming and storage errors, surfaced as-is
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Identity provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Credential expired")]
    TokenExpired,

    #[error("Session window elapsed")]
    SessionExpired,

    #[error("Credential rejected by backend")]
    TokenInvalid,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Invalid session transition {from} -> {to}: {reason}")]
    InvalidStateTransition {
        from: LifecyclePhase,
        to: LifecyclePhase,
        reason: String,
    },

    #[error("Login superseded by a newer session change")]
    LoginSuperseded,

    #[error("Storage failed: {0}")]
    StorageFailed(String),

    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    #[error("{0}")]
    Other(String),
}

impl AuthError {
    /// Whether this error means the user must re-authenticate.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidCredentials
                | AuthError::TokenExpired
                | AuthError::TokenInvalid
                | AuthError::SessionExpired
                | AuthError::NotAuthenticated
        )
    }

    /// Whether retrying later may succeed. Transient errors never destroy session state.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AuthError::ProviderUnavailable(_) | AuthError::NetworkError(_)
        )
    }

    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "Incorrect email or password.",
            AuthError::ProviderUnavailable(_) | AuthError::NetworkError(_) => {
                "Unable to reach the sign-in service. Check your connection and try again."
            }
            AuthError::SessionExpired => "Your session has expired. Please sign in again.",
            AuthError::TokenExpired | AuthError::TokenInvalid | AuthError::NotAuthenticated => {
                "Your session is no longer valid. Please sign in again."
            }
            AuthError::LoginSuperseded => "Another sign-in is in progress.",
            AuthError::InvalidStateTransition { .. }
            | AuthError::StorageFailed(_)
            | AuthError::SerializationFailed(_)
            | AuthError::Other(_) => "Something went wrong. Please try again.",
        }
    }
}

impl From<BridgeError> for AuthError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::Network(msg) => AuthError::NetworkError(msg),
            BridgeError::NotAvailable(msg) => AuthError::ProviderUnavailable(msg),
            BridgeError::Storage(msg) => AuthError::StorageFailed(msg),
            BridgeError::Io(e) => AuthError::StorageFailed(e.to_string()),
            BridgeError::OperationFailed(msg) => AuthError::Other(msg),
        }
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(err: serde_json::Error) -> Self {
        AuthError::SerializationFailed(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
