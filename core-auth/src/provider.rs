//! Credential Provider Adapter
//!
//! The identity provider is consumed through [`CredentialProvider`]: issue a
//! credential for a username and password, refresh it, revoke it, and report the
//! provider's own sign-in state as a stream of [`CredentialChange`]s.
//!
//! Change events may arrive in any order relative to this process's own
//! `sign_in` calls. Reconciling them is the lifecycle manager's job.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::{AuthError, Result};
use crate::types::{Credential, SubjectId};

/// Result of a successful sign-in.
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialGrant {
    pub credential: Credential,
    pub subject_id: SubjectId,
}

/// Live handle on the provider's signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderUser {
    pub subject_id: SubjectId,
}

/// Provider-side sign-in state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialChange {
    SignedIn(ProviderUser),
    /// The provider has no signed-in user. May be spurious during sign-in handshakes.
    SignedOut,
}

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// # Errors
    ///
    /// [`AuthError::InvalidCredentials`] for a rejected identifier/secret pair,
    /// [`AuthError::ProviderUnavailable`] when the provider cannot be reached.
    async fn sign_in(&self, identifier: &str, secret: &str) -> Result<CredentialGrant>;

    async fn sign_out(&self) -> Result<()>;

    /// Current credential, minting a new one if `force_refresh` is set or the
    /// cached one is close to expiry.
    ///
    /// # Errors
    ///
    /// [`AuthError::ProviderUnavailable`] on transport failure,
    /// [`AuthError::TokenExpired`] when the provider revoked the session,
    /// [`AuthError::NotAuthenticated`] when nobody is signed in.
    async fn current_token(&self, force_refresh: bool) -> Result<Credential>;

    /// Stream of provider sign-in state changes. Each underlying event is
    /// delivered at most once per receiver.
    fn subscribe(&self) -> broadcast::Receiver<CredentialChange>;

    /// Loads any provider-side persisted state and emits the initial change event.
    async fn restore(&self) -> Result<()> {
        Ok(())
    }
}

/// Error codes reported by the identity service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderErrorCode {
    InvalidPassword,
    EmailNotFound,
    InvalidLoginCredentials,
    UserDisabled,
    UserNotFound,
    TokenExpired,
    InvalidRefreshToken,
    TooManyAttempts,
    Unknown(String),
}

impl ProviderErrorCode {
    /// Parses the service's `error.message` field, e.g.
    /// `"TOO_MANY_ATTEMPTS_TRY_LATER : Access disabled..."`.
    pub fn parse(message: &str) -> Self {
        let code = message.split(':').next().unwrap_or_default().trim();
        match code {
            "INVALID_PASSWORD" => Self::InvalidPassword,
            "EMAIL_NOT_FOUND" => Self::EmailNotFound,
            "INVALID_LOGIN_CREDENTIALS" => Self::InvalidLoginCredentials,
            "USER_DISABLED" => Self::UserDisabled,
            "USER_NOT_FOUND" => Self::UserNotFound,
            "TOKEN_EXPIRED" => Self::TokenExpired,
            "INVALID_REFRESH_TOKEN" => Self::InvalidRefreshToken,
            "TOO_MANY_ATTEMPTS_TRY_LATER" => Self::TooManyAttempts,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn classify(&self) -> AuthError {
        match self {
            Self::InvalidPassword
            | Self::EmailNotFound
            | Self::InvalidLoginCredentials
            | Self::UserDisabled => AuthError::InvalidCredentials,
            Self::UserNotFound | Self::TokenExpired | Self::InvalidRefreshToken => {
                AuthError::TokenExpired
            }
            Self::TooManyAttempts => {
                AuthError::ProviderUnavailable("too many attempts, try later".to_string())
            }
            Self::Unknown(code) => AuthError::ProviderUnavailable(code.clone()),
        }
    }
}
