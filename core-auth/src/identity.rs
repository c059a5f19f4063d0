//! REST Identity Adapter
//!
//! [`CredentialProvider`] implementation speaking the identity service's REST
//! API over the injected [`HttpClient`]:
//!
//! - password sign-in (`accounts:signInWithPassword`, JSON body)
//! - refresh-token exchange (`/v1/token`, form body)
//!
//! The id token is cached in memory until it is within
//! [`IdentityConfig::expiry_buffer`] of expiry. The refresh token lives in the
//! secure store through [`IdentityTokenStore`], so the provider can resume its
//! own session after a restart.

use async_trait::async_trait;
use bridge_traits::{
    http::{HttpClient, HttpMethod, HttpRequest, HttpResponse},
    storage::SecureStore,
    time::Clock,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, instrument, warn};

use crate::error::{AuthError, Result};
use crate::provider::{
    CredentialChange, CredentialGrant, CredentialProvider, ProviderErrorCode, ProviderUser,
};
use crate::token_store::{IdentityTokenStore, StoredIdentity};
use crate::types::{Credential, SubjectId};

pub const DEFAULT_SIGN_IN_URL: &str =
    "https://identitytoolkit.googleapis.com/v1/accounts:signInWithPassword";
pub const DEFAULT_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1/token";

const CHANGE_BUFFER: usize = 16;

/// Identity service endpoints and API key.
#[derive(Clone, PartialEq, Eq)]
pub struct IdentityConfig {
    pub api_key: String,
    pub sign_in_url: String,
    pub token_url: String,
    /// Cached id tokens closer than this to expiry are refreshed.
    pub expiry_buffer: Duration,
    pub request_timeout: Duration,
}

impl std::fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("api_key", &"[REDACTED]")
            .field("sign_in_url", &self.sign_in_url)
            .field("token_url", &self.token_url)
            .field("expiry_buffer", &self.expiry_buffer)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl IdentityConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            sign_in_url: DEFAULT_SIGN_IN_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            expiry_buffer: Duration::from_secs(5 * 60),
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Reads `GYMDESK_IDENTITY_API_KEY` (required) and the optional
    /// `GYMDESK_IDENTITY_SIGN_IN_URL` / `GYMDESK_IDENTITY_TOKEN_URL` overrides.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GYMDESK_IDENTITY_API_KEY")
            .map_err(|_| AuthError::Other("GYMDESK_IDENTITY_API_KEY is not set".to_string()))?;

        let mut config = Self::new(api_key);
        if let Ok(url) = std::env::var("GYMDESK_IDENTITY_SIGN_IN_URL") {
            config.sign_in_url = url;
        }
        if let Ok(url) = std::env::var("GYMDESK_IDENTITY_TOKEN_URL") {
            config.token_url = url;
        }
        Ok(config)
    }

    pub fn with_sign_in_url(mut self, url: impl Into<String>) -> Self {
        self.sign_in_url = url.into();
        self
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    pub fn with_expiry_buffer(mut self, buffer: Duration) -> Self {
        self.expiry_buffer = buffer;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
    local_id: String,
}

#[derive(Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
    user_id: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

struct CachedToken {
    subject_id: SubjectId,
    refresh_token: String,
    id_token: Option<Credential>,
    expires_at: DateTime<Utc>,
}

pub struct RestIdentityProvider {
    config: IdentityConfig,
    http: Arc<dyn HttpClient>,
    tokens: IdentityTokenStore,
    clock: Arc<dyn Clock>,
    // Held across refreshes so concurrent callers share one exchange.
    cache: Mutex<Option<CachedToken>>,
    changes: broadcast::Sender<CredentialChange>,
}

impl RestIdentityProvider {
    pub fn new(
        config: IdentityConfig,
        http: Arc<dyn HttpClient>,
        secure_store: Arc<dyn SecureStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        Self {
            config,
            http,
            tokens: IdentityTokenStore::new(secure_store),
            clock,
            cache: Mutex::new(None),
            changes,
        }
    }

    /// Reports a sign-out that happened outside this process (another
    /// window, an admin revocation). Drops the provider session and emits
    /// [`CredentialChange::SignedOut`].
    pub async fn notify_external_sign_out(&self) -> Result<()> {
        info!("External sign-out reported");
        self.drop_session().await
    }

    async fn drop_session(&self) -> Result<()> {
        self.cache.lock().await.take();
        let result = self.tokens.delete().await;
        self.emit(CredentialChange::SignedOut);
        result
    }

    /// Deletes the stored identity after the service rejected it.
    async fn forget_identity(&self) {
        if let Err(e) = self.tokens.delete().await {
            warn!(error = %e, "Failed to delete rejected identity");
        }
        self.emit(CredentialChange::SignedOut);
    }

    fn emit(&self, change: CredentialChange) {
        if self.changes.send(change).is_err() {
            debug!("No credential change subscribers");
        }
    }

    fn endpoint(&self, base: &str) -> Result<String> {
        url::Url::parse_with_params(base, &[("key", self.config.api_key.as_str())])
            .map(String::from)
            .map_err(|e| AuthError::Other(format!("Invalid identity endpoint '{}': {}", base, e)))
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let response = self
            .http
            .execute(request.timeout(self.config.request_timeout))
            .await
            .map_err(|e| AuthError::ProviderUnavailable(e.to_string()))?;

        if response.is_success() {
            return Ok(response);
        }

        Err(match response.json::<ErrorEnvelope>() {
            Ok(envelope) => {
                let code = ProviderErrorCode::parse(&envelope.error.message);
                debug!(status = response.status, code = ?code, "Identity service rejected request");
                code.classify()
            }
            Err(_) => AuthError::ProviderUnavailable(format!(
                "identity service returned HTTP {}",
                response.status
            )),
        })
    }

    fn expires_at(&self, expires_in: &str) -> DateTime<Utc> {
        let seconds = expires_in.parse::<i64>().unwrap_or_else(|_| {
            warn!(expires_in, "Unparseable token lifetime, treating as expired");
            0
        });
        self.clock.now() + chrono::Duration::seconds(seconds)
    }

    fn is_fresh(&self, cached: &CachedToken) -> bool {
        let buffer = chrono::Duration::from_std(self.config.expiry_buffer)
            .unwrap_or_else(|_| chrono::Duration::zero());
        cached.id_token.is_some() && cached.expires_at - buffer > self.clock.now()
    }

    async fn exchange_refresh_token(&self, refresh_token: &str) -> Result<RefreshResponse> {
        let form = serde_urlencoded::to_string([
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .map_err(|e| AuthError::SerializationFailed(e.to_string()))?;

        let request = HttpRequest::new(HttpMethod::Post, self.endpoint(&self.config.token_url)?)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(Bytes::from(form));

        let response = self.send(request).await?;
        response
            .json::<RefreshResponse>()
            .map_err(|e| AuthError::SerializationFailed(e.to_string()))
    }
}

#[async_trait]
impl CredentialProvider for RestIdentityProvider {
    #[instrument(skip(self, secret))]
    async fn sign_in(&self, identifier: &str, secret: &str) -> Result<CredentialGrant> {
        let request = HttpRequest::new(HttpMethod::Post, self.endpoint(&self.config.sign_in_url)?)
            .json(&SignInRequest {
                email: identifier,
                password: secret,
                return_secure_token: true,
            })?;

        let response = self.send(request).await?;
        let body: SignInResponse = response
            .json()
            .map_err(|e| AuthError::SerializationFailed(e.to_string()))?;

        let subject_id = SubjectId::new(body.local_id);
        let credential = Credential::new(body.id_token);

        if let Err(e) = self
            .tokens
            .store(&StoredIdentity::new(subject_id.as_str(), &body.refresh_token))
            .await
        {
            warn!(error = %e, "Identity not persisted, provider session will not survive restart");
        }

        *self.cache.lock().await = Some(CachedToken {
            subject_id: subject_id.clone(),
            refresh_token: body.refresh_token,
            id_token: Some(credential.clone()),
            expires_at: self.expires_at(&body.expires_in),
        });

        info!(subject_id = %subject_id, "Signed in with identity service");
        self.emit(CredentialChange::SignedIn(ProviderUser {
            subject_id: subject_id.clone(),
        }));

        Ok(CredentialGrant {
            credential,
            subject_id,
        })
    }

    async fn sign_out(&self) -> Result<()> {
        info!("Signing out of identity service");
        self.drop_session().await
    }

    async fn current_token(&self, force_refresh: bool) -> Result<Credential> {
        let mut cache = self.cache.lock().await;

        if cache.is_none() {
            *cache = self.tokens.load().await?.map(|stored| CachedToken {
                subject_id: SubjectId::new(stored.subject_id),
                refresh_token: stored.refresh_token,
                id_token: None,
                expires_at: self.clock.now(),
            });
        }

        let Some(cached) = cache.as_mut() else {
            return Err(AuthError::NotAuthenticated);
        };

        if !force_refresh && self.is_fresh(cached) {
            if let Some(token) = &cached.id_token {
                return Ok(token.clone());
            }
        }

        debug!(subject_id = %cached.subject_id, force_refresh, "Refreshing id token");
        let refreshed = match self.exchange_refresh_token(&cached.refresh_token).await {
            Ok(refreshed) => refreshed,
            Err(e) if e.is_auth_failure() => {
                warn!(subject_id = %cached.subject_id, error = %e, "Refresh token rejected");
                cache.take();
                drop(cache);
                self.forget_identity().await;
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        if refreshed.user_id != cached.subject_id.as_str() {
            warn!(
                expected = %cached.subject_id,
                actual = %refreshed.user_id,
                "Refresh returned a different subject, dropping identity"
            );
            cache.take();
            drop(cache);
            self.forget_identity().await;
            return Err(AuthError::TokenInvalid);
        }

        let credential = Credential::new(refreshed.id_token);
        if refreshed.refresh_token != cached.refresh_token {
            if let Err(e) = self
                .tokens
                .store(&StoredIdentity::new(
                    cached.subject_id.as_str(),
                    &refreshed.refresh_token,
                ))
                .await
            {
                warn!(error = %e, "Rotated refresh token not persisted");
            }
            cached.refresh_token = refreshed.refresh_token;
        }
        cached.id_token = Some(credential.clone());
        cached.expires_at = self.expires_at(&refreshed.expires_in);

        Ok(credential)
    }

    fn subscribe(&self) -> broadcast::Receiver<CredentialChange> {
        self.changes.subscribe()
    }

    async fn restore(&self) -> Result<()> {
        let stored = self.tokens.load().await?;
        match stored {
            Some(identity) => {
                let subject_id = SubjectId::new(identity.subject_id);
                let mut cache = self.cache.lock().await;
                if cache.is_none() {
                    *cache = Some(CachedToken {
                        subject_id: subject_id.clone(),
                        refresh_token: identity.refresh_token,
                        id_token: None,
                        expires_at: self.clock.now(),
                    });
                }
                drop(cache);

                debug!(subject_id = %subject_id, "Identity session restored");
                self.emit(CredentialChange::SignedIn(ProviderUser { subject_id }));
            }
            None => {
                debug!("No identity session to restore");
                self.emit(CredentialChange::SignedOut);
            }
        }
        Ok(())
    }
}
