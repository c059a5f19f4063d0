//! # Session Lifecycle Manager
//!
//! Orchestrates the console's single user session.
//!
//! ## Overview
//!
//! [`SessionManager`] wires the [`SessionStore`], the credential provider, the
//! backend profile endpoint, the [`InvalidSessionSignal`] and the
//! [`RefreshScheduler`] into the lifecycle
//!
//! ```text
//! UNINITIALIZED ──> AUTHENTICATING ──> AUTHENTICATED ──> UNAUTHENTICATED
//!                         ^                  │ refresh           │
//!                         └──────────────────┴───────────────────┘ login
//! ```
//!
//! ## Races handled here
//!
//! - The provider reports its own sign-in state asynchronously and may do so
//!   before `login` has committed the session. A login-in-progress guard,
//!   released shortly after the profile fetch, suppresses provider events and
//!   window checks during that time.
//! - Providers emit spurious sign-outs during sign-in handshakes. A sign-out
//!   within the fresh-login threshold of the session start is ignored.
//! - Every `login`, `logout` and invalidation bumps a generation counter.
//!   Profile fetches tagged with an older generation are discarded instead of
//!   overwriting newer state.
//!
//! ## Failure policy
//!
//! Transient failures (network, provider unavailable) never touch session
//! state; the next scheduled tick retries. Authentication failures go through
//! the Invalid-Session Signal, which signs out exactly once per episode.
//!
//! ## Usage
//!
//! ```no_run
//! use core_auth::{IdentityConfig, RestIdentityProvider, SessionManager};
//! use core_runtime::{config::CoreConfig, events::EventBus};
//! use std::sync::Arc;
//!
//! # async fn example(config: CoreConfig) -> core_auth::Result<()> {
//! let provider = Arc::new(RestIdentityProvider::new(
//!     IdentityConfig::from_env()?,
//!     config.http_client.clone(),
//!     config.secure_store.clone(),
//!     config.clock.clone(),
//! ));
//!
//! let manager = SessionManager::new(&config, provider, EventBus::new(100));
//! manager.initialize().await?;
//!
//! if !manager.is_authenticated().await {
//!     let user = manager.login("frontdesk@gym.example", "hunter2").await?;
//!     println!("Welcome, {}", user.name);
//! }
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use bridge_traits::{http::HttpClient, time::Clock};
use chrono::{DateTime, Utc};
use core_runtime::config::{CoreConfig, SessionConfig};
use core_runtime::events::{AuthEvent, CoreEvent, EventBus, RecvError, SessionEvent};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::{AuthError, Result};
use crate::guarded::{SessionAccess, SessionHttpClient};
use crate::persistence::{PersistedSession, SessionPersistence};
use crate::profile::ProfileClient;
use crate::provider::{CredentialChange, CredentialProvider, ProviderUser};
use crate::scheduler::{RefreshScheduler, RefreshTarget};
use crate::signal::{InvalidSessionSignal, InvalidationReason, SessionTerminator};
use crate::store::SessionStore;
use crate::types::{
    Credential, LifecyclePhase, SessionPatch, SessionSnapshot, SessionState, SubjectId,
    UserProfile,
};

/// Entry point for the rest of the console: `login`, `logout`,
/// `is_authenticated`, `current_user` and a reactive snapshot.
///
/// Dropping the manager stops the provider listener and both timers.
pub struct SessionManager {
    inner: Arc<Inner>,
}

struct Inner {
    weak_self: Weak<Inner>,
    store: SessionStore,
    provider: Arc<dyn CredentialProvider>,
    profile_client: ProfileClient,
    signal: InvalidSessionSignal,
    scheduler: RefreshScheduler,
    clock: Arc<dyn Clock>,
    event_bus: EventBus,
    config: SessionConfig,
    generation: AtomicU64,
    login_in_progress: AtomicBool,
    initialized: AtomicBool,
    listener: Mutex<Option<CancellationToken>>,
}

impl SessionManager {
    /// Creates a manager from the host configuration.
    ///
    /// Nothing runs until [`initialize`](Self::initialize) or
    /// [`login`](Self::login) is called. Either one starts the provider
    /// listener.
    pub fn new(
        config: &CoreConfig,
        provider: Arc<dyn CredentialProvider>,
        event_bus: EventBus,
    ) -> Self {
        let session = config.session.clone();
        let persistence = SessionPersistence::new(config.local_store.clone());

        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| {
            let terminator: Weak<dyn SessionTerminator> = weak.clone();
            let target: Weak<dyn RefreshTarget> = weak.clone();

            Inner {
                weak_self: weak.clone(),
                store: SessionStore::new(persistence.clone()),
                provider,
                profile_client: ProfileClient::new(
                    config.http_client.clone(),
                    &config.api_base_url,
                    &session.profile_path,
                    session.request_timeout,
                ),
                signal: InvalidSessionSignal::new(
                    terminator,
                    persistence,
                    config.notifier.clone(),
                    config.navigator.clone(),
                    event_bus.clone(),
                    session.invalidation_reset_delay,
                ),
                scheduler: RefreshScheduler::new(
                    target,
                    session.refresh_interval,
                    session.window_check_interval,
                ),
                clock: config.clock.clone(),
                event_bus,
                config: session,
                generation: AtomicU64::new(0),
                login_in_progress: AtomicBool::new(false),
                initialized: AtomicBool::new(false),
                listener: Mutex::new(None),
            }
        });

        Self { inner }
    }

    /// Restores a persisted session and starts listening to the provider.
    ///
    /// - no record: `UNAUTHENTICATED`
    /// - record older than the session window: record cleared, `UNAUTHENTICATED`,
    ///   no network call
    /// - otherwise: `AUTHENTICATING` with the original start instant, then a
    ///   profile fetch
    ///
    /// Calling this more than once is a no-op.
    pub async fn initialize(&self) -> Result<()> {
        self.inner.initialize().await
    }

    /// Signs in and loads the user's profile.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidCredentials`] for a rejected identifier/secret
    /// - transient errors ([`AuthError::is_transient`]); the session is left
    ///   `AUTHENTICATING` and the scheduler retries the profile fetch
    /// - [`AuthError::TokenInvalid`] when the backend rejects the new
    ///   credential; the session is signed out
    /// - [`AuthError::LoginSuperseded`] when a newer login or logout won
    pub async fn login(&self, identifier: &str, secret: &str) -> Result<UserProfile> {
        self.inner.login(identifier, secret).await
    }

    /// Signs out. Safe to call without a session.
    pub async fn logout(&self) {
        self.inner.end_session("logout").await;
    }

    pub async fn is_authenticated(&self) -> bool {
        self.inner.store.phase().await == LifecyclePhase::Authenticated
    }

    pub async fn current_user(&self) -> Option<UserProfile> {
        self.inner.store.state().await.profile
    }

    pub async fn phase(&self) -> LifecyclePhase {
        self.inner.store.phase().await
    }

    /// The active session, if any.
    pub async fn session(&self) -> Option<SessionState> {
        self.inner.store.get().await
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.store.subscribe_snapshot().borrow().clone()
    }

    /// `{is_authenticated, user, loading}` updates.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.store.subscribe_snapshot()
    }

    /// Full state updates, including the credential.
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.inner.store.subscribe()
    }

    pub async fn bearer_token(&self) -> Option<Credential> {
        SessionAccess::bearer_token(self.inner.as_ref()).await
    }

    /// Entry point for the data layer: the backend answered 401.
    pub async fn report_unauthorized(&self) {
        SessionAccess::report_unauthorized(self.inner.as_ref()).await
    }

    /// Runs a credential refresh now instead of waiting for the next tick.
    pub async fn refresh_now(&self) {
        self.inner.refresh_credential().await
    }

    /// Runs the session-window check now.
    pub async fn check_session_window(&self) {
        self.inner.check_session_window().await
    }

    pub fn is_login_in_progress(&self) -> bool {
        self.inner.login_in_progress.load(Ordering::SeqCst)
    }

    pub fn is_refresh_scheduled(&self) -> bool {
        self.inner.scheduler.is_running()
    }

    /// Wraps `http` so requests carry the session credential and 401s
    /// invalidate the session.
    pub fn guarded_client(&self, http: Arc<dyn HttpClient>) -> SessionHttpClient {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let session: Weak<dyn SessionAccess> = weak;
        SessionHttpClient::new(http, session)
    }

    /// Stops the provider listener and both timers. Session state is kept.
    pub fn shutdown(&self) {
        self.inner.shutdown();
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.inner.shutdown();
    }
}

impl Inner {
    fn bump_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn emit(&self, event: CoreEvent) {
        if self.event_bus.emit(event).is_err() {
            debug!("No event subscribers");
        }
    }

    fn window_elapsed(&self, started_at: DateTime<Utc>) -> bool {
        self.clock.now() - started_at >= self.config.session_window_chrono()
    }

    fn is_fresh(&self, started_at: DateTime<Utc>) -> bool {
        self.clock.now() - started_at <= self.config.fresh_login_threshold_chrono()
    }

    fn shutdown(&self) {
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(token) = listener {
            token.cancel();
        }
        self.scheduler.stop();
        debug!("Session manager shut down");
    }

    async fn initialize(&self) -> Result<()> {
        if self.initialized.swap(true, Ordering::SeqCst) {
            debug!("Session manager already initialized");
            return Ok(());
        }

        self.start_listener();

        let restored = self.restore_local().await;

        if let Err(e) = self.provider.restore().await {
            warn!(error = %e, "Provider restore failed");
        }

        if let Some((generation, record)) = restored {
            let subject_id = record.subject_id.clone();
            let result = self.resume(generation, record).await;
            // Restore failures are already handled; the caller only learns about setup errors.
            let _ = self.finish(generation, &subject_id, result).await;
        }

        Ok(())
    }

    async fn restore_local(&self) -> Option<(u64, PersistedSession)> {
        let record = match self.store.persistence().load().await {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Failed to read session record");
                None
            }
        };

        let Some(record) = record else {
            self.store.clear().await;
            info!("No persisted session");
            return None;
        };

        if self.window_elapsed(record.started_at) {
            info!(subject_id = %record.subject_id, "Persisted session outside window, discarding");
            self.store.clear().await;
            if let Err(e) = self.provider.sign_out().await {
                warn!(error = %e, "Provider sign-out failed for stale session");
            }
            self.emit(CoreEvent::Session(SessionEvent::WindowExpired {
                subject_id: Some(record.subject_id.to_string()),
            }));
            return None;
        }

        let generation = self.bump_generation();
        let committed = self
            .store
            .set_when(
                SessionPatch::restore(
                    record.credential.clone(),
                    record.subject_id.clone(),
                    record.started_at,
                ),
                |_| self.is_current(generation),
            )
            .await;

        match committed {
            Ok(Some(_)) => {
                info!(subject_id = %record.subject_id, started_at = %record.started_at, "Session restored");
                self.emit(CoreEvent::Session(SessionEvent::Restored {
                    subject_id: record.subject_id.to_string(),
                    started_at_ms: record.started_at.timestamp_millis(),
                }));
                Some((generation, record))
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Persisted session rejected");
                self.store.clear().await;
                None
            }
        }
    }

    /// Brings a restored session to `AUTHENTICATED`, preferring a provider
    /// credential over the persisted one.
    async fn resume(&self, generation: u64, record: PersistedSession) -> Result<UserProfile> {
        let credential = match self.provider.current_token(false).await {
            Ok(fresh) => {
                if fresh != record.credential {
                    let patch = SessionPatch {
                        credential: Some(Some(fresh.clone())),
                        ..SessionPatch::default()
                    };
                    self.store
                        .set_when(patch, |state| {
                            self.is_current(generation)
                                && state.phase == LifecyclePhase::Authenticating
                        })
                        .await?;
                }
                fresh
            }
            Err(AuthError::NotAuthenticated) => record.credential,
            Err(e) if e.is_transient() => {
                debug!(error = %e, "Provider unavailable, using persisted credential");
                record.credential
            }
            Err(e) => return Err(e),
        };

        self.complete_authentication(generation, &credential).await
    }

    #[instrument(skip_all)]
    async fn login(&self, identifier: &str, secret: &str) -> Result<UserProfile> {
        self.start_listener();
        let generation = self.bump_generation();
        self.login_in_progress.store(true, Ordering::SeqCst);
        self.emit(CoreEvent::Auth(AuthEvent::SigningIn));

        let grant = match self.provider.sign_in(identifier, secret).await {
            Ok(grant) => grant,
            Err(e) => {
                self.release_guard(generation);
                warn!(error = %e, "Sign-in failed");
                self.emit(CoreEvent::Auth(AuthEvent::AuthError {
                    message: e.user_message().to_string(),
                    recoverable: true,
                }));
                return Err(e);
            }
        };

        let committed = self
            .store
            .set_when(
                SessionPatch::begin(
                    grant.credential.clone(),
                    grant.subject_id.clone(),
                    self.clock.now(),
                ),
                |_| self.is_current(generation),
            )
            .await;

        match committed {
            Ok(Some(_)) => self.scheduler.stop(),
            Ok(None) => {
                debug!("Login superseded before session start");
                return Err(AuthError::LoginSuperseded);
            }
            Err(e) => {
                self.release_guard(generation);
                return Err(e);
            }
        }

        let result = self
            .complete_authentication(generation, &grant.credential)
            .await;
        self.schedule_guard_release(generation);
        self.finish(generation, &grant.subject_id, result).await
    }

    /// Fetches the profile and commits `AUTHENTICATED` if `generation` is still current.
    async fn complete_authentication(
        &self,
        generation: u64,
        credential: &Credential,
    ) -> Result<UserProfile> {
        let profile = self.profile_client.fetch(credential).await?;

        if !self.is_current(generation) {
            debug!(generation, "Discarding profile from superseded session");
            return Err(AuthError::LoginSuperseded);
        }

        let committed = self
            .store
            .set_when(SessionPatch::authenticated(profile.clone()), |state| {
                self.is_current(generation) && state.is_active()
            })
            .await?;

        match committed {
            Some(_) => Ok(profile),
            None => Err(AuthError::LoginSuperseded),
        }
    }

    /// Applies the outcome of a login, restore or adoption.
    async fn finish(
        &self,
        generation: u64,
        subject_id: &SubjectId,
        result: Result<UserProfile>,
    ) -> Result<UserProfile> {
        match result {
            Ok(profile) => {
                self.scheduler.start();
                info!(subject_id = %subject_id, role = %profile.role, "Session authenticated");
                self.emit(CoreEvent::Auth(AuthEvent::SignedIn {
                    subject_id: subject_id.to_string(),
                }));
                Ok(profile)
            }
            Err(AuthError::LoginSuperseded) => Err(AuthError::LoginSuperseded),
            Err(e) if e.is_auth_failure() => {
                warn!(subject_id = %subject_id, error = %e, "Credential rejected");
                if let Some(reason) = InvalidationReason::from_error(&e) {
                    self.signal.invalidate(reason).await;
                }
                Err(e)
            }
            Err(e) => {
                warn!(subject_id = %subject_id, error = %e, "Session not completed, will retry on next tick");
                if self.is_current(generation) {
                    self.scheduler.start();
                }
                self.emit(CoreEvent::Auth(AuthEvent::AuthError {
                    message: e.user_message().to_string(),
                    recoverable: true,
                }));
                Err(e)
            }
        }
    }

    fn release_guard(&self, generation: u64) {
        if self.is_current(generation) {
            self.login_in_progress.store(false, Ordering::SeqCst);
        }
    }

    fn schedule_guard_release(&self, generation: u64) {
        let weak = self.weak_self.clone();
        let delay = self.config.login_guard_clear_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                inner.release_guard(generation);
                debug!(generation, "Login guard released");
            }
        });
    }

    /// Ends the session. Emits `SignedOut` only if a session was active.
    async fn end_session(&self, cause: &'static str) {
        self.bump_generation();
        self.scheduler.stop();
        self.login_in_progress.store(false, Ordering::SeqCst);

        let subject_id = self.store.state().await.subject_id;
        if self.store.clear().await {
            info!(cause, subject_id = ?subject_id, "Session ended");
            self.emit(CoreEvent::Auth(AuthEvent::SignedOut {
                subject_id: subject_id.map(|s| s.to_string()),
            }));
        }

        if let Err(e) = self.provider.sign_out().await {
            warn!(error = %e, "Provider sign-out failed");
        }
    }

    /// Subscribes to provider changes unless a listener is already running.
    fn start_listener(&self) {
        let token = CancellationToken::new();
        {
            let mut listener = self.listener.lock().unwrap_or_else(|e| e.into_inner());
            if listener.as_ref().is_some_and(|running| !running.is_cancelled()) {
                return;
            }
            *listener = Some(token.clone());
        }

        let mut changes = self.provider.subscribe();
        let weak = self.weak_self.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => return,
                    change = changes.recv() => match change {
                        Ok(change) => {
                            let Some(inner) = weak.upgrade() else { return };
                            inner.handle_credential_change(change).await;
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "Credential change listener lagged");
                        }
                        Err(RecvError::Closed) => {
                            debug!("Credential change stream closed");
                            return;
                        }
                    },
                }
            }
        });
    }

    async fn handle_credential_change(&self, change: CredentialChange) {
        if self.login_in_progress.load(Ordering::SeqCst) {
            debug!(?change, "Login in progress, ignoring provider change");
            if change == CredentialChange::SignedOut {
                self.emit(CoreEvent::Session(SessionEvent::ExternalSignOutIgnored {
                    reason: "login in progress".to_string(),
                }));
            }
            return;
        }

        match change {
            CredentialChange::SignedOut => self.handle_external_sign_out().await,
            CredentialChange::SignedIn(user) => self.handle_external_sign_in(user).await,
        }
    }

    async fn handle_external_sign_out(&self) {
        let Some(session) = self.store.get().await else {
            debug!("Provider signed out with no local session");
            return;
        };

        if session.started_at.is_some_and(|started| self.is_fresh(started)) {
            debug!("Provider sign-out within fresh-login threshold, ignoring");
            self.emit(CoreEvent::Session(SessionEvent::ExternalSignOutIgnored {
                reason: "fresh login".to_string(),
            }));
            return;
        }

        info!(subject_id = ?session.subject_id, "Provider signed out externally");
        self.emit(CoreEvent::Session(SessionEvent::ExternalSignOut {
            subject_id: session.subject_id.as_ref().map(|s| s.to_string()),
        }));
        self.end_session("external sign-out").await;
    }

    async fn handle_external_sign_in(&self, user: ProviderUser) {
        let state = self.store.state().await;

        match (&state.subject_id, state.phase) {
            (Some(current), _) if *current == user.subject_id => {
                debug!(subject_id = %current, "Provider confirmed current session");
                return;
            }
            (Some(current), _) => {
                info!(
                    current = %current,
                    incoming = %user.subject_id,
                    "Provider switched user, ending current session"
                );
                self.end_session("subject changed").await;
            }
            (None, LifecyclePhase::Unauthenticated) => {}
            (None, phase) => {
                debug!(%phase, "Provider sign-in before initialization, ignoring");
                return;
            }
        }

        self.adopt(user).await;
    }

    /// Starts a session for a user signed in through the provider elsewhere.
    async fn adopt(&self, user: ProviderUser) {
        let generation = self.bump_generation();

        let credential = match self.provider.current_token(false).await {
            Ok(credential) => credential,
            Err(e) => {
                warn!(subject_id = %user.subject_id, error = %e, "Cannot adopt provider session");
                return;
            }
        };

        let committed = self
            .store
            .set_when(
                SessionPatch::begin(credential.clone(), user.subject_id.clone(), self.clock.now()),
                |state| self.is_current(generation) && !state.is_active(),
            )
            .await;

        match committed {
            Ok(Some(_)) => info!(subject_id = %user.subject_id, "Adopted provider session"),
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "Provider session rejected");
                return;
            }
        }

        let result = self.complete_authentication(generation, &credential).await;
        let _ = self.finish(generation, &user.subject_id, result).await;
    }

    async fn refresh_failed(&self, subject_id: &SubjectId, error: AuthError) {
        let reason = if error.is_auth_failure() {
            InvalidationReason::from_error(&error)
        } else {
            None
        };

        if let Some(reason) = reason {
            warn!(subject_id = %subject_id, error = %error, "Refresh rejected, invalidating session");
            self.signal.invalidate(reason).await;
            return;
        }

        warn!(subject_id = %subject_id, error = %error, "Refresh failed, will retry on next tick");
        self.emit(CoreEvent::Auth(AuthEvent::AuthError {
            message: error.user_message().to_string(),
            recoverable: true,
        }));
    }

    async fn expire(&self, subject_id: &SubjectId) {
        info!(subject_id = %subject_id, "Session window elapsed");
        self.emit(CoreEvent::Session(SessionEvent::WindowExpired {
            subject_id: Some(subject_id.to_string()),
        }));
        self.signal
            .invalidate(InvalidationReason::SessionExpired)
            .await;
    }
}

#[async_trait]
impl RefreshTarget for Inner {
    async fn refresh_credential(&self) {
        let Some(session) = self.store.get().await else {
            return;
        };
        let (Some(subject_id), Some(started_at)) = (session.subject_id.clone(), session.started_at)
        else {
            return;
        };
        let generation = self.generation.load(Ordering::SeqCst);

        if self.window_elapsed(started_at) {
            self.expire(&subject_id).await;
            return;
        }

        self.emit(CoreEvent::Auth(AuthEvent::TokenRefreshing {
            subject_id: subject_id.to_string(),
        }));

        let credential = match self.provider.current_token(true).await {
            Ok(credential) => credential,
            Err(e) => return self.refresh_failed(&subject_id, e).await,
        };

        let profile = match self.profile_client.fetch(&credential).await {
            Ok(profile) => profile,
            Err(e) => return self.refresh_failed(&subject_id, e).await,
        };

        let committed = self
            .store
            .set_when(SessionPatch::refreshed(credential, profile), |state| {
                self.is_current(generation)
                    && state.is_active()
                    && state.subject_id.as_ref() == Some(&subject_id)
            })
            .await;

        match committed {
            Ok(Some(_)) => {
                if session.phase == LifecyclePhase::Authenticating {
                    info!(subject_id = %subject_id, "Session recovered");
                    self.emit(CoreEvent::Auth(AuthEvent::SignedIn {
                        subject_id: subject_id.to_string(),
                    }));
                }
                debug!(subject_id = %subject_id, "Credential refreshed");
                self.emit(CoreEvent::Auth(AuthEvent::TokenRefreshed {
                    subject_id: subject_id.to_string(),
                }));
            }
            Ok(None) => debug!("Refresh result discarded, session changed"),
            Err(e) => warn!(error = %e, "Refresh result rejected by store"),
        }
    }

    async fn check_session_window(&self) {
        if self.login_in_progress.load(Ordering::SeqCst) {
            debug!("Login in progress, skipping window check");
            return;
        }

        let Some(session) = self.store.get().await else {
            return;
        };

        if let (Some(subject_id), Some(started_at)) = (session.subject_id, session.started_at) {
            if self.window_elapsed(started_at) {
                self.expire(&subject_id).await;
            }
        }
    }
}

#[async_trait]
impl SessionTerminator for Inner {
    async fn has_active_session(&self) -> bool {
        self.store.get().await.is_some()
    }

    async fn terminate(&self, reason: InvalidationReason) {
        self.end_session(reason.as_str()).await;
    }
}

#[async_trait]
impl SessionAccess for Inner {
    async fn bearer_token(&self) -> Option<Credential> {
        self.store.get().await.and_then(|session| session.credential)
    }

    async fn report_unauthorized(&self) {
        self.signal.invalidate(InvalidationReason::TokenInvalid).await;
    }
}
