//! Invalid-Session Signal
//!
//! Single-flight entry point for every path that discovers the session is no
//! longer valid: a 401 from the backend, a rejected refresh, an elapsed
//! session window. The first caller runs the sign-out sequence:
//!
//! 1. clear the durable session record
//! 2. notify the user, awaited
//! 3. terminate the session
//! 4. route to sign-in
//!
//! Callers arriving while a sequence is running return immediately. The gate
//! reopens `reset_delay` after navigation so a later, unrelated episode runs.

use async_trait::async_trait;
use bridge_traits::presentation::{Navigator, Notifier};
use core_runtime::events::{CoreEvent, EventBus, SessionEvent};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::AuthError;
use crate::persistence::SessionPersistence;

/// Why a session was forcibly ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationReason {
    /// The absolute session window elapsed.
    SessionExpired,
    /// The backend rejected the credential.
    TokenInvalid,
    /// The identity provider refused to refresh the credential.
    TokenExpired,
}

impl InvalidationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvalidationReason::SessionExpired => "session_expired",
            InvalidationReason::TokenInvalid => "token_invalid",
            InvalidationReason::TokenExpired => "token_expired",
        }
    }

    pub fn user_message(&self) -> &'static str {
        self.as_error().user_message()
    }

    pub fn as_error(&self) -> AuthError {
        match self {
            InvalidationReason::SessionExpired => AuthError::SessionExpired,
            InvalidationReason::TokenInvalid => AuthError::TokenInvalid,
            InvalidationReason::TokenExpired => AuthError::TokenExpired,
        }
    }

    /// Maps an authentication-class error to a reason. Other errors yield `None`.
    pub fn from_error(err: &AuthError) -> Option<Self> {
        match err {
            AuthError::SessionExpired => Some(InvalidationReason::SessionExpired),
            AuthError::TokenExpired => Some(InvalidationReason::TokenExpired),
            AuthError::TokenInvalid
            | AuthError::NotAuthenticated
            | AuthError::InvalidCredentials => Some(InvalidationReason::TokenInvalid),
            _ => None,
        }
    }
}

impl fmt::Display for InvalidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The component that owns the session and can end it.
#[async_trait]
pub trait SessionTerminator: Send + Sync {
    async fn has_active_session(&self) -> bool;

    /// Ends the session. Must not call back into the signal.
    async fn terminate(&self, reason: InvalidationReason);
}

pub struct InvalidSessionSignal {
    shared: Arc<Shared>,
}

struct Shared {
    handling: AtomicBool,
    terminator: Weak<dyn SessionTerminator>,
    persistence: SessionPersistence,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
    event_bus: EventBus,
    reset_delay: Duration,
}

impl InvalidSessionSignal {
    pub fn new(
        terminator: Weak<dyn SessionTerminator>,
        persistence: SessionPersistence,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
        event_bus: EventBus,
        reset_delay: Duration,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                handling: AtomicBool::new(false),
                terminator,
                persistence,
                notifier,
                navigator,
                event_bus,
                reset_delay,
            }),
        }
    }

    /// Whether a sign-out sequence is running or its gate has not reopened yet.
    pub fn is_handling(&self) -> bool {
        self.shared.handling.load(Ordering::SeqCst)
    }

    /// Runs the forced sign-out sequence unless one is already in flight.
    ///
    /// The sequence runs on its own task: dropping the returned future does
    /// not cut it short, and the gate always reopens.
    ///
    /// Returns `true` if this call ran the sequence.
    pub async fn invalidate(&self, reason: InvalidationReason) -> bool {
        let Some(terminator) = self.shared.terminator.upgrade() else {
            debug!(%reason, "Session owner dropped, ignoring invalidation");
            return false;
        };

        if self
            .shared
            .handling
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!(%reason, "Invalidation already in progress");
            return false;
        }

        let shared = Arc::clone(&self.shared);
        let episode = tokio::spawn(async move { shared.run(terminator, reason).await });

        match episode.await {
            Ok(ran) => ran,
            Err(e) => {
                warn!(%reason, error = %e, "Invalidation task failed, reopening gate");
                self.shared.handling.store(false, Ordering::SeqCst);
                false
            }
        }
    }
}

impl Shared {
    async fn run(
        self: Arc<Self>,
        terminator: Arc<dyn SessionTerminator>,
        reason: InvalidationReason,
    ) -> bool {
        if !terminator.has_active_session().await {
            debug!(%reason, "No active session, invalidation is a no-op");
            self.handling.store(false, Ordering::SeqCst);
            return false;
        }

        info!(%reason, "Invalidating session");
        self.event_bus
            .emit(CoreEvent::Session(SessionEvent::Invalidated {
                reason: reason.as_str().to_string(),
            }))
            .ok();

        if let Err(e) = self.persistence.clear().await {
            warn!(error = %e, "Failed to clear session record during invalidation");
        }

        self.notifier.notify(reason.user_message()).await;
        terminator.terminate(reason).await;
        self.navigator.navigate_to_sign_in().await;

        let delay = self.reset_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            self.handling.store(false, Ordering::SeqCst);
        });

        true
    }
}
