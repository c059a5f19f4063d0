//! Session Store
//!
//! Single owner of [`SessionState`]. Every write goes through
//! [`SessionStore::set`], which validates the patch, commits it atomically,
//! publishes the new state to subscribers and mirrors it to durable storage.
//! Writes are serialized by one async mutex, so the durable record follows
//! commit order.

use tokio::sync::{watch, Mutex};
use tracing::{debug, warn};

use crate::error::Result;
use crate::persistence::SessionPersistence;
use crate::types::{LifecyclePhase, SessionPatch, SessionSnapshot, SessionState};

pub struct SessionStore {
    state: Mutex<SessionState>,
    state_tx: watch::Sender<SessionState>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    persistence: SessionPersistence,
}

impl SessionStore {
    pub fn new(persistence: SessionPersistence) -> Self {
        let initial = SessionState::default();
        let (state_tx, _) = watch::channel(initial.clone());
        let (snapshot_tx, _) = watch::channel(initial.snapshot());

        Self {
            state: Mutex::new(initial),
            state_tx,
            snapshot_tx,
            persistence,
        }
    }

    /// Current state, including inactive phases.
    pub async fn state(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    /// The session, if one is active.
    pub async fn get(&self) -> Option<SessionState> {
        let state = self.state.lock().await;
        state.is_active().then(|| state.clone())
    }

    pub async fn phase(&self) -> LifecyclePhase {
        self.state.lock().await.phase
    }

    pub fn persistence(&self) -> &SessionPersistence {
        &self.persistence
    }

    /// Applies `patch` atomically.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidStateTransition`](crate::AuthError::InvalidStateTransition)
    /// if the resulting state would break a session invariant. The stored state
    /// is unchanged in that case.
    pub async fn set(&self, patch: SessionPatch) -> Result<SessionState> {
        let mut state = self.state.lock().await;
        let next = state.apply(patch)?;
        self.commit(&mut state, next.clone()).await;
        Ok(next)
    }

    /// Applies `patch` only if `precondition` holds for the state at commit time.
    ///
    /// Returns `Ok(None)` when the precondition rejected the write.
    pub async fn set_when<F>(&self, patch: SessionPatch, precondition: F) -> Result<Option<SessionState>>
    where
        F: FnOnce(&SessionState) -> bool,
    {
        let mut state = self.state.lock().await;
        if !precondition(&state) {
            debug!(phase = %state.phase, "Session write skipped, precondition failed");
            return Ok(None);
        }

        let next = state.apply(patch)?;
        self.commit(&mut state, next.clone()).await;
        Ok(Some(next))
    }

    /// Moves to `Unauthenticated`, dropping all session data.
    ///
    /// Returns whether a session was active before the call.
    pub async fn clear(&self) -> bool {
        let mut state = self.state.lock().await;
        let was_active = state.is_active();

        if state.phase == LifecyclePhase::Unauthenticated {
            if let Err(e) = self.persistence.clear().await {
                warn!(error = %e, "Failed to clear session record");
            }
            return false;
        }

        let next = SessionState {
            phase: LifecyclePhase::Unauthenticated,
            ..SessionState::default()
        };
        self.commit(&mut state, next).await;
        was_active
    }

    /// Full state updates, including the credential.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// `{is_authenticated, user, loading}` updates for UI consumers.
    pub fn subscribe_snapshot(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    async fn commit(&self, state: &mut SessionState, next: SessionState) {
        let from = state.phase;
        *state = next;

        self.state_tx.send_replace(state.clone());
        self.snapshot_tx.send_if_modified(|snapshot| {
            let fresh = state.snapshot();
            if *snapshot == fresh {
                return false;
            }
            *snapshot = fresh;
            true
        });

        if from != state.phase {
            debug!(from = %from, to = %state.phase, "Session phase changed");
        }

        // Storage failures never roll back the in-memory commit.
        if let Err(e) = self.persistence.mirror(state).await {
            warn!(error = %e, phase = %state.phase, "Failed to mirror session record");
        }
    }
}
