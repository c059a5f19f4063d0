//! Durable Session Record
//!
//! Mirrors the minimal session record into the host's [`LocalStore`] so a
//! session survives restarts. Only three keys are written:
//!
//! | Key | Value |
//! |-----|-------|
//! | `credential` | bearer credential |
//! | `subjectId` | identity provider subject |
//! | `sessionStartedAt` | session start, Unix epoch milliseconds |
//!
//! The profile is never persisted; it is fetched again after a restore.

use bridge_traits::storage::LocalStore;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::Result;
use crate::types::{Credential, SessionState, SubjectId};

pub const CREDENTIAL_KEY: &str = "credential";
pub const SUBJECT_ID_KEY: &str = "subjectId";
pub const SESSION_STARTED_AT_KEY: &str = "sessionStartedAt";

/// A session record read back from durable storage.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedSession {
    pub credential: Credential,
    pub subject_id: SubjectId,
    pub started_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SessionPersistence {
    store: Arc<dyn LocalStore>,
}

impl SessionPersistence {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    /// Writes the record for an active session, or clears it otherwise.
    pub async fn mirror(&self, state: &SessionState) -> Result<()> {
        match (&state.credential, &state.subject_id, state.started_at) {
            (Some(credential), Some(subject_id), Some(started_at)) if state.is_active() => {
                self.save(credential, subject_id, started_at).await
            }
            _ => self.clear().await,
        }
    }

    pub async fn save(
        &self,
        credential: &Credential,
        subject_id: &SubjectId,
        started_at: DateTime<Utc>,
    ) -> Result<()> {
        self.store
            .set_string(CREDENTIAL_KEY, credential.as_str())
            .await?;
        self.store
            .set_string(SUBJECT_ID_KEY, subject_id.as_str())
            .await?;
        self.store
            .set_i64(SESSION_STARTED_AT_KEY, started_at.timestamp_millis())
            .await?;

        debug!(subject_id = %subject_id, "Session record persisted");
        Ok(())
    }

    /// Loads the persisted session.
    ///
    /// Returns `Ok(None)` when no record exists. A partial or unreadable
    /// record is deleted and reported as absent.
    pub async fn load(&self) -> Result<Option<PersistedSession>> {
        let credential = self.store.get_string(CREDENTIAL_KEY).await?;
        let subject_id = self.store.get_string(SUBJECT_ID_KEY).await?;
        let started_at = match self.store.get_i64(SESSION_STARTED_AT_KEY).await {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Unreadable session start, discarding record");
                None
            }
        };

        match (credential, subject_id, started_at) {
            (None, None, None) => Ok(None),
            (Some(credential), Some(subject_id), Some(started_at_ms))
                if !credential.trim().is_empty() && !subject_id.trim().is_empty() =>
            {
                match Utc.timestamp_millis_opt(started_at_ms).single() {
                    Some(started_at) => Ok(Some(PersistedSession {
                        credential: Credential::new(credential),
                        subject_id: SubjectId::new(subject_id),
                        started_at,
                    })),
                    None => {
                        warn!(started_at_ms, "Session start out of range, discarding record");
                        self.clear().await?;
                        Ok(None)
                    }
                }
            }
            _ => {
                warn!("Incomplete session record, discarding");
                self.clear().await?;
                Ok(None)
            }
        }
    }

    /// Removes every key of the record. Missing keys are fine.
    pub async fn clear(&self) -> Result<()> {
        self.store.delete(CREDENTIAL_KEY).await?;
        self.store.delete(SUBJECT_ID_KEY).await?;
        self.store.delete(SESSION_STARTED_AT_KEY).await?;
        debug!("Session record cleared");
        Ok(())
    }
}
