use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::error::{AuthError, Result};

/// Opaque bearer credential issued by the identity provider.
///
/// The `Debug` implementation never prints the token value.
///
/// # Examples
///
/// ```
/// use core_auth::Credential;
///
/// let credential = Credential::new("eyJhbGciOi...");
/// assert_eq!(format!("{:?}", credential), "Credential([REDACTED])");
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

/// Identity provider's stable user identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(String);

impl SubjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubjectId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Denormalized user record returned by the backend profile endpoint.
///
/// Replaced wholesale on every fetch. Permissions are carried as opaque strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, alias = "tenantId")]
    pub tenant_id: Option<String>,
    /// Fields the console does not model explicitly.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl UserProfile {
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

/// Phase of the session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecyclePhase {
    Uninitialized,
    Authenticating,
    Authenticated,
    Unauthenticated,
}

impl LifecyclePhase {
    /// Phases in which a session (credential + start instant) exists.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            LifecyclePhase::Authenticating | LifecyclePhase::Authenticated
        )
    }

    /// Whether the state machine has an edge from `self` to `next`.
    ///
    /// Self-loops are allowed for `Authenticating` (restore, then a recovery
    /// commit), `Authenticated` (refresh) and `Unauthenticated` (idempotent clear).
    pub fn can_transition_to(&self, next: LifecyclePhase) -> bool {
        use LifecyclePhase::*;

        matches!(
            (self, next),
            (Uninitialized, Authenticating)
                | (Uninitialized, Unauthenticated)
                | (Authenticating, Authenticating)
                | (Authenticating, Authenticated)
                | (Authenticating, Unauthenticated)
                | (Authenticated, Authenticated)
                | (Authenticated, Authenticating)
                | (Authenticated, Unauthenticated)
                | (Unauthenticated, Authenticating)
                | (Unauthenticated, Unauthenticated)
        )
    }
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecyclePhase::Uninitialized => "UNINITIALIZED",
            LifecyclePhase::Authenticating => "AUTHENTICATING",
            LifecyclePhase::Authenticated => "AUTHENTICATED",
            LifecyclePhase::Unauthenticated => "UNAUTHENTICATED",
        };
        f.write_str(name)
    }
}

/// The single session of this process.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub phase: LifecyclePhase,
    pub credential: Option<Credential>,
    pub subject_id: Option<SubjectId>,
    pub profile: Option<UserProfile>,
    pub started_at: Option<DateTime<Utc>>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            phase: LifecyclePhase::Uninitialized,
            credential: None,
            subject_id: None,
            profile: None,
            started_at: None,
        }
    }
}

impl SessionState {
    pub fn is_active(&self) -> bool {
        self.phase.is_active()
    }

    /// Applies `patch` to a copy of this state and validates the result.
    ///
    /// The receiver is left untouched; on success the new state is returned
    /// for the caller to commit.
    pub fn apply(&self, patch: SessionPatch) -> Result<SessionState> {
        let to = patch.phase.unwrap_or(self.phase);
        let reject = |reason: &str| AuthError::InvalidStateTransition {
            from: self.phase,
            to,
            reason: reason.to_string(),
        };

        if !self.phase.can_transition_to(to) {
            return Err(reject("no such edge"));
        }

        if let Some(started_at) = &patch.started_at {
            let allowed = match to {
                LifecyclePhase::Authenticating => true,
                LifecyclePhase::Unauthenticated => started_at.is_none(),
                _ => false,
            };
            if !allowed && *started_at != self.started_at {
                return Err(reject("session start can only be set when a session begins"));
            }
        }

        let mut next = self.clone();
        next.phase = to;
        if let Some(credential) = patch.credential {
            next.credential = credential;
        }
        if let Some(subject_id) = patch.subject_id {
            next.subject_id = subject_id;
        }
        if let Some(profile) = patch.profile {
            next.profile = profile;
        }
        if let Some(started_at) = patch.started_at {
            next.started_at = started_at;
        }

        next.validate().map_err(reject)?;
        Ok(next)
    }

    fn validate(&self) -> std::result::Result<(), &'static str> {
        let has_credential = self.credential.as_ref().is_some_and(|c| !c.is_empty());

        if self.phase.is_active() {
            if self.started_at.is_none() {
                return Err("active session requires a start instant");
            }
            if !has_credential {
                return Err("active session requires a credential");
            }
            if self.subject_id.is_none() {
                return Err("active session requires a subject");
            }
            if self.phase == LifecyclePhase::Authenticated && self.profile.is_none() {
                return Err("authenticated session requires a profile");
            }
        } else if self.started_at.is_some()
            || self.credential.is_some()
            || self.subject_id.is_some()
            || self.profile.is_some()
        {
            return Err("inactive session must not carry session data");
        }

        Ok(())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            is_authenticated: self.phase == LifecyclePhase::Authenticated,
            user: self.profile.clone(),
            loading: matches!(
                self.phase,
                LifecyclePhase::Uninitialized | LifecyclePhase::Authenticating
            ),
        }
    }
}

/// Partial update of [`SessionState`].
///
/// `None` leaves a field unchanged; `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionPatch {
    pub phase: Option<LifecyclePhase>,
    pub credential: Option<Option<Credential>>,
    pub subject_id: Option<Option<SubjectId>>,
    pub profile: Option<Option<UserProfile>>,
    pub started_at: Option<Option<DateTime<Utc>>>,
}

impl SessionPatch {
    /// Login: a new window starting at `started_at`.
    pub fn begin(credential: Credential, subject_id: SubjectId, started_at: DateTime<Utc>) -> Self {
        Self {
            phase: Some(LifecyclePhase::Authenticating),
            credential: Some(Some(credential)),
            subject_id: Some(Some(subject_id)),
            profile: Some(None),
            started_at: Some(Some(started_at)),
        }
    }

    /// Startup restore of a persisted session, keeping its original start.
    pub fn restore(credential: Credential, subject_id: SubjectId, started_at: DateTime<Utc>) -> Self {
        Self::begin(credential, subject_id, started_at)
    }

    /// Profile fetched; the session is usable.
    pub fn authenticated(profile: UserProfile) -> Self {
        Self {
            phase: Some(LifecyclePhase::Authenticated),
            profile: Some(Some(profile)),
            ..Self::default()
        }
    }

    /// Credential and profile replaced by a refresh. The start instant is not touched.
    pub fn refreshed(credential: Credential, profile: UserProfile) -> Self {
        Self {
            phase: Some(LifecyclePhase::Authenticated),
            credential: Some(Some(credential)),
            profile: Some(Some(profile)),
            ..Self::default()
        }
    }

    pub fn cleared() -> Self {
        Self {
            phase: Some(LifecyclePhase::Unauthenticated),
            credential: Some(None),
            subject_id: Some(None),
            profile: Some(None),
            started_at: Some(None),
        }
    }
}

/// Reactive view of the session for the rest of the application.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub is_authenticated: bool,
    pub user: Option<UserProfile>,
    pub loading: bool,
}
