//! # Session Core
//!
//! Client-side session lifecycle for the gym console.
//!
//! ## Overview
//!
//! This crate reconciles a locally cached session against an external identity
//! provider's asynchronous event stream, a fixed 24-hour session window that is
//! independent of the provider's short credential lifetime, and a global
//! "session invalidated" signal that fires at most once per episode.
//!
//! ## Components
//!
//! - [`CredentialProvider`]: identity provider adapter, with
//!   [`RestIdentityProvider`] as the REST implementation
//! - [`SessionStore`]: invariant-checked single source of truth, mirrored to
//!   durable storage
//! - [`InvalidSessionSignal`]: single-flight forced sign-out
//! - [`RefreshScheduler`]: credential refresh and session-window timers
//! - [`SessionManager`]: orchestrator exposing `login`, `logout`,
//!   `is_authenticated` and `current_user`
//! - [`SessionHttpClient`]: `HttpClient` decorator for the data layer

pub mod error;
pub mod guarded;
pub mod identity;
pub mod manager;
pub mod persistence;
pub mod profile;
pub mod provider;
pub mod scheduler;
pub mod signal;
pub mod store;
pub mod token_store;
pub mod types;

pub use error::{AuthError, Result};
pub use guarded::{SessionAccess, SessionHttpClient};
pub use identity::{IdentityConfig, RestIdentityProvider};
pub use manager::SessionManager;
pub use persistence::{PersistedSession, SessionPersistence};
pub use profile::ProfileClient;
pub use provider::{
    CredentialChange, CredentialGrant, CredentialProvider, ProviderErrorCode, ProviderUser,
};
pub use scheduler::{RefreshScheduler, RefreshTarget};
pub use signal::{InvalidSessionSignal, InvalidationReason, SessionTerminator};
pub use store::SessionStore;
pub use token_store::{IdentityTokenStore, StoredIdentity};
pub use types::{
    Credential, LifecyclePhase, SessionPatch, SessionSnapshot, SessionState, SubjectId,
    UserProfile,
};
