//! # Event Bus System
//!
//! Provides an event-driven architecture for the console core using
//! `tokio::sync::broadcast`. The session core publishes what happens to the
//! session; UI shells, audit logs and the REST data layer subscribe.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐   emit    ┌───────────┐   subscribe   ┌────────────┐
//! │ Session Manager  ├──────────>│ EventBus  ├──────────────>│ Subscriber │
//! └──────────────────┘           │ (broadcast│               └────────────┘
//! ┌──────────────────┐   emit    │  channel) │   subscribe   ┌────────────┐
//! │ Invalid-Session  ├──────────>│           ├──────────────>│ Subscriber │
//! │ Signal           │           └───────────┘               └────────────┘
//! └──────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Auth(AuthEvent::SignedIn {
//!         subject_id: "uid-123".to_string(),
//!     }))
//!     .ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert!(matches!(event, CoreEvent::Auth(AuthEvent::SignedIn { .. })));
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber was too slow and missed `n`
//!   events. Non-fatal.
//! - **`RecvError::Closed`**: all senders were dropped. Treat as shutdown.
//!
//! Emitting with no subscribers returns `Err`; publishers in the session core
//! ignore that case.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Authentication-related events
    Auth(AuthEvent),
    /// Session-window and invalidation events
    Session(SessionEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Auth(e) => e.description(),
            CoreEvent::Session(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Auth(AuthEvent::AuthError {
                recoverable: false, ..
            }) => EventSeverity::Error,
            CoreEvent::Auth(AuthEvent::AuthError { .. }) => EventSeverity::Warning,
            CoreEvent::Session(SessionEvent::Invalidated { .. })
            | CoreEvent::Session(SessionEvent::WindowExpired { .. }) => EventSeverity::Warning,
            CoreEvent::Auth(AuthEvent::SignedIn { .. })
            | CoreEvent::Auth(AuthEvent::SignedOut { .. })
            | CoreEvent::Session(SessionEvent::Restored { .. })
            | CoreEvent::Session(SessionEvent::ExternalSignOut { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Authentication Events
// ============================================================================

/// Events emitted as the user signs in, refreshes and signs out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum AuthEvent {
    /// A login attempt started.
    SigningIn,
    /// The session reached the authenticated phase.
    SignedIn {
        /// Identity provider subject of the signed-in user.
        subject_id: String,
    },
    /// The session ended. Emitted once per session.
    SignedOut {
        /// Subject of the session that ended, if one was known.
        subject_id: Option<String>,
    },
    /// A scheduled credential refresh started.
    TokenRefreshing {
        subject_id: String,
    },
    /// Credential and profile were refreshed.
    TokenRefreshed {
        subject_id: String,
    },
    /// Authentication error occurred.
    AuthError {
        /// Human-readable error message.
        message: String,
        /// Whether the error is recoverable (e.g., retry possible).
        recoverable: bool,
    },
}

impl AuthEvent {
    fn description(&self) -> &str {
        match self {
            AuthEvent::SigningIn => "Authentication in progress",
            AuthEvent::SignedIn { .. } => "User signed in successfully",
            AuthEvent::SignedOut { .. } => "User signed out",
            AuthEvent::TokenRefreshing { .. } => "Refreshing credential",
            AuthEvent::TokenRefreshed { .. } => "Credential refreshed successfully",
            AuthEvent::AuthError { .. } => "Authentication error",
        }
    }
}

// ============================================================================
// Session Events
// ============================================================================

/// Events about the session window and forced sign-outs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SessionEvent {
    /// A persisted session was loaded at startup.
    Restored {
        subject_id: String,
        /// Session start, Unix epoch milliseconds.
        started_at_ms: i64,
    },
    /// The absolute session window elapsed.
    WindowExpired {
        subject_id: Option<String>,
    },
    /// The Invalid-Session Signal ran its sign-out sequence.
    Invalidated {
        /// Why the session was invalidated.
        reason: String,
    },
    /// The identity provider reported an out-of-band sign-out that ended the session.
    ExternalSignOut {
        subject_id: Option<String>,
    },
    /// An out-of-band sign-out was treated as noise.
    ExternalSignOutIgnored {
        reason: String,
    },
}

impl SessionEvent {
    fn description(&self) -> &str {
        match self {
            SessionEvent::Restored { .. } => "Session restored from storage",
            SessionEvent::WindowExpired { .. } => "Session window expired",
            SessionEvent::Invalidated { .. } => "Session invalidated",
            SessionEvent::ExternalSignOut { .. } => "Signed out by identity provider",
            SessionEvent::ExternalSignOutIgnored { .. } => "Ignored provider sign-out",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel for [`CoreEvent`]s.
///
/// Cheap to clone; clones publish into the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// Subscribers that fall behind by more than `capacity` events receive
    /// `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are no active subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let event_bus = EventBus::new(100);
/// let session_only = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Session(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events that match `predicate` will be returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no matching events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
