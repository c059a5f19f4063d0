//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host of the
//! console's session core.
//!
//! ## Overview
//!
//! This crate defines the contract between the session core and the host. Each
//! trait represents a capability the core requires but that is implemented
//! differently per platform (desktop shell, browser, headless test harness).
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Async HTTP requests to the backend and identity service
//!
//! ### Storage
//! - [`LocalStore`](storage::LocalStore) - Durable key-value storage for the session record
//! - [`SecureStore`](storage::SecureStore) - Secret persistence (Keychain/Secret Service)
//!
//! ### Presentation
//! - [`Notifier`](presentation::Notifier) - User-facing messages
//! - [`Navigator`](presentation::Navigator) - Routing to the sign-in view
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with a descriptive error when a required capability is
//! missing:
//!
//! ```ignore
//! let http_client = config.http_client
//!     .ok_or_else(|| Error::CapabilityMissing {
//!         capability: "HttpClient".to_string(),
//!         message: "No HTTP client implementation provided".to_string(),
//!     })?;
//! ```
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so adapters can be shared across
//! async tasks.

pub mod error;
pub mod http;
pub mod memory;
pub mod presentation;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use memory::{MemoryLocalStore, MemorySecureStore};
pub use presentation::{Navigator, Notifier};
pub use storage::{LocalStore, SecureStore};
pub use time::{Clock, ConsoleLogger, LogEntry, LogLevel, LoggerSink, ManualClock, SystemClock};
