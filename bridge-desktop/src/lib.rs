//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`
//! - `LocalStore` using a SQLite-backed key-value table
//! - `SecureStore` using the `keyring` crate
//! - `Notifier` / `Navigator` forwarding to `tracing` for shells without a UI
//!
//! ## Feature Flags
//!
//! - `secure-store`: Enable OS keychain integration (default)
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ReqwestHttpClient, SqliteLocalStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let http_client = ReqwestHttpClient::new()?;
//!     let local_store = SqliteLocalStore::new("session.db".into()).await?;
//!     // Use in core configuration
//!     Ok(())
//! }
//! ```

mod http;
mod local_store;
mod presentation;

#[cfg(feature = "secure-store")]
mod secure_store;

pub use http::ReqwestHttpClient;
pub use local_store::SqliteLocalStore;
pub use presentation::{TracingNavigator, TracingNotifier};

#[cfg(feature = "secure-store")]
pub use secure_store::KeyringSecureStore;
