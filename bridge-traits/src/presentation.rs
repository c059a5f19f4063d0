//! Presentation Hooks
//!
//! The session core never renders UI itself. When a session ends involuntarily
//! it asks the host to show a message and to route the user to sign-in.

use async_trait::async_trait;

/// User-facing notification surface (toast, banner, status line).
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Show a short message to the user.
    ///
    /// The future resolves once the message has been handed to the host,
    /// so callers can order it before navigation.
    async fn notify(&self, message: &str);
}

/// Host router.
#[async_trait]
pub trait Navigator: Send + Sync {
    /// Route the user to the sign-in view.
    async fn navigate_to_sign_in(&self);
}
