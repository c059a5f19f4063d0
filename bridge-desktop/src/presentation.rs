//! Presentation hooks for hosts without a UI layer

use async_trait::async_trait;
use bridge_traits::presentation::{Navigator, Notifier};
use tracing::{info, warn};

/// Writes user-facing messages to the log.
#[derive(Debug, Default, Clone)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, message: &str) {
        warn!(target: "gymdesk::notify", message, "User notification");
    }
}

/// Records sign-in navigation requests in the log.
#[derive(Debug, Default, Clone)]
pub struct TracingNavigator;

#[async_trait]
impl Navigator for TracingNavigator {
    async fn navigate_to_sign_in(&self) {
        info!(target: "gymdesk::navigate", "Navigating to sign-in");
    }
}
