//! # Core Configuration Module
//!
//! Provides configuration for the console's session core.
//!
//! ## Overview
//!
//! [`SessionConfig`] carries the timing thresholds of the session lifecycle.
//! [`CoreConfig`] is assembled through a builder that collects the host
//! bridges and fails fast when a required capability is missing.
//!
//! ## Required Dependencies
//!
//! - `HttpClient` - backend profile fetch and identity service calls
//! - `LocalStore` - durable session record
//! - `SecureStore` - identity adapter secrets
//! - `Notifier` / `Navigator` - forced sign-out presentation
//!
//! When the `desktop-shims` feature is enabled, desktop-ready defaults are
//! injected for any of these that were not provided. `Clock` always defaults to
//! [`SystemClock`].
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CoreConfig, SessionConfig};
//! use std::time::Duration;
//!
//! let config = CoreConfig::builder()
//!     .api_base_url("https://api.gymdesk.example")
//!     .database_path("/var/lib/gymdesk/session.db")
//!     .session(SessionConfig::default().with_fresh_login_threshold(Duration::from_secs(15)))
//!     .build()
//!     .await?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{
    Clock, HttpClient, LocalStore, LoggerSink, Navigator, Notifier, SecureStore, SystemClock,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Timing thresholds of the session lifecycle.
///
/// The fresh-login threshold and guard-clear delay are heuristic debounces
/// against the identity provider's event ordering and can be tuned per
/// deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Absolute session validity measured from login.
    pub session_window: Duration,
    /// Proactive credential refresh period.
    pub refresh_interval: Duration,
    /// Session-window check period.
    pub window_check_interval: Duration,
    /// Grace period after login during which provider sign-out events are noise.
    pub fresh_login_threshold: Duration,
    /// How long the login guard stays raised after the profile fetch completes.
    pub login_guard_clear_delay: Duration,
    /// Delay before the Invalid-Session Signal accepts a new episode.
    pub invalidation_reset_delay: Duration,
    /// Backend path returning the signed-in user's profile.
    pub profile_path: String,
    /// Timeout applied to session-critical HTTP calls.
    pub request_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_window: Duration::from_secs(24 * 60 * 60),
            refresh_interval: Duration::from_secs(50 * 60),
            window_check_interval: Duration::from_secs(5 * 60),
            fresh_login_threshold: Duration::from_secs(10),
            login_guard_clear_delay: Duration::from_secs(2),
            invalidation_reset_delay: Duration::from_secs(1),
            profile_path: "/auth/me".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl SessionConfig {
    pub fn with_session_window(mut self, window: Duration) -> Self {
        self.session_window = window;
        self
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn with_window_check_interval(mut self, interval: Duration) -> Self {
        self.window_check_interval = interval;
        self
    }

    pub fn with_fresh_login_threshold(mut self, threshold: Duration) -> Self {
        self.fresh_login_threshold = threshold;
        self
    }

    pub fn with_login_guard_clear_delay(mut self, delay: Duration) -> Self {
        self.login_guard_clear_delay = delay;
        self
    }

    pub fn with_invalidation_reset_delay(mut self, delay: Duration) -> Self {
        self.invalidation_reset_delay = delay;
        self
    }

    pub fn with_profile_path(mut self, path: impl Into<String>) -> Self {
        self.profile_path = path.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// The session window as a `chrono` duration, for wall-clock comparisons.
    pub fn session_window_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.session_window).unwrap_or(chrono::Duration::MAX)
    }

    /// The fresh-login threshold as a `chrono` duration.
    pub fn fresh_login_threshold_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.fresh_login_threshold).unwrap_or(chrono::Duration::MAX)
    }

    /// Validates the configuration.
    ///
    /// Rejects:
    /// - zero durations
    /// - a refresh interval not shorter than the session window
    /// - a window-check interval longer than the session window
    /// - a guard-clear delay longer than the fresh-login threshold
    /// - a profile path not starting with `/`
    pub fn validate(&self) -> Result<()> {
        let durations = [
            ("session_window", self.session_window),
            ("refresh_interval", self.refresh_interval),
            ("window_check_interval", self.window_check_interval),
            ("fresh_login_threshold", self.fresh_login_threshold),
            ("login_guard_clear_delay", self.login_guard_clear_delay),
            ("invalidation_reset_delay", self.invalidation_reset_delay),
            ("request_timeout", self.request_timeout),
        ];
        if let Some((name, _)) = durations.iter().find(|(_, d)| d.is_zero()) {
            return Err(Error::Config(format!("{} must be greater than zero", name)));
        }

        if self.refresh_interval >= self.session_window {
            return Err(Error::Config(
                "refresh_interval must be shorter than session_window".to_string(),
            ));
        }

        if self.window_check_interval > self.session_window {
            return Err(Error::Config(
                "window_check_interval cannot exceed session_window".to_string(),
            ));
        }

        if self.login_guard_clear_delay > self.fresh_login_threshold {
            return Err(Error::Config(
                "login_guard_clear_delay cannot exceed fresh_login_threshold".to_string(),
            ));
        }

        if !self.profile_path.starts_with('/') {
            return Err(Error::Config(
                "profile_path must start with '/'".to_string(),
            ));
        }

        Ok(())
    }
}

/// Core configuration for the console's session core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Backend base URL, e.g. `https://api.gymdesk.example`
    pub api_base_url: String,

    /// HTTP client for backend and identity service calls
    pub http_client: Arc<dyn HttpClient>,

    /// Durable storage for the session record
    pub local_store: Arc<dyn LocalStore>,

    /// Secret storage for the identity adapter
    pub secure_store: Arc<dyn SecureStore>,

    /// Wall-clock source
    pub clock: Arc<dyn Clock>,

    /// User-facing notifications
    pub notifier: Arc<dyn Notifier>,

    /// Routing to sign-in
    pub navigator: Arc<dyn Navigator>,

    /// Optional host log forwarding
    pub logger_sink: Option<Arc<dyn LoggerSink>>,

    /// Session timings
    pub session: SessionConfig,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("api_base_url", &self.api_base_url)
            .field("http_client", &"HttpClient { ... }")
            .field("local_store", &"LocalStore { ... }")
            .field("secure_store", &"SecureStore { ... }")
            .field("clock", &self.clock.now())
            .field("notifier", &"Notifier { ... }")
            .field("navigator", &"Navigator { ... }")
            .field(
                "logger_sink",
                &self.logger_sink.as_ref().map(|_| "LoggerSink { ... }"),
            )
            .field("session", &self.session)
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        let parsed = url::Url::parse(&self.api_base_url)
            .map_err(|e| Error::Config(format!("Invalid api_base_url: {}", e)))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "api_base_url must use http or https, got '{}'",
                parsed.scheme()
            )));
        }

        self.session.validate()
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn capability_missing(capability: &str, message: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: message.to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
mod desktop_defaults {
    use super::*;
    use bridge_desktop::{
        KeyringSecureStore, ReqwestHttpClient, SqliteLocalStore, TracingNavigator,
        TracingNotifier,
    };

    pub(super) fn http_client(timeout: Duration) -> Result<Arc<dyn HttpClient>> {
        Ok(Arc::new(ReqwestHttpClient::with_timeout(timeout)?))
    }

    pub(super) async fn local_store(
        database_path: Option<PathBuf>,
    ) -> Result<Arc<dyn LocalStore>> {
        let path = database_path.ok_or_else(|| {
            Error::Config(
                "Database path is required for the default LocalStore. \
                 Use .database_path() or inject a LocalStore."
                    .to_string(),
            )
        })?;

        let store = SqliteLocalStore::new(path).await.map_err(|e| {
            Error::Internal(format!("Failed to initialize default LocalStore: {}", e))
        })?;
        Ok(Arc::new(store))
    }

    pub(super) fn secure_store() -> Arc<dyn SecureStore> {
        Arc::new(KeyringSecureStore::new())
    }

    pub(super) fn notifier() -> Arc<dyn Notifier> {
        Arc::new(TracingNotifier)
    }

    pub(super) fn navigator() -> Arc<dyn Navigator> {
        Arc::new(TracingNavigator)
    }
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    api_base_url: Option<String>,
    database_path: Option<PathBuf>,
    http_client: Option<Arc<dyn HttpClient>>,
    local_store: Option<Arc<dyn LocalStore>>,
    secure_store: Option<Arc<dyn SecureStore>>,
    clock: Option<Arc<dyn Clock>>,
    notifier: Option<Arc<dyn Notifier>>,
    navigator: Option<Arc<dyn Navigator>>,
    logger_sink: Option<Arc<dyn LoggerSink>>,
    session: Option<SessionConfig>,
}

impl CoreConfigBuilder {
    /// Sets the backend base URL (required).
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    /// Sets the SQLite file used by the default desktop `LocalStore`.
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Sets the HTTP client implementation.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the durable local storage implementation.
    pub fn local_store(mut self, store: Arc<dyn LocalStore>) -> Self {
        self.local_store = Some(store);
        self
    }

    /// Sets the secure store implementation.
    pub fn secure_store(mut self, store: Arc<dyn SecureStore>) -> Self {
        self.secure_store = Some(store);
        self
    }

    /// Sets the clock. Defaults to [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Sets the user notification surface.
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Sets the router used to reach the sign-in view.
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Sets the host logger sink.
    pub fn logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    /// Sets the session timings. Defaults to [`SessionConfig::default`].
    pub fn session(mut self, session: SessionConfig) -> Self {
        self.session = Some(session);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// Opening the default desktop `LocalStore` is asynchronous, hence the
    /// async builder.
    ///
    /// # Errors
    ///
    /// - `Error::Config` when the base URL is missing or any value is invalid
    /// - `Error::CapabilityMissing` when a required bridge is absent and no
    ///   desktop default is available
    pub async fn build(self) -> Result<CoreConfig> {
        let api_base_url = self.api_base_url.ok_or_else(|| {
            Error::Config("API base URL is required. Use .api_base_url() to set it.".to_string())
        })?;
        let session = self.session.unwrap_or_default();

        #[cfg(feature = "desktop-shims")]
        let (http_client, local_store, secure_store, notifier, navigator) = (
            match self.http_client {
                Some(client) => client,
                None => desktop_defaults::http_client(session.request_timeout)?,
            },
            match self.local_store {
                Some(store) => store,
                None => desktop_defaults::local_store(self.database_path).await?,
            },
            self.secure_store
                .unwrap_or_else(desktop_defaults::secure_store),
            self.notifier.unwrap_or_else(desktop_defaults::notifier),
            self.navigator.unwrap_or_else(desktop_defaults::navigator),
        );

        #[cfg(not(feature = "desktop-shims"))]
        let (http_client, local_store, secure_store, notifier, navigator) = {
            let _ = self.database_path;
            (
                self.http_client.ok_or_else(|| {
                    capability_missing(
                        "HttpClient",
                        "HttpClient implementation is required for profile and identity calls. \
                         Desktop: enable the 'desktop-shims' feature to use ReqwestHttpClient.",
                    )
                })?,
                self.local_store.ok_or_else(|| {
                    capability_missing(
                        "LocalStore",
                        "LocalStore implementation is required to persist the session record. \
                         Desktop: enable the 'desktop-shims' feature to use SqliteLocalStore. \
                         Headless: inject MemoryLocalStore.",
                    )
                })?,
                self.secure_store.ok_or_else(|| {
                    capability_missing(
                        "SecureStore",
                        "SecureStore implementation is required for credential persistence. \
                         Desktop: enable the 'desktop-shims' feature to use KeyringSecureStore.",
                    )
                })?,
                self.notifier.ok_or_else(|| {
                    capability_missing(
                        "Notifier",
                        "Notifier implementation is required to tell the user their session ended.",
                    )
                })?,
                self.navigator.ok_or_else(|| {
                    capability_missing(
                        "Navigator",
                        "Navigator implementation is required to route the user to sign-in.",
                    )
                })?,
            )
        };

        let config = CoreConfig {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            http_client,
            local_store,
            secure_store,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            notifier,
            navigator,
            logger_sink: self.logger_sink,
            session,
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::{HttpRequest, HttpResponse, MemoryLocalStore, MemorySecureStore};

    struct NoopHttpClient;

    #[async_trait]
    impl HttpClient for NoopHttpClient {
        async fn execute(
            &self,
            _request: HttpRequest,
        ) -> std::result::Result<HttpResponse, bridge_traits::BridgeError> {
            Err(bridge_traits::BridgeError::NotAvailable("noop".to_string()))
        }
    }

    struct NoopPresenter;

    #[async_trait]
    impl Notifier for NoopPresenter {
        async fn notify(&self, _message: &str) {}
    }

    #[async_trait]
    impl Navigator for NoopPresenter {
        async fn navigate_to_sign_in(&self) {}
    }

    fn complete_builder() -> CoreConfigBuilder {
        CoreConfig::builder()
            .api_base_url("https://api.gymdesk.example/")
            .http_client(Arc::new(NoopHttpClient))
            .local_store(Arc::new(MemoryLocalStore::new()))
            .secure_store(Arc::new(MemorySecureStore::new()))
            .notifier(Arc::new(NoopPresenter))
            .navigator(Arc::new(NoopPresenter))
    }

    #[test]
    fn test_session_config_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.session_window, Duration::from_secs(86_400));
        assert_eq!(config.refresh_interval, Duration::from_secs(3_000));
        assert_eq!(config.window_check_interval, Duration::from_secs(300));
        assert_eq!(config.fresh_login_threshold, Duration::from_secs(10));
        assert_eq!(config.login_guard_clear_delay, Duration::from_secs(2));
        assert_eq!(config.profile_path, "/auth/me");
        assert!(config.validate().is_ok());
        assert_eq!(config.session_window_chrono(), chrono::Duration::hours(24));
    }

    #[test]
    fn test_session_config_rejects_zero_duration() {
        let err = SessionConfig::default()
            .with_window_check_interval(Duration::ZERO)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("window_check_interval"));
    }

    #[test]
    fn test_session_config_rejects_refresh_longer_than_window() {
        let err = SessionConfig::default()
            .with_session_window(Duration::from_secs(60))
            .with_refresh_interval(Duration::from_secs(60))
            .with_window_check_interval(Duration::from_secs(30))
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("refresh_interval"));
    }

    #[test]
    fn test_session_config_rejects_guard_longer_than_threshold() {
        let err = SessionConfig::default()
            .with_login_guard_clear_delay(Duration::from_secs(30))
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("login_guard_clear_delay"));
    }

    #[test]
    fn test_session_config_rejects_relative_profile_path() {
        let err = SessionConfig::default()
            .with_profile_path("auth/me")
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("profile_path"));
    }

    #[tokio::test]
    async fn test_builder_requires_api_base_url() {
        let result = CoreConfig::builder()
            .http_client(Arc::new(NoopHttpClient))
            .build()
            .await;

        assert!(result
            .unwrap_err()
            .to_string()
            .contains("API base URL is required"));
    }

    #[tokio::test]
    async fn test_builder_with_all_bridges() {
        let config = complete_builder().build().await.unwrap();

        assert_eq!(config.api_base_url, "https://api.gymdesk.example");
        assert_eq!(config.session, SessionConfig::default());
        assert!(config.logger_sink.is_none());
    }

    #[tokio::test]
    async fn test_builder_rejects_invalid_url() {
        let result = complete_builder()
            .api_base_url("ftp://files.example")
            .build()
            .await;
        assert!(result.unwrap_err().to_string().contains("http or https"));

        let result = complete_builder().api_base_url("not a url").build().await;
        assert!(result.unwrap_err().to_string().contains("Invalid api_base_url"));
    }

    #[tokio::test]
    async fn test_builder_validates_session_config() {
        let result = complete_builder()
            .session(SessionConfig::default().with_request_timeout(Duration::ZERO))
            .build()
            .await;
        assert!(result.unwrap_err().to_string().contains("request_timeout"));
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[tokio::test]
    async fn test_builder_requires_local_store() {
        let result = CoreConfig::builder()
            .api_base_url("https://api.gymdesk.example")
            .http_client(Arc::new(NoopHttpClient))
            .build()
            .await;

        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("LocalStore"));
        assert!(err_msg.contains("session record"));
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[tokio::test]
    async fn test_builder_requires_navigator() {
        let result = CoreConfig::builder()
            .api_base_url("https://api.gymdesk.example")
            .http_client(Arc::new(NoopHttpClient))
            .local_store(Arc::new(MemoryLocalStore::new()))
            .secure_store(Arc::new(MemorySecureStore::new()))
            .notifier(Arc::new(NoopPresenter))
            .build()
            .await;

        assert!(result.unwrap_err().to_string().contains("Navigator"));
    }

    #[cfg(feature = "desktop-shims")]
    #[tokio::test]
    async fn test_build_with_desktop_local_store() {
        let base = std::env::temp_dir().join(format!(
            "core-runtime-test-{}-{}",
            std::process::id(),
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));

        let config = CoreConfig::builder()
            .api_base_url("https://api.gymdesk.example")
            .database_path(base.join("session.db"))
            .build()
            .await
            .expect("desktop defaults should succeed");

        config
            .local_store
            .set_string("subjectId", "uid-1")
            .await
            .unwrap();
        assert_eq!(
            config.local_store.get_string("subjectId").await.unwrap(),
            Some("uid-1".to_string())
        );

        drop(config);
        let _ = tokio::fs::remove_dir_all(&base).await;
    }

    #[cfg(feature = "desktop-shims")]
    #[tokio::test]
    async fn test_desktop_local_store_needs_database_path() {
        let result = CoreConfig::builder()
            .api_base_url("https://api.gymdesk.example")
            .build()
            .await;

        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Database path is required"));
    }
}
