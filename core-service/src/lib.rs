//! Console service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (HTTP, durable local
//! storage, secure storage, presentation hooks) into the session core. Desktop
//! hosts typically enable the `desktop-shims` feature, which lets
//! [`CoreConfig`](core_runtime::config::CoreConfig) fill in `bridge-desktop`
//! adapters for anything not injected.
//!
//! ```no_run
//! # async fn example() -> core_service::Result<()> {
//! use core_auth::IdentityConfig;
//! use core_runtime::config::CoreConfig;
//! use core_service::ConsoleService;
//!
//! let config = CoreConfig::builder()
//!     .api_base_url("https://api.gymdesk.example")
//!     .database_path("/var/lib/gymdesk/session.db")
//!     .build()
//!     .await?;
//!
//! let console = ConsoleService::bootstrap_with_identity(config, IdentityConfig::from_env()?).await?;
//! console.session().login("frontdesk@gym.example", "hunter2").await?;
//! # Ok(())
//! # }
//! ```

pub mod error;

pub use error::{CoreError, Result};

use std::sync::Arc;

use core_auth::{
    CredentialProvider, IdentityConfig, RestIdentityProvider, SessionHttpClient, SessionManager,
};
use core_runtime::config::CoreConfig;
use core_runtime::events::{EventBus, EventStream, DEFAULT_EVENT_BUFFER_SIZE};
use tracing::info;

/// Primary façade exposed to host applications.
pub struct ConsoleService {
    config: CoreConfig,
    event_bus: EventBus,
    session: Arc<SessionManager>,
}

impl ConsoleService {
    /// Validates `config`, builds the session manager around `provider` and
    /// restores any persisted session.
    pub async fn bootstrap(
        config: CoreConfig,
        provider: Arc<dyn CredentialProvider>,
    ) -> Result<Self> {
        config.validate()?;

        let event_bus = EventBus::new(DEFAULT_EVENT_BUFFER_SIZE);
        let session = Arc::new(SessionManager::new(&config, provider, event_bus.clone()));

        session
            .initialize()
            .await
            .map_err(|e| CoreError::InitializationFailed(e.to_string()))?;

        info!(api_base_url = %config.api_base_url, "Console core ready");
        Ok(Self {
            config,
            event_bus,
            session,
        })
    }

    /// [`bootstrap`](Self::bootstrap) with the REST identity adapter, built
    /// from the configuration's HTTP client, secure store and clock.
    pub async fn bootstrap_with_identity(
        config: CoreConfig,
        identity: IdentityConfig,
    ) -> Result<Self> {
        let provider = Arc::new(RestIdentityProvider::new(
            identity,
            config.http_client.clone(),
            config.secure_store.clone(),
            config.clock.clone(),
        ));
        Self::bootstrap(config, provider).await
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Subscribe to session and auth events.
    pub fn events(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
    }

    /// HTTP client for the REST data layer: carries the session credential
    /// and invalidates the session on 401.
    pub fn data_client(&self) -> SessionHttpClient {
        self.session.guarded_client(self.config.http_client.clone())
    }

    /// Stops background tasks. The persisted session is kept for the next start.
    pub fn shutdown(&self) {
        self.session.shutdown();
        info!("Console core shut down");
    }
}
