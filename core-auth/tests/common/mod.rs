//! Shared fakes for the session lifecycle tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::{ManualClock, MemoryLocalStore, MemorySecureStore, Navigator, Notifier};
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use core_auth::{
    AuthError, Credential, CredentialChange, CredentialGrant, CredentialProvider, ProviderUser,
    Result, SessionManager, SubjectId,
};
use core_runtime::config::{CoreConfig, SessionConfig};
use core_runtime::events::{CoreEvent, EventBus};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

pub const API_BASE: &str = "https://api.gymdesk.example";

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
}

// ---------------------------------------------------------------------------
// Identity provider
// ---------------------------------------------------------------------------

/// Signs in any identifier as subject `<identifier>` with credential `tok-<identifier>`.
pub struct FakeProvider {
    changes: broadcast::Sender<CredentialChange>,
    current: Mutex<Option<(SubjectId, Credential)>>,
    sign_in_error: Mutex<Option<AuthError>>,
    token_results: Mutex<VecDeque<Result<Credential>>>,
    slow_sign_out: AtomicBool,
    pub sign_in_calls: AtomicUsize,
    pub sign_out_calls: AtomicUsize,
    pub token_calls: AtomicUsize,
}

impl FakeProvider {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(32);
        Self {
            changes,
            current: Mutex::new(None),
            sign_in_error: Mutex::new(None),
            token_results: Mutex::new(VecDeque::new()),
            slow_sign_out: AtomicBool::new(false),
            sign_in_calls: AtomicUsize::new(0),
            sign_out_calls: AtomicUsize::new(0),
            token_calls: AtomicUsize::new(0),
        }
    }

    pub fn fail_sign_in(&self, error: AuthError) {
        *self.sign_in_error.lock().unwrap() = Some(error);
    }

    /// `sign_out` waits 10ms, like a keychain write.
    pub fn slow_sign_out(&self) {
        self.slow_sign_out.store(true, Ordering::SeqCst);
    }

    pub fn queue_token(&self, result: Result<Credential>) {
        self.token_results.lock().unwrap().push_back(result);
    }

    pub fn set_current(&self, subject: &str, credential: &str) {
        *self.current.lock().unwrap() =
            Some((SubjectId::new(subject), Credential::new(credential)));
    }

    pub fn emit(&self, change: CredentialChange) {
        let _ = self.changes.send(change);
    }

    pub fn emit_signed_in(&self, subject: &str) {
        self.emit(CredentialChange::SignedIn(ProviderUser {
            subject_id: SubjectId::new(subject),
        }));
    }
}

#[async_trait]
impl CredentialProvider for FakeProvider {
    async fn sign_in(&self, identifier: &str, _secret: &str) -> Result<CredentialGrant> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.sign_in_error.lock().unwrap().clone() {
            return Err(error);
        }

        let subject_id = SubjectId::new(identifier);
        let credential = Credential::new(format!("tok-{}", identifier));
        self.set_current(identifier, credential.as_str());
        self.emit_signed_in(identifier);

        Ok(CredentialGrant {
            credential,
            subject_id,
        })
    }

    async fn sign_out(&self) -> Result<()> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        if self.slow_sign_out.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.current.lock().unwrap().take();
        self.emit(CredentialChange::SignedOut);
        Ok(())
    }

    async fn current_token(&self, _force_refresh: bool) -> Result<Credential> {
        self.token_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(result) = self.token_results.lock().unwrap().pop_front() {
            return result;
        }
        self.current
            .lock()
            .unwrap()
            .as_ref()
            .map(|(_, credential)| credential.clone())
            .ok_or(AuthError::NotAuthenticated)
    }

    fn subscribe(&self) -> broadcast::Receiver<CredentialChange> {
        self.changes.subscribe()
    }
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
    Ok,
    Status(u16),
    NetworkDown,
}

/// Answers every request with a profile for the bearer's subject, or with the configured failure.
pub struct FakeBackend {
    mode: Mutex<BackendMode>,
    slow_credentials: Mutex<Vec<String>>,
    authorizations: Mutex<Vec<Option<String>>>,
    pub calls: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            mode: Mutex::new(BackendMode::Ok),
            slow_credentials: Mutex::new(Vec::new()),
            authorizations: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_mode(&self, mode: BackendMode) {
        *self.mode.lock().unwrap() = mode;
    }

    /// Requests carrying this credential take five seconds.
    pub fn slow_for(&self, credential: &str) {
        self.slow_credentials
            .lock()
            .unwrap()
            .push(credential.to_string());
    }

    pub fn last_authorization(&self) -> Option<String> {
        self.authorizations.lock().unwrap().last().cloned().flatten()
    }
}

#[async_trait]
impl HttpClient for FakeBackend {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let authorization = request.headers.get("Authorization").cloned();
        self.authorizations
            .lock()
            .unwrap()
            .push(authorization.clone());

        let token = authorization
            .as_deref()
            .and_then(|value| value.strip_prefix("Bearer "))
            .unwrap_or_default()
            .to_string();

        let slow = self.slow_credentials.lock().unwrap().contains(&token);
        if slow {
            tokio::time::sleep(Duration::from_secs(5)).await;
        }

        let mode = *self.mode.lock().unwrap();
        let (status, body) = match mode {
            BackendMode::NetworkDown => {
                return Err(BridgeError::Network("connection refused".to_string()))
            }
            BackendMode::Status(status) => (status, String::new()),
            BackendMode::Ok => {
                let id = token.trim_start_matches("tok-");
                (
                    200,
                    serde_json::json!({
                        "id": id,
                        "name": format!("User {}", id),
                        "role": "staff",
                        "permissions": ["members.read"]
                    })
                    .to_string(),
                )
            }
        };

        Ok(HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body),
        })
    }
}

// ---------------------------------------------------------------------------
// Presentation
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingPresenter {
    pub messages: Mutex<Vec<String>>,
    pub navigations: AtomicUsize,
}

impl RecordingPresenter {
    pub fn notifications(&self) -> usize {
        self.messages.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for RecordingPresenter {
    async fn notify(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

#[async_trait]
impl Navigator for RecordingPresenter {
    async fn navigate_to_sign_in(&self) {
        self.navigations.fetch_add(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub manager: Arc<SessionManager>,
    pub provider: Arc<FakeProvider>,
    pub backend: Arc<FakeBackend>,
    pub local: Arc<MemoryLocalStore>,
    pub presenter: Arc<RecordingPresenter>,
    pub clock: Arc<ManualClock>,
    pub events: broadcast::Receiver<CoreEvent>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_local_store(Arc::new(MemoryLocalStore::new()))
    }

    pub fn with_local_store(local: Arc<MemoryLocalStore>) -> Self {
        let provider = Arc::new(FakeProvider::new());
        let backend = Arc::new(FakeBackend::new());
        let presenter = Arc::new(RecordingPresenter::default());
        let clock = Arc::new(ManualClock::new(t0()));
        let event_bus = EventBus::new(256);
        let events = event_bus.subscribe();

        let config = CoreConfig {
            api_base_url: API_BASE.to_string(),
            http_client: backend.clone(),
            local_store: local.clone(),
            secure_store: Arc::new(MemorySecureStore::new()),
            clock: clock.clone(),
            notifier: presenter.clone(),
            navigator: presenter.clone(),
            logger_sink: None,
            session: SessionConfig::default(),
        };

        let manager = Arc::new(SessionManager::new(&config, provider.clone(), event_bus));

        Self {
            manager,
            provider,
            backend,
            local,
            presenter,
            clock,
            events,
        }
    }

    /// Moves the wall clock and tokio's paused clock together, one second at a time.
    pub async fn advance(&self, by: Duration) {
        let mut remaining = by;
        while !remaining.is_zero() {
            let step = remaining.min(Duration::from_secs(1));
            self.clock
                .advance(chrono::Duration::from_std(step).unwrap());
            tokio::time::advance(step).await;
            settle().await;
            remaining -= step;
        }
    }

    pub fn drain_events(&mut self) -> Vec<CoreEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Lets spawned tasks (listener, timers, guard release) run to quiescence.
pub async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}
