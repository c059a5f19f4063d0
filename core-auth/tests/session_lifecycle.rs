//! End-to-end behavior of the session lifecycle against fake collaborators.

mod common;

use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use bridge_traits::LocalStore;
use common::{settle, BackendMode, Harness};
use core_auth::persistence::{CREDENTIAL_KEY, SESSION_STARTED_AT_KEY, SUBJECT_ID_KEY};
use core_auth::{AuthError, Credential, CredentialChange, LifecyclePhase};
use core_runtime::events::{AuthEvent, CoreEvent, SessionEvent};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

fn count_signed_out(events: &[CoreEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, CoreEvent::Auth(AuthEvent::SignedOut { .. })))
        .count()
}

async fn signed_in(h: &Harness) {
    h.manager.initialize().await.unwrap();
    h.manager.login("desk", "pw").await.unwrap();
    settle().await;
}

#[tokio::test(start_paused = true)]
async fn login_authenticates_and_persists() {
    let mut h = Harness::new();
    h.manager.initialize().await.unwrap();
    assert_eq!(h.manager.phase().await, LifecyclePhase::Unauthenticated);

    let user = h.manager.login("desk", "pw").await.unwrap();
    assert_eq!(user.id, "desk");

    assert!(h.manager.is_authenticated().await);
    assert_eq!(h.manager.current_user().await.unwrap().name, "User desk");
    assert!(h.manager.snapshot().is_authenticated);
    assert!(!h.manager.snapshot().loading);
    assert!(h.manager.is_refresh_scheduled());

    let session = h.manager.session().await.unwrap();
    assert_eq!(session.started_at, Some(common::t0()));

    assert_eq!(
        h.local.get_string(CREDENTIAL_KEY).await.unwrap().as_deref(),
        Some("tok-desk")
    );
    assert_eq!(
        h.local.get_string(SUBJECT_ID_KEY).await.unwrap().as_deref(),
        Some("desk")
    );
    assert_eq!(
        h.local.get_i64(SESSION_STARTED_AT_KEY).await.unwrap(),
        Some(common::t0().timestamp_millis())
    );

    let events = h.drain_events();
    assert!(events.contains(&CoreEvent::Auth(AuthEvent::SigningIn)));
    assert!(events.contains(&CoreEvent::Auth(AuthEvent::SignedIn {
        subject_id: "desk".to_string()
    })));
}

#[tokio::test(start_paused = true)]
async fn spurious_sign_out_after_login_keeps_session() {
    let mut h = Harness::new();
    signed_in(&h).await;

    // Guard still raised.
    h.provider.emit(CredentialChange::SignedOut);
    settle().await;
    assert!(h.manager.is_authenticated().await);

    // Guard released, still inside the fresh-login threshold.
    h.advance(Duration::from_secs(3)).await;
    assert!(!h.manager.is_login_in_progress());
    h.provider.emit(CredentialChange::SignedOut);
    settle().await;

    assert!(h.manager.is_authenticated().await);
    let events = h.drain_events();
    assert_eq!(count_signed_out(&events), 0);
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(
                e,
                CoreEvent::Session(SessionEvent::ExternalSignOutIgnored { .. })
            ))
            .count(),
        2
    );
}

#[tokio::test(start_paused = true)]
async fn sign_out_after_threshold_ends_session_once() {
    let mut h = Harness::new();
    signed_in(&h).await;
    h.advance(Duration::from_secs(15)).await;

    h.provider.emit(CredentialChange::SignedOut);
    h.provider.emit(CredentialChange::SignedOut);
    settle().await;

    assert_eq!(h.manager.phase().await, LifecyclePhase::Unauthenticated);
    assert!(h.local.list_keys().await.unwrap().is_empty());
    assert!(!h.manager.is_refresh_scheduled());

    let events = h.drain_events();
    assert_eq!(count_signed_out(&events), 1);
    assert!(events.contains(&CoreEvent::Session(SessionEvent::ExternalSignOut {
        subject_id: Some("desk".to_string())
    })));
    // External sign-out is not a forced invalidation.
    assert_eq!(h.presenter.notifications(), 0);
}

#[tokio::test(start_paused = true)]
async fn sign_out_at_exact_threshold_is_ignored() {
    let h = Harness::new();
    signed_in(&h).await;

    h.advance(Duration::from_secs(10)).await;
    h.provider.emit(CredentialChange::SignedOut);
    settle().await;
    assert!(h.manager.is_authenticated().await);

    h.advance(Duration::from_secs(1)).await;
    h.provider.emit(CredentialChange::SignedOut);
    settle().await;
    assert_eq!(h.manager.phase().await, LifecyclePhase::Unauthenticated);
}

#[tokio::test(start_paused = true)]
async fn login_without_initialize_listens_for_sign_out() {
    let h = Harness::new();
    h.manager.login("desk", "pw").await.unwrap();
    settle().await;

    h.advance(Duration::from_secs(15)).await;
    h.provider.emit(CredentialChange::SignedOut);
    settle().await;

    assert_eq!(h.manager.phase().await, LifecyclePhase::Unauthenticated);
    assert!(h.local.list_keys().await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn concurrent_invalidations_notify_once() {
    let h = Harness::new();
    signed_in(&h).await;
    h.advance(Duration::from_secs(3)).await;

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let manager = Arc::clone(&h.manager);
            tokio::spawn(async move { manager.report_unauthorized().await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(h.manager.phase().await, LifecyclePhase::Unauthenticated);
    assert_eq!(h.presenter.notifications(), 1);
    assert_eq!(h.presenter.navigations.load(Ordering::SeqCst), 1);
    assert_eq!(
        h.presenter.messages.lock().unwrap()[0],
        AuthError::TokenInvalid.user_message()
    );
}

#[tokio::test(start_paused = true)]
async fn scheduled_refresh_keeps_session_start() {
    let mut h = Harness::new();
    signed_in(&h).await;
    h.provider.queue_token(Ok(Credential::new("tok-desk-2")));

    h.advance(Duration::from_secs(50 * 60)).await;

    let session = h.manager.session().await.unwrap();
    assert_eq!(session.phase, LifecyclePhase::Authenticated);
    assert_eq!(session.credential, Some(Credential::new("tok-desk-2")));
    assert_eq!(session.started_at, Some(common::t0()));
    assert_eq!(h.backend.calls.load(Ordering::SeqCst), 2);
    assert_eq!(
        h.local.get_string(CREDENTIAL_KEY).await.unwrap().as_deref(),
        Some("tok-desk-2")
    );
    assert_eq!(
        h.local.get_i64(SESSION_STARTED_AT_KEY).await.unwrap(),
        Some(common::t0().timestamp_millis())
    );

    assert!(h
        .drain_events()
        .contains(&CoreEvent::Auth(AuthEvent::TokenRefreshed {
            subject_id: "desk".to_string()
        })));
}

#[tokio::test(start_paused = true)]
async fn session_window_boundary() {
    let h = Harness::new();
    signed_in(&h).await;
    h.advance(Duration::from_secs(3)).await;

    h.clock
        .set(common::t0() + chrono::Duration::hours(24) - chrono::Duration::seconds(1));
    h.manager.check_session_window().await;
    assert!(h.manager.is_authenticated().await);

    h.clock
        .set(common::t0() + chrono::Duration::hours(24) + chrono::Duration::seconds(1));
    h.manager.check_session_window().await;
    assert_eq!(h.manager.phase().await, LifecyclePhase::Unauthenticated);
    assert_eq!(
        h.presenter.messages.lock().unwrap().as_slice(),
        [AuthError::SessionExpired.user_message().to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn window_timer_expires_session_and_reopens_signal() {
    let h = Harness::new();
    h.provider.slow_sign_out();
    signed_in(&h).await;

    h.clock
        .set(common::t0() + chrono::Duration::hours(24) - chrono::Duration::minutes(3));
    h.advance(Duration::from_secs(2 * 60)).await;
    assert!(h.manager.is_authenticated().await);

    // The 5-minute window check fires past the 24h boundary.
    h.advance(Duration::from_secs(3 * 60 + 1)).await;
    assert_eq!(h.manager.phase().await, LifecyclePhase::Unauthenticated);
    assert!(!h.manager.is_refresh_scheduled());
    assert!(h.local.list_keys().await.unwrap().is_empty());
    assert_eq!(
        h.presenter.messages.lock().unwrap().as_slice(),
        [AuthError::SessionExpired.user_message().to_string()]
    );
    assert_eq!(h.presenter.navigations.load(Ordering::SeqCst), 1);
    assert_eq!(h.provider.sign_out_calls.load(Ordering::SeqCst), 1);

    h.advance(Duration::from_secs(2)).await;
    h.manager.login("desk", "pw").await.unwrap();
    h.manager.report_unauthorized().await;

    assert_eq!(h.manager.phase().await, LifecyclePhase::Unauthenticated);
    assert_eq!(h.presenter.notifications(), 2);
    assert_eq!(h.presenter.navigations.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn refresh_after_window_expires_instead() {
    let h = Harness::new();
    signed_in(&h).await;
    h.advance(Duration::from_secs(3)).await;

    h.clock
        .set(common::t0() + chrono::Duration::hours(25));
    let token_calls = h.provider.token_calls.load(Ordering::SeqCst);
    h.manager.refresh_now().await;

    assert_eq!(h.manager.phase().await, LifecyclePhase::Unauthenticated);
    assert_eq!(h.provider.token_calls.load(Ordering::SeqCst), token_calls);
    assert_eq!(h.presenter.notifications(), 1);
}

#[tokio::test(start_paused = true)]
async fn profile_401_signs_out_without_duplicate_notice() {
    let mut h = Harness::new();
    h.manager.initialize().await.unwrap();
    h.backend.set_mode(BackendMode::Status(401));

    h.advance(Duration::from_secs(5)).await;
    let err = h.manager.login("desk", "pw").await.unwrap_err();
    assert_eq!(err, AuthError::TokenInvalid);

    assert_eq!(h.manager.phase().await, LifecyclePhase::Unauthenticated);
    assert!(h.local.list_keys().await.unwrap().is_empty());

    h.advance(Duration::from_millis(100)).await;
    h.manager.report_unauthorized().await;

    assert_eq!(h.presenter.notifications(), 1);
    assert_eq!(h.presenter.navigations.load(Ordering::SeqCst), 1);
    assert_eq!(count_signed_out(&h.drain_events()), 1);
}

#[tokio::test(start_paused = true)]
async fn stale_record_is_cleared_without_network() {
    let local = Arc::new(bridge_traits::MemoryLocalStore::new());
    let started = common::t0() - chrono::Duration::hours(25);
    local.set_string(CREDENTIAL_KEY, "tok-old").await.unwrap();
    local.set_string(SUBJECT_ID_KEY, "desk").await.unwrap();
    local
        .set_i64(SESSION_STARTED_AT_KEY, started.timestamp_millis())
        .await
        .unwrap();

    let mut h = Harness::with_local_store(local);
    h.manager.initialize().await.unwrap();

    assert_eq!(h.manager.phase().await, LifecyclePhase::Unauthenticated);
    assert!(h.local.list_keys().await.unwrap().is_empty());
    assert_eq!(h.backend.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.provider.token_calls.load(Ordering::SeqCst), 0);
    assert!(h
        .drain_events()
        .contains(&CoreEvent::Session(SessionEvent::WindowExpired {
            subject_id: Some("desk".to_string())
        })));
}

#[tokio::test(start_paused = true)]
async fn fresh_record_is_restored_with_original_start() {
    let local = Arc::new(bridge_traits::MemoryLocalStore::new());
    let started = common::t0() - chrono::Duration::hours(1);
    local.set_string(CREDENTIAL_KEY, "tok-desk").await.unwrap();
    local.set_string(SUBJECT_ID_KEY, "desk").await.unwrap();
    local
        .set_i64(SESSION_STARTED_AT_KEY, started.timestamp_millis())
        .await
        .unwrap();

    let mut h = Harness::with_local_store(local);
    h.manager.initialize().await.unwrap();

    let session = h.manager.session().await.unwrap();
    assert_eq!(session.phase, LifecyclePhase::Authenticated);
    assert_eq!(session.started_at, Some(started));
    assert_eq!(
        h.backend.last_authorization().as_deref(),
        Some("Bearer tok-desk")
    );
    assert!(h
        .drain_events()
        .contains(&CoreEvent::Session(SessionEvent::Restored {
            subject_id: "desk".to_string(),
            started_at_ms: started.timestamp_millis(),
        })));
}

#[tokio::test(start_paused = true)]
async fn network_failure_keeps_phase_and_recovers() {
    let h = Harness::new();
    h.manager.initialize().await.unwrap();
    h.backend.set_mode(BackendMode::NetworkDown);

    let err = h.manager.login("desk", "pw").await.unwrap_err();
    assert!(err.is_transient());
    assert_eq!(h.manager.phase().await, LifecyclePhase::Authenticating);
    assert!(h.local.has_key(CREDENTIAL_KEY).await.unwrap());
    assert!(h.manager.is_refresh_scheduled());
    assert_eq!(h.presenter.notifications(), 0);

    h.backend.set_mode(BackendMode::Ok);
    h.manager.refresh_now().await;

    let session = h.manager.session().await.unwrap();
    assert_eq!(session.phase, LifecyclePhase::Authenticated);
    assert_eq!(session.started_at, Some(common::t0()));
}

#[tokio::test(start_paused = true)]
async fn refresh_failures_are_classified() {
    let mut h = Harness::new();
    signed_in(&h).await;
    h.advance(Duration::from_secs(3)).await;

    h.provider
        .queue_token(Err(AuthError::ProviderUnavailable("503".to_string())));
    h.manager.refresh_now().await;
    assert!(h.manager.is_authenticated().await);
    assert!(h.drain_events().iter().any(|e| matches!(
        e,
        CoreEvent::Auth(AuthEvent::AuthError {
            recoverable: true,
            ..
        })
    )));

    h.provider.queue_token(Err(AuthError::TokenExpired));
    h.manager.refresh_now().await;
    assert_eq!(h.manager.phase().await, LifecyclePhase::Unauthenticated);
    assert_eq!(h.presenter.notifications(), 1);
}

#[tokio::test(start_paused = true)]
async fn invalid_credentials_leave_no_session() {
    let h = Harness::new();
    h.manager.initialize().await.unwrap();
    h.provider.fail_sign_in(AuthError::InvalidCredentials);

    let err = h.manager.login("desk", "wrong").await.unwrap_err();
    assert_eq!(err, AuthError::InvalidCredentials);
    assert_eq!(h.manager.phase().await, LifecyclePhase::Unauthenticated);
    assert!(!h.manager.is_login_in_progress());
    assert_eq!(h.presenter.notifications(), 0);
}

#[tokio::test(start_paused = true)]
async fn superseded_login_does_not_overwrite_newer_session() {
    let h = Harness::new();
    h.manager.initialize().await.unwrap();
    h.backend.slow_for("tok-slow");

    let first = {
        let manager = Arc::clone(&h.manager);
        tokio::spawn(async move { manager.login("slow", "pw").await })
    };
    settle().await;

    let user = h.manager.login("fast", "pw").await.unwrap();
    assert_eq!(user.id, "fast");

    let stale = first.await.unwrap();
    assert_eq!(stale.unwrap_err(), AuthError::LoginSuperseded);

    let session = h.manager.session().await.unwrap();
    assert_eq!(session.phase, LifecyclePhase::Authenticated);
    assert_eq!(session.credential, Some(Credential::new("tok-fast")));
    assert_eq!(h.manager.current_user().await.unwrap().id, "fast");
}

#[tokio::test(start_paused = true)]
async fn logout_clears_once_and_stops_timers() {
    let mut h = Harness::new();
    signed_in(&h).await;

    h.manager.logout().await;
    h.manager.logout().await;
    settle().await;

    assert_eq!(h.manager.phase().await, LifecyclePhase::Unauthenticated);
    assert!(!h.manager.is_refresh_scheduled());
    assert!(!h.manager.is_login_in_progress());
    assert!(h.local.list_keys().await.unwrap().is_empty());
    assert_eq!(count_signed_out(&h.drain_events()), 1);

    let calls = h.backend.calls.load(Ordering::SeqCst);
    h.advance(Duration::from_secs(60 * 60)).await;
    assert_eq!(h.backend.calls.load(Ordering::SeqCst), calls);
}

#[tokio::test(start_paused = true)]
async fn provider_sign_in_is_adopted() {
    let h = Harness::new();
    h.manager.initialize().await.unwrap();

    h.provider.set_current("kiosk", "tok-kiosk");
    h.provider.emit_signed_in("kiosk");
    settle().await;

    let session = h.manager.session().await.unwrap();
    assert_eq!(session.phase, LifecyclePhase::Authenticated);
    assert_eq!(session.subject_id.unwrap().as_str(), "kiosk");
    assert_eq!(session.started_at, Some(common::t0()));
}

#[tokio::test(start_paused = true)]
async fn guarded_client_attaches_credential_and_reports_401() {
    let h = Harness::new();
    signed_in(&h).await;
    h.advance(Duration::from_secs(3)).await;

    let client = h.manager.guarded_client(h.backend.clone());
    let response = client
        .execute(HttpRequest::new(
            HttpMethod::Get,
            format!("{}/members", common::API_BASE),
        ))
        .await
        .unwrap();
    assert!(response.is_success());
    assert_eq!(
        h.backend.last_authorization().as_deref(),
        Some("Bearer tok-desk")
    );

    h.backend.set_mode(BackendMode::Status(401));
    let response = client
        .execute(HttpRequest::new(
            HttpMethod::Get,
            format!("{}/billing", common::API_BASE),
        ))
        .await
        .unwrap();
    assert!(response.is_unauthorized());

    assert_eq!(h.manager.phase().await, LifecyclePhase::Unauthenticated);
    assert_eq!(h.presenter.notifications(), 1);
}
