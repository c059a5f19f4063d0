//! Token Refresh Scheduler
//!
//! Two independent timers per authenticated session:
//!
//! - every `refresh_interval` (50 min): proactive credential + profile refresh
//! - every `window_check_interval` (5 min): absolute session-window check
//!
//! Neither fires immediately on start. A failed tick is not retried; the next
//! tick is the retry. Both timers stop on [`RefreshScheduler::stop`], on a new
//! [`RefreshScheduler::start`] and when the scheduler is dropped. Stopping
//! never interrupts a tick that has already started.

use async_trait::async_trait;
use std::sync::{Mutex, Weak};
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// What the timers drive.
#[async_trait]
pub trait RefreshTarget: Send + Sync {
    async fn refresh_credential(&self);
    async fn check_session_window(&self);
}

pub struct RefreshScheduler {
    target: Weak<dyn RefreshTarget>,
    refresh_interval: Duration,
    window_check_interval: Duration,
    running: Mutex<Option<CancellationToken>>,
}

impl RefreshScheduler {
    pub fn new(
        target: Weak<dyn RefreshTarget>,
        refresh_interval: Duration,
        window_check_interval: Duration,
    ) -> Self {
        Self {
            target,
            refresh_interval,
            window_check_interval,
            running: Mutex::new(None),
        }
    }

    /// Starts both timers, replacing any previous run.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        let token = CancellationToken::new();
        if let Some(previous) = self.lock().replace(token.clone()) {
            previous.cancel();
        }

        info!(
            refresh_secs = self.refresh_interval.as_secs(),
            window_check_secs = self.window_check_interval.as_secs(),
            "Refresh scheduler started"
        );

        spawn_timer(
            Timer::Refresh,
            self.target.clone(),
            self.refresh_interval,
            token.clone(),
        );
        spawn_timer(
            Timer::WindowCheck,
            self.target.clone(),
            self.window_check_interval,
            token,
        );
    }

    pub fn stop(&self) {
        if let Some(token) = self.lock().take() {
            token.cancel();
            debug!("Refresh scheduler stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock().as_ref().is_some_and(|token| !token.is_cancelled())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
        self.running.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Debug, Clone, Copy)]
enum Timer {
    Refresh,
    WindowCheck,
}

fn spawn_timer(
    timer: Timer,
    target: Weak<dyn RefreshTarget>,
    period: Duration,
    token: CancellationToken,
) {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!(?timer, "Timer cancelled");
                    return;
                }
                _ = interval.tick() => {}
            }

            let Some(target) = target.upgrade() else {
                debug!(?timer, "Target dropped, stopping timer");
                return;
            };
            debug!(?timer, "Timer fired");

            // A started tick runs to completion even if it stops the scheduler
            // itself; the token is only checked between ticks.
            match timer {
                Timer::Refresh => target.refresh_credential().await,
                Timer::WindowCheck => target.check_session_window().await,
            }
        }
    });
}
