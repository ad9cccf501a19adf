//! Deadline control that tolerates the app being backgrounded.
//!
//! A send that was suspended with the app keeps running: a deadline hit while
//! backgrounded, or a return to the foreground, pushes the deadline out by a
//! grace period instead of failing the attempt.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::debug;

/// Foreground state of the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppState {
    Active,
    Background,
}

/// Publishes app state transitions to every running deadline.
#[derive(Clone)]
pub struct AppStateSignal {
    tx: Arc<watch::Sender<AppState>>,
}

impl AppStateSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(AppState::Active);
        Self { tx: Arc::new(tx) }
    }

    pub fn set(&self, state: AppState) {
        self.tx.send_replace(state);
    }

    pub fn current(&self) -> AppState {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.tx.subscribe()
    }
}

impl Default for AppStateSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// The deadline passed without the future completing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elapsed;

/// Runs futures against a deadline that backgrounding can extend.
pub struct TimeoutController {
    timeout: Duration,
    grace: Duration,
    app_state: watch::Receiver<AppState>,
}

impl TimeoutController {
    pub fn new(timeout: Duration, grace: Duration, app_state: watch::Receiver<AppState>) -> Self {
        Self {
            timeout,
            grace,
            app_state,
        }
    }

    /// Drive `fut` to completion or until the deadline, whichever comes first.
    /// On `Elapsed` the future is dropped.
    pub async fn run<F: Future>(&mut self, fut: F) -> Result<F::Output, Elapsed> {
        tokio::pin!(fut);
        let sleep = tokio::time::sleep(self.timeout);
        tokio::pin!(sleep);

        let mut suspended = *self.app_state.borrow_and_update() == AppState::Background;
        let mut watching = true;

        loop {
            tokio::select! {
                biased;

                out = &mut fut => return Ok(out),

                changed = self.app_state.changed(), if watching => {
                    if changed.is_err() {
                        watching = false;
                        continue;
                    }
                    match *self.app_state.borrow_and_update() {
                        AppState::Background => suspended = true,
                        AppState::Active if suspended => {
                            suspended = false;
                            let extended = Instant::now() + self.grace;
                            if extended > sleep.deadline() {
                                debug!(grace_ms = self.grace.as_millis() as u64, "Resumed from background, extending deadline");
                                sleep.as_mut().reset(extended);
                            }
                        }
                        AppState::Active => {}
                    }
                }

                () = &mut sleep => {
                    if suspended {
                        debug!(grace_ms = self.grace.as_millis() as u64, "Deadline reached while backgrounded, extending");
                        sleep.as_mut().reset(Instant::now() + self.grace);
                        continue;
                    }
                    return Err(Elapsed);
                }
            }
        }
    }
}
