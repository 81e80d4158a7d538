use crate::error::JournalError;
use crate::google_oauth::credentials::GoogleCredential;
use crate::picker::client::PhotoSessionClient;
use crate::picker::fetch::PhotoFetcher;
use crate::picker::session::{PickerSession, SelectedPhoto};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info, warn};

/// Why a poller ended in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    SessionNotFound,
    NotAuthenticated,
    FetchFailed,
    /// The polling task itself died.
    Internal,
}

/// `Idle -> Polling -> {Completed, TimedOut, Cancelled, Failed}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PollerState {
    Idle,
    Polling { polls: u32 },
    Completed { photos: Vec<SelectedPhoto> },
    TimedOut,
    Cancelled,
    Failed { reason: FailureKind, message: String },
}

impl PollerState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollerState::Idle | PollerState::Polling { .. })
    }

    fn failed(reason: FailureKind, err: &JournalError) -> Self {
        PollerState::Failed {
            reason,
            message: err.to_string(),
        }
    }
}

/// Drives `poll_session` for one picker session until exactly one terminal
/// state is reached. Ticks are strictly sequential: the next one is scheduled
/// only after the previous call has resolved.
pub struct SessionPoller {
    client: Arc<dyn PhotoSessionClient>,
    fetcher: PhotoFetcher,
    auth: Option<GoogleCredential>,
    session: PickerSession,
    state: watch::Sender<PollerState>,
}

impl SessionPoller {
    pub fn new(
        client: Arc<dyn PhotoSessionClient>,
        fetcher: PhotoFetcher,
        auth: Option<GoogleCredential>,
        session: PickerSession,
    ) -> Self {
        let (state, _) = watch::channel(PollerState::Idle);
        Self {
            client,
            fetcher,
            auth,
            session,
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<PollerState> {
        self.state.subscribe()
    }

    /// Run on a background task. Dropping the returned handle cancels it.
    ///
    /// A panicking poll loop still ends in a terminal state
    /// (`Failed { Internal }`) so waiters are never left hanging.
    pub fn spawn(self) -> PollerHandle {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let state = self.subscribe();
        let sender = self.state.clone();
        let session_id = self.session.id.clone();
        tokio::spawn(async move {
            let Err(e) = tokio::spawn(self.run(cancel_rx)).await else {
                return;
            };
            error!(session_id = %session_id, error = %e, "Picker poller task died");
            advance(
                &sender,
                PollerState::Failed {
                    reason: FailureKind::Internal,
                    message: format!("poller task died: {e}"),
                },
            );
        });
        PollerHandle {
            state,
            cancel: cancel_tx,
        }
    }

    /// Poll until a terminal state; returns it. `cancel` flips to `true` (or
    /// its sender is dropped) to request cancellation.
    pub async fn run(self, mut cancel: watch::Receiver<bool>) -> PollerState {
        let session_id = self.session.id.clone();
        let interval = self.session.polling_config.interval();
        let started = Instant::now();
        let deadline = started
            .checked_add(self.session.polling_config.timeout())
            .unwrap_or_else(far_future);
        self.transition(PollerState::Polling { polls: 0 });
        info!(
            session_id = %session_id,
            interval_ms = self.session.polling_config.interval_ms,
            timeout_ms = self.session.polling_config.timeout_ms,
            "Picker polling started"
        );

        let mut polls: u32 = 0;
        let mut next_tick = started;
        let outcome = loop {
            tokio::select! {
                biased;
                _ = cancelled(&mut cancel) => break PollerState::Cancelled,
                _ = sleep_until(next_tick.min(deadline)) => {}
            }
            if is_cancelled(&cancel) {
                break PollerState::Cancelled;
            }
            if Instant::now() >= deadline {
                break PollerState::TimedOut;
            }

            let tick_started = Instant::now();
            polls += 1;
            let result = self
                .client
                .poll_session(self.auth.as_ref(), &session_id)
                .await;
            // An in-flight call may finish after cancellation; drop its result.
            if is_cancelled(&cancel) {
                break PollerState::Cancelled;
            }

            match result {
                Ok(session) if session.media_items_set => {
                    info!(session_id = %session_id, polls, "Picker selection finalized");
                    break self.fetch_selection(&session_id, &cancel).await;
                }
                Ok(_) => {
                    debug!(session_id = %session_id, polls, "Selection not finalized yet");
                }
                Err(e) if e.ends_polling() => {
                    warn!(session_id = %session_id, polls, error = %e, "Picker polling failed");
                    let reason = match e {
                        JournalError::NotAuthenticated => FailureKind::NotAuthenticated,
                        _ => FailureKind::SessionNotFound,
                    };
                    break PollerState::failed(reason, &e);
                }
                Err(e) => {
                    warn!(
                        session_id = %session_id,
                        polls,
                        error = %e,
                        "Transient picker poll error; will retry on next tick"
                    );
                }
            }

            self.transition(PollerState::Polling { polls });
            next_tick = tick_started.checked_add(interval).unwrap_or(deadline);
        };

        match &outcome {
            PollerState::Completed { photos } => {
                info!(session_id = %session_id, count = photos.len(), "Picker session completed")
            }
            PollerState::TimedOut => info!(session_id = %session_id, polls, "Picker session timed out"),
            PollerState::Cancelled => debug!(session_id = %session_id, "Picker session cancelled"),
            _ => {}
        }
        self.transition(outcome.clone());
        outcome
    }

    async fn fetch_selection(
        &self,
        session_id: &str,
        cancel: &watch::Receiver<bool>,
    ) -> PollerState {
        let result = self
            .fetcher
            .fetch_selected(self.auth.as_ref(), session_id)
            .await;
        if is_cancelled(cancel) {
            return PollerState::Cancelled;
        }
        match result {
            Ok(photos) => PollerState::Completed { photos },
            Err(e) => PollerState::failed(FailureKind::FetchFailed, &e),
        }
    }

    fn transition(&self, next: PollerState) -> bool {
        advance(&self.state, next)
    }
}

/// Terminal states are final: later transitions are ignored.
fn advance(state: &watch::Sender<PollerState>, next: PollerState) -> bool {
    state.send_if_modified(|current| {
        if current.is_terminal() {
            return false;
        }
        *current = next;
        true
    })
}

// About thirty years out.
fn far_future() -> Instant {
    Instant::now() + Duration::from_secs(86400 * 365 * 30)
}

fn is_cancelled(cancel: &watch::Receiver<bool>) -> bool {
    *cancel.borrow() || cancel.has_changed().is_err()
}

async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            return;
        }
    }
}

/// Owner side of a spawned [`SessionPoller`].
pub struct PollerHandle {
    state: watch::Receiver<PollerState>,
    cancel: watch::Sender<bool>,
}

impl PollerHandle {
    pub fn state(&self) -> PollerState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PollerState> {
        self.state.clone()
    }

    /// Request cancellation. Returns false when the poller already finished.
    pub fn cancel(&self) -> bool {
        if self.state.borrow().is_terminal() {
            return false;
        }
        self.cancel.send_replace(true);
        true
    }

    /// Wait for the terminal state.
    pub async fn wait(&self) -> PollerState {
        let mut rx = self.state.clone();
        match rx.wait_for(PollerState::is_terminal).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.cancel.send_replace(true);
    }
}
