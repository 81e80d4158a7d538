use crate::error::JournalError;
use crate::google_oauth::credentials::GoogleCredential;
use crate::picker::client::PhotoSessionClient;
use crate::picker::fetch::PhotoFetcher;
use crate::picker::poller::{PollerHandle, PollerState, SessionPoller};
use crate::picker::session::PickerSession;

use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Messages handled by the picker registry actor.
#[derive(Debug)]
pub enum PickerRegistryMessage {
    /// Start polling a freshly created session. Err if one is already tracked.
    Start(
        PickerSession,
        Option<GoogleCredential>,
        RpcReplyPort<Result<(), JournalError>>,
    ),
    /// Current poller state, `None` for unknown (or evicted) sessions.
    State(String, RpcReplyPort<Option<PollerState>>),
    /// Watch channel of a tracked poller.
    Subscribe(String, RpcReplyPort<Option<watch::Receiver<PollerState>>>),
    /// Cancel a running poller. Replies whether a running poller was cancelled.
    Cancel(String, RpcReplyPort<bool>),

    // Internal messages (sent by the watcher tasks)
    /// A poller reached its terminal state; start the retention clock.
    Finished { session_id: String },
}

/// Handle for interacting with the picker registry.
#[derive(Clone)]
pub struct PickerRegistry {
    actor: ActorRef<PickerRegistryMessage>,
}

impl PickerRegistry {
    /// Track and start a poller for `session`.
    pub async fn start(
        &self,
        session: PickerSession,
        auth: Option<GoogleCredential>,
    ) -> Result<(), JournalError> {
        ractor::call!(self.actor, PickerRegistryMessage::Start, session, auth)
            .map_err(|e| JournalError::RactorError(format!("Start RPC failed: {e}")))?
    }

    pub async fn state(
        &self,
        session_id: impl AsRef<str>,
    ) -> Result<Option<PollerState>, JournalError> {
        ractor::call!(
            self.actor,
            PickerRegistryMessage::State,
            session_id.as_ref().to_string()
        )
        .map_err(|e| JournalError::RactorError(format!("State RPC failed: {e}")))
    }

    pub async fn subscribe(
        &self,
        session_id: impl AsRef<str>,
    ) -> Result<Option<watch::Receiver<PollerState>>, JournalError> {
        ractor::call!(
            self.actor,
            PickerRegistryMessage::Subscribe,
            session_id.as_ref().to_string()
        )
        .map_err(|e| JournalError::RactorError(format!("Subscribe RPC failed: {e}")))
    }

    /// Wait until the session's poller is terminal. `None` for unknown sessions.
    pub async fn wait(
        &self,
        session_id: impl AsRef<str>,
    ) -> Result<Option<PollerState>, JournalError> {
        let Some(mut rx) = self.subscribe(session_id).await? else {
            return Ok(None);
        };
        let waited = rx.wait_for(PollerState::is_terminal).await.map(|s| s.clone());
        let state = match waited {
            Ok(state) => state,
            Err(_) => rx.borrow().clone(),
        };
        Ok(Some(state))
    }

    pub async fn cancel(&self, session_id: impl AsRef<str>) -> Result<bool, JournalError> {
        ractor::call!(
            self.actor,
            PickerRegistryMessage::Cancel,
            session_id.as_ref().to_string()
        )
        .map_err(|e| JournalError::RactorError(format!("Cancel RPC failed: {e}")))
    }
}

/// What the registry needs to build pollers.
pub struct PickerRegistryArgs {
    pub client: Arc<dyn PhotoSessionClient>,
    pub fetcher: PhotoFetcher,
    /// How long finished pollers stay queryable.
    pub retention: Duration,
}

struct TrackedPoller {
    handle: PollerHandle,
    auth: Option<GoogleCredential>,
    finished_at: Option<Instant>,
}

struct PickerRegistryState {
    client: Arc<dyn PhotoSessionClient>,
    fetcher: PhotoFetcher,
    retention: Duration,
    pollers: HashMap<String, TrackedPoller>,
}

impl PickerRegistryState {
    fn evict_expired(&mut self) {
        let retention = self.retention;
        let before = self.pollers.len();
        self.pollers.retain(|_, tracked| {
            tracked
                .finished_at
                .is_none_or(|at| at.elapsed() < retention)
        });
        let evicted = before - self.pollers.len();
        if evicted > 0 {
            debug!(evicted, "Evicted finished picker sessions");
        }
    }
}

/// ractor-based registry of one poller per picker session.
struct PickerRegistryActor;

#[ractor::async_trait]
impl Actor for PickerRegistryActor {
    type Msg = PickerRegistryMessage;
    type State = PickerRegistryState;
    type Arguments = PickerRegistryArgs;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        info!(
            provider = args.client.name(),
            retention_secs = args.retention.as_secs(),
            "PickerRegistry started"
        );
        Ok(PickerRegistryState {
            client: args.client,
            fetcher: args.fetcher,
            retention: args.retention,
            pollers: HashMap::new(),
        })
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            PickerRegistryMessage::Start(session, auth, rp) => {
                let result = self.handle_start(state, &myself, session, auth);
                let _ = rp.send(result);
            }
            PickerRegistryMessage::State(session_id, rp) => {
                state.evict_expired();
                let current = state.pollers.get(&session_id).map(|t| t.handle.state());
                let _ = rp.send(current);
            }
            PickerRegistryMessage::Subscribe(session_id, rp) => {
                state.evict_expired();
                let rx = state.pollers.get(&session_id).map(|t| t.handle.subscribe());
                let _ = rp.send(rx);
            }
            PickerRegistryMessage::Cancel(session_id, rp) => {
                let cancelled = self.handle_cancel(state, &session_id);
                let _ = rp.send(cancelled);
            }
            PickerRegistryMessage::Finished { session_id } => {
                if let Some(tracked) = state.pollers.get_mut(&session_id) {
                    tracked.finished_at.get_or_insert_with(Instant::now);
                    debug!(session_id = %session_id, state = ?tracked.handle.state(), "Picker poller finished");
                }
                state.evict_expired();
            }
        }
        Ok(())
    }
}

impl PickerRegistryActor {
    fn handle_start(
        &self,
        state: &mut PickerRegistryState,
        myself: &ActorRef<PickerRegistryMessage>,
        session: PickerSession,
        auth: Option<GoogleCredential>,
    ) -> Result<(), JournalError> {
        state.evict_expired();
        if state.pollers.contains_key(&session.id) {
            warn!(session_id = %session.id, "Picker session already tracked; refusing second poller");
            return Err(JournalError::AlreadyPolling(session.id));
        }

        let session_id = session.id.clone();
        let poller = SessionPoller::new(
            state.client.clone(),
            state.fetcher.clone(),
            auth.clone(),
            session,
        );
        let handle = poller.spawn();

        // Report the terminal transition back so the retention clock starts.
        let mut rx = handle.subscribe();
        let actor = myself.clone();
        let watched_id = session_id.clone();
        tokio::spawn(async move {
            let _ = rx.wait_for(PollerState::is_terminal).await;
            let _ = ractor::cast!(
                actor,
                PickerRegistryMessage::Finished {
                    session_id: watched_id
                }
            );
        });

        state.pollers.insert(
            session_id.clone(),
            TrackedPoller {
                handle,
                auth,
                finished_at: None,
            },
        );
        info!(session_id = %session_id, active = state.pollers.len(), "Picker poller registered");
        Ok(())
    }

    fn handle_cancel(&self, state: &mut PickerRegistryState, session_id: &str) -> bool {
        let Some(tracked) = state.pollers.get(session_id) else {
            return false;
        };
        if !tracked.handle.cancel() {
            return false;
        }
        info!(session_id, "Picker session cancelled");

        // Best effort: release the abandoned session on the provider side.
        let client = state.client.clone();
        let auth = tracked.auth.clone();
        let session_id = session_id.to_string();
        tokio::spawn(async move {
            if let Err(e) = client.delete_session(auth.as_ref(), &session_id).await {
                debug!(session_id = %session_id, error = %e, "Deleting cancelled picker session failed");
            }
        });
        true
    }
}

/// Spawn an unnamed registry actor and return its handle.
pub async fn spawn(args: PickerRegistryArgs) -> Result<PickerRegistry, JournalError> {
    let (actor, _jh) = Actor::spawn(None, PickerRegistryActor, args)
        .await
        .map_err(|e| JournalError::RactorError(format!("spawn PickerRegistry failed: {e}")))?;
    Ok(PickerRegistry { actor })
}
