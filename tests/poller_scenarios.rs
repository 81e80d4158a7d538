use async_trait::async_trait;
use photo_journal::GoogleCredential;
use photo_journal::JournalError;
use photo_journal::picker::poller::{FailureKind, PollerState, SessionPoller};
use photo_journal::picker::{PhotoFetcher, PhotoSessionClient, PickerSession, PollingConfig, Resizing};
use photo_journal::types::picker_api::{MediaFileMetadata, PickedMediaFile, PickedMediaItem};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
enum Step {
    Pending,
    Finalized,
    NotFound,
    Unavailable,
    Panic,
}

/// Provider double answering polls from a script; exhausted scripts stay pending.
struct ScriptedClient {
    script: Mutex<VecDeque<Step>>,
    polls: AtomicU32,
    lists: AtomicU32,
    poll_delay: Duration,
    selection: usize,
    fail_listing: bool,
}

impl ScriptedClient {
    fn new(steps: &[Step]) -> Self {
        Self {
            script: Mutex::new(steps.iter().copied().collect()),
            polls: AtomicU32::new(0),
            lists: AtomicU32::new(0),
            poll_delay: Duration::ZERO,
            selection: 3,
            fail_listing: false,
        }
    }

    fn polls(&self) -> u32 {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PhotoSessionClient for ScriptedClient {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn resizing(&self) -> Resizing {
        Resizing::GoogleParams
    }

    async fn create_session(
        &self,
        _auth: Option<&GoogleCredential>,
    ) -> Result<PickerSession, JournalError> {
        Ok(session(PollingConfig::default()))
    }

    async fn poll_session(
        &self,
        _auth: Option<&GoogleCredential>,
        session_id: &str,
    ) -> Result<PickerSession, JournalError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        if !self.poll_delay.is_zero() {
            tokio::time::sleep(self.poll_delay).await;
        }
        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Step::Pending);
        let mut s = session(PollingConfig::default());
        match step {
            Step::Pending => Ok(s),
            Step::Finalized => {
                s.media_items_set = true;
                Ok(s)
            }
            Step::NotFound => Err(JournalError::SessionNotFound(session_id.to_string())),
            Step::Unavailable => Err(JournalError::ProviderUnavailable("503".to_string())),
            Step::Panic => panic!("scripted provider blew up"),
        }
    }

    async fn list_media_items(
        &self,
        _auth: Option<&GoogleCredential>,
        _session_id: &str,
    ) -> Result<Vec<PickedMediaItem>, JournalError> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        if self.fail_listing {
            return Err(JournalError::ProviderUnavailable("listing broke".to_string()));
        }
        Ok((0..self.selection).map(media_item).collect())
    }
}

fn session(polling_config: PollingConfig) -> PickerSession {
    PickerSession {
        id: "session-1".to_string(),
        picker_uri: "https://photos.google.com/picker/session-1".to_string(),
        media_items_set: false,
        polling_config,
    }
}

fn media_item(i: usize) -> PickedMediaItem {
    PickedMediaItem {
        id: format!("item-{i}"),
        create_time: None,
        kind: Some("PHOTO".to_string()),
        media_file: PickedMediaFile {
            base_url: format!("https://lh3.googleusercontent.com/item-{i}"),
            mime_type: "image/jpeg".to_string(),
            filename: Some(format!("IMG_{i}.jpg")),
            media_file_metadata: Some(MediaFileMetadata {
                width: Some(4032),
                height: Some(3024),
            }),
        },
        description: None,
    }
}

fn poller(client: &Arc<ScriptedClient>, interval_ms: u64, timeout_ms: u64) -> SessionPoller {
    let dyn_client: Arc<dyn PhotoSessionClient> = client.clone();
    let fetcher = PhotoFetcher::new(dyn_client.clone(), 200);
    SessionPoller::new(
        dyn_client,
        fetcher,
        None,
        session(PollingConfig {
            interval_ms,
            timeout_ms,
        }),
    )
}

async fn run_to_end(poller: SessionPoller) -> PollerState {
    let (_cancel_tx, cancel_rx) = watch::channel(false);
    poller.run(cancel_rx).await
}

#[tokio::test(start_paused = true)]
async fn completes_on_fourth_poll_with_all_photos() {
    let client = Arc::new(ScriptedClient::new(&[
        Step::Pending,
        Step::Pending,
        Step::Pending,
        Step::Finalized,
    ]));
    let started = Instant::now();

    let state = run_to_end(poller(&client, 2_000, 120_000)).await;

    let PollerState::Completed { photos } = state else {
        panic!("expected Completed, got {state:?}");
    };
    assert_eq!(photos.len(), 3);
    assert_eq!(
        photos[0].thumbnail_url,
        "https://lh3.googleusercontent.com/item-0=w200-h200-c"
    );
    assert_eq!(client.polls(), 4);
    assert_eq!(client.lists.load(Ordering::SeqCst), 1);
    // Ticks at 0, 2s, 4s, 6s.
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(6) && elapsed < Duration::from_secs(8));
}

#[tokio::test(start_paused = true)]
async fn missing_session_fails_without_further_ticks() {
    let client = Arc::new(ScriptedClient::new(&[Step::Pending, Step::NotFound]));

    let state = run_to_end(poller(&client, 1_000, 60_000)).await;

    assert!(matches!(
        state,
        PollerState::Failed {
            reason: FailureKind::SessionNotFound,
            ..
        }
    ));
    assert_eq!(client.polls(), 2);
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(client.polls(), 2);
}

#[tokio::test(start_paused = true)]
async fn times_out_after_two_polls() {
    let client = Arc::new(ScriptedClient::new(&[]));
    let started = Instant::now();

    let state = run_to_end(poller(&client, 2_000, 4_000)).await;

    assert_eq!(state, PollerState::TimedOut);
    assert_eq!(client.polls(), 2);
    assert!(started.elapsed() >= Duration::from_millis(4_000));
}

#[tokio::test(start_paused = true)]
async fn never_times_out_early_with_odd_intervals() {
    let client = Arc::new(ScriptedClient::new(&[]));
    let started = Instant::now();

    let state = run_to_end(poller(&client, 700, 2_500)).await;

    assert_eq!(state, PollerState::TimedOut);
    assert!(started.elapsed() >= Duration::from_millis(2_500));
    // 0, 700, 1400, 2100
    assert_eq!(client.polls(), 4);
}

#[tokio::test(start_paused = true)]
async fn transient_errors_keep_polling() {
    let client = Arc::new(ScriptedClient::new(&[
        Step::Unavailable,
        Step::Unavailable,
        Step::Finalized,
    ]));

    let state = run_to_end(poller(&client, 500, 60_000)).await;

    assert!(matches!(state, PollerState::Completed { .. }));
    assert_eq!(client.polls(), 3);
}

#[tokio::test(start_paused = true)]
async fn listing_failure_ends_in_fetch_failed() {
    let mut scripted = ScriptedClient::new(&[Step::Finalized]);
    scripted.fail_listing = true;
    let client = Arc::new(scripted);

    let state = run_to_end(poller(&client, 500, 60_000)).await;

    assert!(matches!(
        state,
        PollerState::Failed {
            reason: FailureKind::FetchFailed,
            ..
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn empty_selection_completes_with_no_photos() {
    let mut scripted = ScriptedClient::new(&[Step::Finalized]);
    scripted.selection = 0;
    let client = Arc::new(scripted);

    let state = run_to_end(poller(&client, 500, 60_000)).await;

    assert_eq!(state, PollerState::Completed { photos: vec![] });
}

#[tokio::test(start_paused = true)]
async fn cancel_discards_in_flight_result() {
    let mut scripted = ScriptedClient::new(&[Step::Finalized]);
    scripted.poll_delay = Duration::from_millis(500);
    let client = Arc::new(scripted);

    let handle = poller(&client, 1_000, 60_000).spawn();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(handle.cancel());

    assert_eq!(handle.wait().await, PollerState::Cancelled);
    // The in-flight poll resolved as finalized but was never acted on.
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(handle.state(), PollerState::Cancelled);
    assert_eq!(client.lists.load(Ordering::SeqCst), 0);
    assert!(!handle.cancel());
}

#[tokio::test(start_paused = true)]
async fn dropping_the_handle_stops_polling() {
    let client = Arc::new(ScriptedClient::new(&[]));
    let handle = poller(&client, 1_000, 60_000).spawn();
    let mut rx = handle.subscribe();

    tokio::time::sleep(Duration::from_millis(1_500)).await;
    drop(handle);

    let state = rx
        .wait_for(PollerState::is_terminal)
        .await
        .map(|s| s.clone())
        .unwrap_or(PollerState::Cancelled);
    assert_eq!(state, PollerState::Cancelled);
    let polls = client.polls();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(client.polls(), polls);
}

#[tokio::test(start_paused = true)]
async fn subscribers_see_polling_progress() {
    let client = Arc::new(ScriptedClient::new(&[Step::Pending, Step::Finalized]));
    let poller = poller(&client, 1_000, 60_000);
    let mut rx = poller.subscribe();
    assert_eq!(*rx.borrow_and_update(), PollerState::Idle);

    let handle = poller.spawn();
    let seen = rx
        .wait_for(|s| matches!(s, PollerState::Polling { polls } if *polls >= 1))
        .await
        .map(|s| s.clone());
    assert!(seen.is_ok());
    assert!(matches!(handle.wait().await, PollerState::Completed { .. }));
    assert!(handle.state().is_terminal());
}

#[tokio::test(start_paused = true)]
async fn panicking_poll_still_reaches_a_terminal_state() {
    let client = Arc::new(ScriptedClient::new(&[Step::Pending, Step::Panic]));
    let handle = poller(&client, 1_000, 60_000).spawn();

    let state = handle.wait().await;
    let PollerState::Failed { reason, message } = state else {
        panic!("expected Failed, got {state:?}");
    };
    assert_eq!(reason, FailureKind::Internal);
    assert!(message.contains("poller task died"));
    assert_eq!(client.polls(), 2);
    assert!(!handle.cancel());
}
