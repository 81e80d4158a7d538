use crate::error::JournalError;
use crate::google_oauth::credentials::GoogleCredential;
use crate::picker::client::PhotoSessionClient;
use crate::picker::session::{PickerSession, PollingConfig, Resizing};
use crate::types::picker_api::{MediaFileMetadata, PickedMediaFile, PickedMediaItem};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

#[derive(Debug, Default)]
struct FixtureSession {
    polls: u32,
    finalized: bool,
}

/// In-process stand-in for the picker provider, used when Google OAuth is not
/// configured and in tests. Completion is deterministic: a session finalizes
/// after `complete_after` polls (when set) or when [`FixtureClient::finalize`]
/// is called.
pub struct FixtureClient {
    defaults: PollingConfig,
    complete_after: Option<u32>,
    selection_size: usize,
    library: Vec<PickedMediaItem>,
    sessions: Mutex<HashMap<String, FixtureSession>>,
    next_id: AtomicU64,
}

impl FixtureClient {
    pub fn new(defaults: PollingConfig, complete_after: Option<u32>) -> Self {
        Self {
            defaults,
            complete_after: complete_after.filter(|n| *n > 0),
            selection_size: 5,
            library: sample_library(),
            sessions: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Number of library items a finalized selection returns.
    pub fn with_selection_size(mut self, selection_size: usize) -> Self {
        self.selection_size = selection_size;
        self
    }

    /// Mark a session's selection as finalized, as if the user clicked "Done".
    pub fn finalize(&self, session_id: &str) -> Result<(), JournalError> {
        let mut sessions = self.lock();
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| JournalError::SessionNotFound(session_id.to_string()))?;
        session.finalized = true;
        Ok(())
    }

    /// Forget a session, as if it expired on the provider side.
    pub fn expire(&self, session_id: &str) {
        self.lock().remove(session_id);
    }

    pub fn poll_count(&self, session_id: &str) -> Option<u32> {
        self.lock().get(session_id).map(|s| s.polls)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, FixtureSession>> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn view(&self, id: &str, finalized: bool) -> PickerSession {
        PickerSession {
            id: id.to_string(),
            picker_uri: format!("https://photos.google.com/picker/{id}"),
            media_items_set: finalized,
            polling_config: self.defaults,
        }
    }
}

#[async_trait]
impl PhotoSessionClient for FixtureClient {
    fn name(&self) -> &'static str {
        "fixture"
    }

    fn resizing(&self) -> Resizing {
        Resizing::QueryParams
    }

    async fn create_session(
        &self,
        _auth: Option<&GoogleCredential>,
    ) -> Result<PickerSession, JournalError> {
        let id = format!(
            "fixture-session-{}",
            self.next_id.fetch_add(1, Ordering::Relaxed)
        );
        self.lock().insert(id.clone(), FixtureSession::default());
        info!(session_id = %id, "Fixture picker session created");
        Ok(self.view(&id, false))
    }

    async fn poll_session(
        &self,
        _auth: Option<&GoogleCredential>,
        session_id: &str,
    ) -> Result<PickerSession, JournalError> {
        let mut sessions = self.lock();
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| JournalError::SessionNotFound(session_id.to_string()))?;
        session.polls += 1;
        // Counted polls stand in for the user picking on the provider side.
        if self.complete_after.is_some_and(|n| session.polls >= n) {
            session.finalized = true;
        }
        debug!(session_id, polls = session.polls, "Fixture session polled");
        let finalized = session.finalized;
        drop(sessions);
        Ok(self.view(session_id, finalized))
    }

    async fn list_media_items(
        &self,
        _auth: Option<&GoogleCredential>,
        session_id: &str,
    ) -> Result<Vec<PickedMediaItem>, JournalError> {
        let sessions = self.lock();
        let session = sessions
            .get(session_id)
            .ok_or_else(|| JournalError::SessionNotFound(session_id.to_string()))?;
        if !session.finalized {
            return Err(JournalError::SelectionPending(session_id.to_string()));
        }
        Ok(self
            .library
            .iter()
            .take(self.selection_size)
            .cloned()
            .collect())
    }

    async fn delete_session(
        &self,
        _auth: Option<&GoogleCredential>,
        session_id: &str,
    ) -> Result<(), JournalError> {
        self.expire(session_id);
        Ok(())
    }
}

pub(crate) fn sample_library() -> Vec<PickedMediaItem> {
    const SAMPLES: &[(&str, &str, &str, u32, u32, (i32, u32, u32))] = &[
        ("photo-1606787366850-de6330128bfc", "food-breakfast.jpg", "Breakfast", 1920, 1080, (2024, 8, 24)),
        ("photo-1514888286974-6c03e2ca1dba", "cat-pet.jpg", "The cat", 1920, 1280, (2024, 8, 24)),
        ("photo-1566479360739-a7e0b7a1c5ff", "sports-soccer.jpg", "Football practice", 1920, 1280, (2024, 8, 23)),
        ("photo-1511895426328-dc8714191300", "family-park.jpg", "Family in the park", 1920, 1280, (2024, 8, 23)),
        ("photo-1507003211169-0a1dd7228f2d", "portrait-dad.jpg", "Dad", 1920, 1920, (2024, 8, 22)),
        ("photo-1544005313-94ddf0286df2", "portrait-mom.jpg", "Mom", 1920, 1920, (2024, 8, 22)),
        ("photo-1503023345310-bd7c1de61c7d", "sunset-beach.jpg", "Sunset at the beach", 1920, 1080, (2024, 8, 20)),
        ("photo-1472214103451-9374bd1c798e", "nature-landscape.jpg", "Landscape", 1920, 1080, (2024, 8, 20)),
    ];

    SAMPLES
        .iter()
        .enumerate()
        .map(|(i, (path, filename, description, width, height, (y, m, d)))| PickedMediaItem {
            id: format!("fixture-media-{}", i + 1),
            create_time: Utc.with_ymd_and_hms(*y, *m, *d, 12, 0, 0).single(),
            kind: Some("PHOTO".to_string()),
            media_file: PickedMediaFile {
                base_url: format!("https://images.unsplash.com/{path}"),
                mime_type: "image/jpeg".to_string(),
                filename: Some(filename.to_string()),
                media_file_metadata: Some(MediaFileMetadata {
                    width: Some(*width),
                    height: Some(*height),
                }),
            },
            description: Some(description.to_string()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn poll_is_idempotent_without_provider_change() {
        let client = FixtureClient::new(PollingConfig::default(), None);
        let session = client.create_session(None).await.unwrap();
        for _ in 0..5 {
            let polled = client.poll_session(None, &session.id).await.unwrap();
            assert!(!polled.media_items_set);
        }
        client.finalize(&session.id).unwrap();
        for _ in 0..3 {
            let polled = client.poll_session(None, &session.id).await.unwrap();
            assert!(polled.media_items_set);
        }
    }

    #[tokio::test]
    async fn completes_after_configured_polls() {
        let client = FixtureClient::new(PollingConfig::default(), Some(3));
        let session = client.create_session(None).await.unwrap();
        assert!(!client.poll_session(None, &session.id).await.unwrap().media_items_set);
        assert!(!client.poll_session(None, &session.id).await.unwrap().media_items_set);
        assert!(client.poll_session(None, &session.id).await.unwrap().media_items_set);
        assert_eq!(client.poll_count(&session.id), Some(3));
    }

    #[tokio::test]
    async fn unknown_and_expired_sessions_are_not_found() {
        let client = FixtureClient::new(PollingConfig::default(), None);
        let err = client.poll_session(None, "nope").await.unwrap_err();
        assert!(matches!(err, JournalError::SessionNotFound(_)));

        let session = client.create_session(None).await.unwrap();
        client.expire(&session.id);
        let err = client.poll_session(None, &session.id).await.unwrap_err();
        assert!(matches!(err, JournalError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn listing_requires_finalized_selection() {
        let client = FixtureClient::new(PollingConfig::default(), None).with_selection_size(2);
        let session = client.create_session(None).await.unwrap();
        assert!(client.list_media_items(None, &session.id).await.is_err());
        client.finalize(&session.id).unwrap();
        let items = client.list_media_items(None, &session.id).await.unwrap();
        assert_eq!(items.len(), 2);
        assert!(items[0].media_file.base_url.starts_with("https://images.unsplash.com/"));
    }
}
