use crate::error::JournalError;
use crate::google_oauth::credentials::GoogleCredential;
use crate::picker::client::PhotoSessionClient;
use crate::picker::session::SelectedPhoto;
use std::sync::Arc;
use tracing::{info, warn};

/// Turns a finalized picker selection into journal-ready photos.
#[derive(Clone)]
pub struct PhotoFetcher {
    client: Arc<dyn PhotoSessionClient>,
    thumbnail_size: u32,
}

impl PhotoFetcher {
    pub fn new(client: Arc<dyn PhotoSessionClient>, thumbnail_size: u32) -> Self {
        Self {
            client,
            thumbnail_size,
        }
    }

    /// One provider call. An empty selection is a valid result; any failure
    /// is reported as `FetchFailed` since the selection is then lost.
    pub async fn fetch_selected(
        &self,
        auth: Option<&GoogleCredential>,
        session_id: &str,
    ) -> Result<Vec<SelectedPhoto>, JournalError> {
        let items = self
            .client
            .list_media_items(auth, session_id)
            .await
            .map_err(|e| {
                warn!(session_id, error = %e, "Listing picked media items failed");
                JournalError::FetchFailed(e.to_string())
            })?;

        let resizing = self.client.resizing();
        let photos: Vec<SelectedPhoto> = items
            .into_iter()
            .map(|item| SelectedPhoto::normalize(item, resizing, self.thumbnail_size))
            .collect();
        info!(session_id, count = photos.len(), "Fetched selected photos");
        Ok(photos)
    }
}
