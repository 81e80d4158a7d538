use crate::config::PICKER_API_BASE;
use crate::error::{IsRetryable, JournalError};
use crate::google_oauth::credentials::{GoogleCredential, bearer_of};
use crate::google_oauth::service::default_retry_policy;
use crate::picker::client::PhotoSessionClient;
use crate::picker::session::{PickerSession, PollingConfig, Resizing};
use crate::types::picker_api::{MediaItemsPage, PickedMediaItem, SessionResource};
use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Page size for listing a finalized selection; the picker caps selections
/// well below this, so one call returns everything.
const MEDIA_PAGE_SIZE: &str = "100";

/// Google Photos Picker API client.
pub struct LiveClient {
    http: reqwest::Client,
    base: Url,
    defaults: PollingConfig,
    retry_policy: ExponentialBuilder,
}

impl LiveClient {
    pub fn new(http: reqwest::Client, defaults: PollingConfig) -> Self {
        Self::with_base(http, PICKER_API_BASE.clone(), defaults)
    }

    pub fn with_base(http: reqwest::Client, base: Url, defaults: PollingConfig) -> Self {
        Self {
            http,
            base,
            defaults,
            retry_policy: default_retry_policy(),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: ExponentialBuilder) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, JournalError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| JournalError::UrlParse(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send and decode, mapping provider statuses onto the picker taxonomy.
    async fn send_json<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
        session_id: Option<&str>,
    ) -> Result<T, JournalError> {
        let resp = req
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| JournalError::ProviderUnavailable(e.to_string()))?;
        let status = resp.status();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(JournalError::NotAuthenticated);
            }
            StatusCode::NOT_FOUND => {
                if let Some(id) = session_id {
                    return Err(JournalError::SessionNotFound(id.to_string()));
                }
            }
            _ => {}
        }
        if !status.is_success() {
            return Err(JournalError::ProviderUnavailable(format!(
                "provider answered {status}"
            )));
        }
        resp.json::<T>()
            .await
            .map_err(|e| JournalError::ProviderUnavailable(format!("malformed response: {e}")))
    }
}

#[async_trait]
impl PhotoSessionClient for LiveClient {
    fn name(&self) -> &'static str {
        "google-photos-picker"
    }

    fn resizing(&self) -> Resizing {
        Resizing::GoogleParams
    }

    async fn create_session(
        &self,
        auth: Option<&GoogleCredential>,
    ) -> Result<PickerSession, JournalError> {
        let token = bearer_of(auth)?;
        let url = self.endpoint(&["sessions"])?;

        let resource: SessionResource = (|| async {
            self.send_json(
                self.http
                    .post(url.clone())
                    .bearer_auth(token)
                    .json(&serde_json::json!({})),
                None,
            )
            .await
        })
        .retry(self.retry_policy)
        .when(|e: &JournalError| e.is_retryable())
        .notify(|err, dur: Duration| {
            warn!("createSession retrying after error {}, sleeping {:?}", err, dur);
        })
        .await?;

        let session = PickerSession::from_resource(resource, self.defaults);
        info!(session_id = %session.id, "Picker session created");
        Ok(session)
    }

    async fn poll_session(
        &self,
        auth: Option<&GoogleCredential>,
        session_id: &str,
    ) -> Result<PickerSession, JournalError> {
        let token = bearer_of(auth)?;
        let url = self.endpoint(&["sessions", session_id])?;
        let resource: SessionResource = self
            .send_json(self.http.get(url).bearer_auth(token), Some(session_id))
            .await?;
        debug!(
            session_id,
            media_items_set = resource.media_items_set,
            "Picker session polled"
        );
        Ok(PickerSession::from_resource(resource, self.defaults))
    }

    async fn list_media_items(
        &self,
        auth: Option<&GoogleCredential>,
        session_id: &str,
    ) -> Result<Vec<PickedMediaItem>, JournalError> {
        let token = bearer_of(auth)?;
        let mut url = self.endpoint(&["mediaItems"])?;
        url.query_pairs_mut()
            .append_pair("sessionId", session_id)
            .append_pair("pageSize", MEDIA_PAGE_SIZE);
        let page: MediaItemsPage = self
            .send_json(self.http.get(url).bearer_auth(token), Some(session_id))
            .await?;
        if page.next_page_token.is_some() {
            warn!(
                session_id,
                "Selection exceeds one page; only the first {} items are used", MEDIA_PAGE_SIZE
            );
        }
        Ok(page.media_items)
    }

    async fn delete_session(
        &self,
        auth: Option<&GoogleCredential>,
        session_id: &str,
    ) -> Result<(), JournalError> {
        let token = bearer_of(auth)?;
        let url = self.endpoint(&["sessions", session_id])?;
        let resp = self
            .http
            .delete(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| JournalError::ProviderUnavailable(e.to_string()))?;
        if !resp.status().is_success() && resp.status() != StatusCode::NOT_FOUND {
            return Err(JournalError::ProviderUnavailable(format!(
                "delete session answered {}",
                resp.status()
            )));
        }
        Ok(())
    }
}
