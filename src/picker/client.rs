use crate::error::JournalError;
use crate::google_oauth::credentials::GoogleCredential;
use crate::picker::session::{PickerSession, Resizing};
use crate::types::picker_api::PickedMediaItem;
use async_trait::async_trait;

/// Provider-side picker sessions. Implementations hold no per-session state
/// of their own; the credential is supplied on every call.
#[async_trait]
pub trait PhotoSessionClient: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &'static str;

    fn resizing(&self) -> Resizing;

    /// Allocate a new picking session. One outbound call.
    async fn create_session(
        &self,
        auth: Option<&GoogleCredential>,
    ) -> Result<PickerSession, JournalError>;

    /// Current state of a session. Idempotent; one outbound call.
    async fn poll_session(
        &self,
        auth: Option<&GoogleCredential>,
        session_id: &str,
    ) -> Result<PickerSession, JournalError>;

    /// Items of a finalized selection, as the provider reports them.
    async fn list_media_items(
        &self,
        auth: Option<&GoogleCredential>,
        session_id: &str,
    ) -> Result<Vec<PickedMediaItem>, JournalError>;

    /// Release a session the user abandoned.
    async fn delete_session(
        &self,
        _auth: Option<&GoogleCredential>,
        _session_id: &str,
    ) -> Result<(), JournalError> {
        Ok(())
    }
}
