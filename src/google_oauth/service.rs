use super::endpoints::GoogleOauthEndpoints;
use crate::config::Config;
use crate::db::JournalStorage;
use crate::error::{IsRetryable, JournalError};
use crate::google_oauth::credentials::GoogleCredential;
use crate::google_oauth::utils::attach_email_from_id_token;
use backon::{ExponentialBuilder, Retryable};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub fn default_retry_policy() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_secs(1))
        .with_max_delay(Duration::from_secs(3))
        .with_max_times(3)
        .with_jitter()
}

/// Shared outbound HTTP client for Google endpoints.
pub fn build_http_client(cfg: &Config) -> Result<reqwest::Client, JournalError> {
    let mut builder = reqwest::Client::builder()
        .user_agent("photo-journal/0.1".to_string())
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(15))
        .redirect(reqwest::redirect::Policy::none());
    if let Some(proxy_url) = cfg.proxy.as_ref() {
        builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?);
    }
    Ok(builder.build()?)
}

/// Owns the journal owner's Google credential: loading, refreshing, storing.
#[derive(Clone)]
pub struct GoogleOauthService {
    http: reqwest::Client,
    storage: JournalStorage,
}

impl GoogleOauthService {
    pub fn new(http: reqwest::Client, storage: JournalStorage) -> Self {
        Self { http, storage }
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Stored credential, refreshed first when it is about to expire.
    ///
    /// A failed refresh is logged and the stored credential returned as is;
    /// callers see `NotAuthenticated` once its token is actually unusable.
    pub async fn current_credential(&self) -> Result<Option<GoogleCredential>, JournalError> {
        let Some(mut cred) = self.storage.load_account().await? else {
            return Ok(None);
        };
        if !cred.needs_refresh() {
            return Ok(Some(cred));
        }

        match refresh_inner(self.http.clone(), default_retry_policy(), &mut cred).await {
            Ok(()) => {
                self.storage.save_account(&cred).await?;
            }
            Err(e @ JournalError::Oauth2Server { .. }) => {
                error!("Refresh token rejected; sign-in required: {}", e);
            }
            Err(e) => {
                warn!("Token refresh failed (transient): {}", e);
            }
        }
        Ok(Some(cred))
    }

    /// Persist the credential obtained from the OAuth callback.
    pub async fn store_token_payload(
        &self,
        mut token_value: Value,
    ) -> Result<GoogleCredential, JournalError> {
        attach_email_from_id_token(&mut token_value);
        let mut credential = GoogleCredential::from_payload(&token_value)?;

        // Google omits refresh_token on repeated consent; keep the stored one.
        if credential.refresh_token.is_none()
            && let Some(existing) = self.storage.load_account().await?
        {
            credential.refresh_token = existing.refresh_token;
        }
        if credential.access_token.is_none() {
            return Err(JournalError::OauthFlowError(
                "missing access_token in OAuth response".to_string(),
            ));
        }

        self.storage.save_account(&credential).await?;
        info!(
            email = %credential.email.as_deref().unwrap_or("-"),
            "Google account linked"
        );
        Ok(credential)
    }

    pub async fn logout(&self) -> Result<(), JournalError> {
        self.storage.clear_account().await?;
        info!("Google account unlinked");
        Ok(())
    }
}

/// Refresh with retries on network-level failures, then merge the response.
pub async fn refresh_inner(
    client: reqwest::Client,
    retry_policy: ExponentialBuilder,
    creds: &mut GoogleCredential,
) -> Result<(), JournalError> {
    let snapshot = creds.clone();
    let payload =
        (|| async { GoogleOauthEndpoints::refresh_access_token(&snapshot, client.clone()).await })
            .retry(retry_policy)
            .when(|e: &JournalError| e.is_retryable())
            .notify(|err, dur: Duration| {
                error!(
                    "Google Oauth2 Retrying Error {} with sleeping {:?}",
                    err.to_string(),
                    dur
                );
            })
            .await?;
    let mut payload: Value = serde_json::to_value(&payload)?;
    debug!("Token response payload: {}", payload);
    attach_email_from_id_token(&mut payload);
    creds.update_credential(&payload)?;
    Ok(())
}
