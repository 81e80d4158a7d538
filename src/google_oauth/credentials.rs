use crate::error::JournalError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tokens refreshed once they are this close to expiry.
const REFRESH_MARGIN_SECS: i64 = 10 * 60;
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Google account credential as stored for the journal owner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GoogleCredential {
    pub email: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub scopes: Option<Vec<String>>,
    pub expiry: DateTime<Utc>,
}

impl GoogleCredential {
    /// Build from an OAuth token response (optionally enriched with `email`).
    pub fn from_payload(payload: &Value) -> Result<Self, JournalError> {
        let mut cred = GoogleCredential {
            email: None,
            access_token: None,
            refresh_token: None,
            scopes: None,
            expiry: Utc::now(),
        };
        cred.update_credential(payload)?;
        if cred.access_token.is_none() && cred.refresh_token.is_none() {
            return Err(JournalError::OauthFlowError(
                "token payload carries neither access_token nor refresh_token".to_string(),
            ));
        }
        Ok(cred)
    }

    /// Merge a token (refresh) response. Fields absent from the payload are kept.
    pub fn update_credential(&mut self, payload: &Value) -> Result<(), JournalError> {
        let obj = payload.as_object().ok_or_else(|| {
            JournalError::OauthFlowError("token payload is not a JSON object".to_string())
        })?;

        if let Some(token) = obj.get("access_token").and_then(Value::as_str) {
            self.access_token = Some(token.to_string());
            let expires_in = obj
                .get("expires_in")
                .and_then(Value::as_i64)
                .unwrap_or(DEFAULT_EXPIRES_IN_SECS);
            self.expiry = Utc::now() + Duration::seconds(expires_in);
        }
        if let Some(token) = obj.get("refresh_token").and_then(Value::as_str) {
            self.refresh_token = Some(token.to_string());
        }
        if let Some(email) = obj.get("email").and_then(Value::as_str) {
            self.email = Some(email.to_string());
        }
        if let Some(scope) = obj.get("scope").and_then(Value::as_str) {
            self.scopes = Some(scope.split_whitespace().map(str::to_string).collect());
        }
        Ok(())
    }

    /// The access token, if present and not yet expired.
    pub fn usable_token(&self) -> Option<&str> {
        self.access_token
            .as_deref()
            .filter(|_| self.expiry > Utc::now())
    }

    pub fn bearer(&self) -> Result<&str, JournalError> {
        self.usable_token().ok_or(JournalError::NotAuthenticated)
    }

    pub fn needs_refresh(&self) -> bool {
        self.refresh_token.is_some()
            && (self.access_token.is_none()
                || self.expiry - Utc::now() < Duration::seconds(REFRESH_MARGIN_SECS))
    }
}

/// Bearer token for a provider call, or `NotAuthenticated`.
pub fn bearer_of(auth: Option<&GoogleCredential>) -> Result<&str, JournalError> {
    auth.ok_or(JournalError::NotAuthenticated)?.bearer()
}
