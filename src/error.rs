use axum::{Json, http::StatusCode, response::IntoResponse};
use oauth2::basic::BasicErrorResponseType;
use oauth2::reqwest::Error as ReqwestClientError;
use oauth2::{HttpClientError, RequestTokenError, StandardErrorResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum JournalError {
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("OAuth2 token request error: {0}")]
    Oauth2Token(String),

    #[error("OAuth2 server error: {error}")]
    Oauth2Server { error: String },

    #[error("OAuth flow error: {0}")]
    OauthFlowError(String),

    #[error("Google OAuth is not configured")]
    OauthNotConfigured,

    #[error("No usable Google access token; sign in again")]
    NotAuthenticated,

    #[error("Photo provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Picker session not found: {0}")]
    SessionNotFound(String),

    #[error("Fetching selected photos failed: {0}")]
    FetchFailed(String),

    #[error("Picker session {0} is already being polled")]
    AlreadyPolling(String),

    #[error("Picker session {0} has no finalized selection yet")]
    SelectionPending(String),

    #[error("Picker session {0} ended without a selection")]
    SelectionClosed(String),

    #[error("Picker registry error: {0}")]
    RactorError(String),

    #[error("Journal entry not found: {0}")]
    EntryNotFound(i64),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Photo library browsing is not available with the live picker provider")]
    LibraryUnavailable,
}

/// Classifies errors worth retrying with backoff.
pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for JournalError {
    fn is_retryable(&self) -> bool {
        match self {
            JournalError::Reqwest(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.is_request()
                    || e.status().is_some_and(|s| s.is_server_error())
            }
            JournalError::ProviderUnavailable(_) | JournalError::Oauth2Token(_) => true,
            _ => false,
        }
    }
}

impl JournalError {
    /// Errors after which polling a picker session can never succeed.
    pub fn ends_polling(&self) -> bool {
        matches!(
            self,
            JournalError::SessionNotFound(_) | JournalError::NotAuthenticated
        )
    }
}

impl
    From<
        RequestTokenError<
            HttpClientError<ReqwestClientError>,
            StandardErrorResponse<BasicErrorResponseType>,
        >,
    > for JournalError
{
    fn from(
        e: RequestTokenError<
            HttpClientError<ReqwestClientError>,
            StandardErrorResponse<BasicErrorResponseType>,
        >,
    ) -> Self {
        match e {
            RequestTokenError::ServerResponse(err) => JournalError::Oauth2Server {
                error: err.error().to_string(),
            },
            RequestTokenError::Request(req_e) => {
                JournalError::Oauth2Token(format!("request failed: {}", req_e))
            }
            RequestTokenError::Parse(parse_err, _body) => {
                JournalError::JsonError(parse_err.into_inner())
            }
            RequestTokenError::Other(s) => JournalError::Oauth2Token(s),
        }
    }
}

impl IntoResponse for JournalError {
    fn into_response(self) -> axum::response::Response {
        let (status, code, message) = match &self {
            JournalError::DatabaseError(_)
            | JournalError::RactorError(_)
            | JournalError::Io(_)
            | JournalError::JsonError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal server error occurred.".to_string(),
            ),
            JournalError::NotAuthenticated
            | JournalError::Oauth2Token(_)
            | JournalError::Oauth2Server { .. }
            | JournalError::OauthFlowError(_) => (
                StatusCode::UNAUTHORIZED,
                "NOT_AUTHENTICATED",
                "Sign in with Google again to continue.".to_string(),
            ),
            JournalError::OauthNotConfigured => (
                StatusCode::BAD_REQUEST,
                "OAUTH_NOT_CONFIGURED",
                "Google OAuth is not configured on this server.".to_string(),
            ),
            JournalError::Reqwest(_)
            | JournalError::UrlParse(_)
            | JournalError::ProviderUnavailable(_) => (
                StatusCode::BAD_GATEWAY,
                "PROVIDER_UNAVAILABLE",
                "The photo provider is unavailable.".to_string(),
            ),
            JournalError::FetchFailed(_) => (
                StatusCode::BAD_GATEWAY,
                "FETCH_FAILED",
                "Selected photos could not be fetched; pick them again.".to_string(),
            ),
            JournalError::SessionNotFound(_) => (
                StatusCode::NOT_FOUND,
                "SESSION_NOT_FOUND",
                "The picker session expired; start a new one.".to_string(),
            ),
            JournalError::AlreadyPolling(_) | JournalError::SelectionPending(_) => {
                (StatusCode::CONFLICT, "CONFLICT", self.to_string())
            }
            JournalError::SelectionClosed(_) => (StatusCode::GONE, "SELECTION_CLOSED", self.to_string()),
            JournalError::EntryNotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", self.to_string()),
            JournalError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", self.to_string()),
            JournalError::LibraryUnavailable => (
                StatusCode::NOT_IMPLEMENTED,
                "LIBRARY_UNAVAILABLE",
                "Pick photos through a picker session instead.".to_string(),
            ),
        };
        let body = ApiErrorBody {
            code: code.to_string(),
            message,
        };
        (status, Json(ApiErrorResponse { error: body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_session_loss_and_auth_loss_end_polling() {
        assert!(JournalError::SessionNotFound("s".into()).ends_polling());
        assert!(JournalError::NotAuthenticated.ends_polling());
        assert!(!JournalError::ProviderUnavailable("503".into()).ends_polling());
        assert!(!JournalError::FetchFailed("gone".into()).ends_polling());
    }

    #[test]
    fn provider_outages_are_retryable() {
        assert!(JournalError::ProviderUnavailable("down".into()).is_retryable());
        assert!(!JournalError::SessionNotFound("s".into()).is_retryable());
        assert!(!JournalError::NotAuthenticated.is_retryable());
    }

    #[test]
    fn picker_errors_map_to_statuses() {
        let resp = JournalError::SessionNotFound("s".into()).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = JournalError::NotAuthenticated.into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let resp = JournalError::FetchFailed("x".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let resp = JournalError::AlreadyPolling("s".into()).into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let resp = JournalError::LibraryUnavailable.into_response();
        assert_eq!(resp.status(), StatusCode::NOT_IMPLEMENTED);
    }
}
