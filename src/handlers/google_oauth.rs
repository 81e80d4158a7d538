use crate::google_oauth::credentials::GoogleCredential;
use crate::google_oauth::endpoints::GoogleOauthEndpoints;
use crate::{JournalError, router::AppState};
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, PrivateCookieJar, SameSite};
use chrono::{DateTime, Utc};
use oauth2::{AuthorizationCode, CsrfToken, PkceCodeChallenge, PkceCodeVerifier};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use subtle::ConstantTimeEq;
use time::Duration;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
pub struct AuthCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OauthConfigResponse {
    pub is_configured: bool,
}

/// What the frontend knows about the linked Google account.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub is_authenticated: bool,
    pub email: Option<String>,
    pub scopes: Vec<String>,
    pub expiry: Option<DateTime<Utc>>,
}

impl CurrentUser {
    fn of(credential: Option<GoogleCredential>) -> Self {
        let Some(cred) = credential else {
            return Self {
                is_authenticated: false,
                email: None,
                scopes: Vec::new(),
                expiry: None,
            };
        };
        Self {
            is_authenticated: cred.usable_token().is_some(),
            email: cred.email,
            scopes: cred.scopes.unwrap_or_default(),
            expiry: Some(cred.expiry),
        }
    }
}

const CSRF_COOKIE: &str = "oauth_csrf_token";
const PKCE_COOKIE: &str = "oauth_pkce_verifier";

/// GET /auth/google -> redirects to Google's consent page.
pub async fn google_oauth_entry(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
) -> Result<impl IntoResponse, JournalError> {
    if !state.oauth_configured {
        return Err(JournalError::OauthNotConfigured);
    }

    let (challenge, verifier) = PkceCodeChallenge::new_random_sha256();
    let pkce_verifier = verifier.secret().to_string();

    let (auth_url, csrf_token) = GoogleOauthEndpoints::build_authorize_url(challenge)?;

    let jar = store_oauth_cookies(jar, &csrf_token, &pkce_verifier);

    info!("Dispatching OAuth redirect");
    Ok((jar, Redirect::temporary(auth_url.as_ref())).into_response())
}

/// GET /auth/google/callback -> exchanges the code and links the account.
pub async fn google_oauth_callback(
    State(state): State<AppState>,
    Query(query): Query<AuthCallbackQuery>,
    jar: PrivateCookieJar,
) -> impl IntoResponse {
    let (pkce_verifier, csrf_cookie, jar) = match load_oauth_session(jar) {
        Ok(data) => data,
        Err((jar, err)) => return respond_with_error(jar, err),
    };

    if let Some(error) = query.error.as_deref() {
        warn!(error, "Google consent was not granted");
        return respond_with_error(
            jar,
            JournalError::OauthFlowError(format!("consent denied: {error}")),
        );
    }

    let Some(state_param) = query.state.as_deref() else {
        return respond_with_error(
            jar,
            JournalError::OauthFlowError("missing `state` in callback".to_string()),
        );
    };

    if !bool::from(state_param.as_bytes().ct_eq(csrf_cookie.as_bytes())) {
        return respond_with_error(
            jar,
            JournalError::OauthFlowError("CSRF token mismatch".to_string()),
        );
    }

    let Some(code) = query.code.as_deref() else {
        return respond_with_error(
            jar,
            JournalError::OauthFlowError("missing `code` in callback".to_string()),
        );
    };

    let token_response = match GoogleOauthEndpoints::exchange_authorization_code(
        AuthorizationCode::new(code.to_owned()),
        PkceCodeVerifier::new(pkce_verifier),
        state.accounts.http().clone(),
    )
    .await
    {
        Ok(res) => res,
        Err(err) => return respond_with_error(jar, err),
    };

    let token_value: Value = match serde_json::to_value(&token_response) {
        Ok(v) => v,
        Err(err) => return respond_with_error(jar, JournalError::JsonError(err)),
    };

    let credential = match state.accounts.store_token_payload(token_value).await {
        Ok(cred) => cred,
        Err(err) => return respond_with_error(jar, err),
    };

    info!("OAuth callback stored credential");
    (
        jar,
        Json(json!({
            "linked": true,
            "email": credential.email,
            "expiry": credential.expiry,
        })),
    )
        .into_response()
}

/// POST /auth/logout -> forgets the linked account.
pub async fn google_oauth_logout(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, JournalError> {
    state.accounts.logout().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/user
pub async fn current_user(State(state): State<AppState>) -> Result<Json<CurrentUser>, JournalError> {
    let credential = state.accounts.current_credential().await?;
    Ok(Json(CurrentUser::of(credential)))
}

/// GET /api/oauth-config
pub async fn oauth_config(State(state): State<AppState>) -> Json<OauthConfigResponse> {
    Json(OauthConfigResponse {
        is_configured: state.oauth_configured,
    })
}

fn store_oauth_cookies(
    jar: PrivateCookieJar,
    csrf: &CsrfToken,
    pkce_verifier: &str,
) -> PrivateCookieJar {
    jar.add(build_cookie(CSRF_COOKIE, csrf.secret().to_string()))
        .add(build_cookie(PKCE_COOKIE, pkce_verifier.to_string()))
}

fn load_oauth_session(
    jar: PrivateCookieJar,
) -> Result<(String, String, PrivateCookieJar), (PrivateCookieJar, JournalError)> {
    let Some(csrf_cookie) = jar.get(CSRF_COOKIE).map(|c| c.value().to_owned()) else {
        let jar = clear_oauth_cookies(jar);
        return Err((
            jar,
            JournalError::OauthFlowError("Missing CSRF token in cookie".to_string()),
        ));
    };

    let Some(pkce_cookie) = jar.get(PKCE_COOKIE).map(|c| c.value().to_owned()) else {
        let jar = clear_oauth_cookies(jar);
        return Err((
            jar,
            JournalError::OauthFlowError("Missing PKCE verifier in cookie".to_string()),
        ));
    };

    let jar = clear_oauth_cookies(jar);

    Ok((pkce_cookie, csrf_cookie, jar))
}

fn clear_oauth_cookies(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.remove(clear_cookie(CSRF_COOKIE))
        .remove(clear_cookie(PKCE_COOKIE))
}

fn build_cookie(name: &str, value: String) -> Cookie<'static> {
    Cookie::build(Cookie::new(name.to_string(), value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::minutes(15))
        .build()
}

fn clear_cookie(name: &str) -> Cookie<'static> {
    Cookie::build(Cookie::new(name.to_string(), ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

fn respond_with_error(jar: PrivateCookieJar, err: JournalError) -> Response {
    (jar, err.into_response()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_user_reflects_token_usability() {
        assert!(!CurrentUser::of(None).is_authenticated);

        let mut cred = GoogleCredential {
            email: Some("me@example.com".into()),
            access_token: Some("ya29.token".into()),
            refresh_token: None,
            scopes: Some(vec!["photospicker.mediaitems.readonly".into()]),
            expiry: Utc::now() + chrono::Duration::minutes(30),
        };
        let user = CurrentUser::of(Some(cred.clone()));
        assert!(user.is_authenticated);
        assert_eq!(user.email.as_deref(), Some("me@example.com"));
        assert_eq!(user.scopes.len(), 1);

        cred.expiry = Utc::now() - chrono::Duration::minutes(1);
        let user = CurrentUser::of(Some(cred));
        assert!(!user.is_authenticated);
        assert!(user.expiry.is_some());
    }
}
