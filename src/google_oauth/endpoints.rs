use crate::config::{CONFIG, GOOGLE_AUTH_URL, GOOGLE_TOKEN_URI, OAUTH_SCOPES};
use crate::error::JournalError;
use crate::google_oauth::credentials::GoogleCredential;

use oauth2::{
    AuthUrl, AuthorizationCode, Client as OAuth2Client, ClientId, ClientSecret, CsrfToken,
    EndpointNotSet, EndpointSet, ExtraTokenFields, PkceCodeChallenge, PkceCodeVerifier,
    RedirectUrl, RefreshToken, Scope, StandardRevocableToken, StandardTokenResponse, TokenUrl,
    basic::{
        BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
        BasicTokenType,
    },
};
use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

/// Stateless Google OAuth Endpoints.
pub struct GoogleOauthEndpoints;

impl GoogleOauthEndpoints {
    /// Consent URL requesting offline access for the picker scopes.
    pub fn build_authorize_url(
        challenge: PkceCodeChallenge,
    ) -> Result<(Url, CsrfToken), JournalError> {
        let client = build_oauth2_client()?;
        let (url, csrf) = client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(OAUTH_SCOPES.iter().map(|s| Scope::new(s.to_string())))
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .set_pkce_challenge(challenge)
            .url();
        Ok((url, csrf))
    }

    pub async fn exchange_authorization_code(
        code: AuthorizationCode,
        verifier: PkceCodeVerifier,
        http_client: reqwest::Client,
    ) -> Result<GoogleTokenResponse, JournalError> {
        let client = build_oauth2_client()?;
        let token = client
            .exchange_code(code)
            .set_pkce_verifier(verifier)
            .request_async(&http_client)
            .await?;
        info!("Authorization code exchanged successfully");
        Ok(token)
    }

    /// Refresh the access token using the current refresh token.
    pub async fn refresh_access_token(
        creds: &GoogleCredential,
        http_client: reqwest::Client,
    ) -> Result<GoogleTokenResponse, JournalError> {
        let refresh_token = creds
            .refresh_token
            .clone()
            .ok_or(JournalError::NotAuthenticated)?;
        let client = build_oauth2_client()?;
        let token_result: GoogleTokenResponse = client
            .exchange_refresh_token(&RefreshToken::new(refresh_token))
            .request_async(&http_client)
            .await?;
        info!(
            email = %creds.email.as_deref().unwrap_or("-"),
            "Access token refreshed successfully"
        );
        Ok(token_result)
    }
}

/// Build the Google OAuth2 client from configuration.
fn build_oauth2_client() -> Result<GoogleOauth2Client, JournalError> {
    let google = CONFIG
        .google_oauth()
        .ok_or(JournalError::OauthNotConfigured)?;
    let client = OAuth2Client::new(ClientId::new(google.client_id))
        .set_client_secret(ClientSecret::new(google.client_secret))
        .set_auth_uri(AuthUrl::new(GOOGLE_AUTH_URL.as_str().to_string())?)
        .set_token_uri(TokenUrl::new(GOOGLE_TOKEN_URI.as_str().to_string())?)
        .set_redirect_uri(RedirectUrl::new(google.redirect_uri.to_string())?);
    Ok(client)
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GoogleTokenField {
    #[serde(rename = "id_token")]
    pub id_token: Option<String>,
}
impl ExtraTokenFields for GoogleTokenField {}

pub type GoogleTokenResponse = StandardTokenResponse<GoogleTokenField, BasicTokenType>;

pub(super) type GoogleOauth2Client = OAuth2Client<
    BasicErrorResponse,
    GoogleTokenResponse,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;
