use crate::picker::PollingConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use url::Url;

pub static GOOGLE_AUTH_URL: LazyLock<Url> = LazyLock::new(|| {
    Url::parse("https://accounts.google.com/o/oauth2/v2/auth").expect("valid google auth url")
});

pub static GOOGLE_TOKEN_URI: LazyLock<Url> = LazyLock::new(|| {
    Url::parse("https://oauth2.googleapis.com/token").expect("valid google token url")
});

/// Base of the Google Photos Picker API. Paths are joined as segments.
pub static PICKER_API_BASE: LazyLock<Url> = LazyLock::new(|| {
    Url::parse("https://photospicker.googleapis.com/v1/").expect("valid picker api url")
});

pub const OAUTH_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/photospicker.mediaitems.readonly",
    "openid",
    "email",
    "profile",
];

/// Placeholder client id shipped in sample `.env` files; treated as unset.
const DEMO_CLIENT_ID: &str = "demo_client_id";

/// Which photo provider backs the picker endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderMode {
    /// Live when Google OAuth is configured, fixture otherwise.
    Auto,
    Live,
    Fixture,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub loglevel: String,
    pub listen_addr: String,
    pub database_url: String,
    pub journal_key: String,
    pub proxy: Option<Url>,
    /// At least 64 bytes; a random key is generated otherwise.
    pub cookie_secret: Option<String>,
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
    pub google_redirect_uri: Option<Url>,
    pub photos_provider: ProviderMode,
    pub poll_interval_ms: u64,
    pub poll_timeout_ms: u64,
    pub thumbnail_size: u32,
    /// Fixture sessions finalize after this many polls. Zero disables it.
    pub fixture_complete_after: u32,
    pub finished_session_retention_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            loglevel: "info".to_string(),
            listen_addr: "0.0.0.0:8000".to_string(),
            database_url: "sqlite://journal.db".to_string(),
            journal_key: "pwd".to_string(),
            proxy: None,
            cookie_secret: None,
            google_client_id: None,
            google_client_secret: None,
            google_redirect_uri: None,
            photos_provider: ProviderMode::Auto,
            poll_interval_ms: PollingConfig::DEFAULT_INTERVAL_MS,
            poll_timeout_ms: PollingConfig::DEFAULT_TIMEOUT_MS,
            thumbnail_size: 200,
            fixture_complete_after: 3,
            finished_session_retention_secs: 600,
        }
    }
}

/// Resolved Google OAuth client settings, present only when fully configured.
#[derive(Debug, Clone)]
pub struct GoogleOauthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: Url,
}

impl Config {
    /// Defaults, then `config.toml`, then `JOURNAL_*` environment variables.
    pub fn load() -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("config.toml"))
            .merge(Env::prefixed("JOURNAL_"))
            .extract()
    }

    pub fn google_oauth(&self) -> Option<GoogleOauthConfig> {
        let client_id = self.google_client_id.as_deref()?.trim();
        if client_id.is_empty() || client_id == DEMO_CLIENT_ID {
            return None;
        }
        let client_secret = self.google_client_secret.as_deref()?.trim();
        if client_secret.is_empty() {
            return None;
        }
        Some(GoogleOauthConfig {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            redirect_uri: self.google_redirect_uri.clone()?,
        })
    }

    pub fn use_live_provider(&self) -> bool {
        match self.photos_provider {
            ProviderMode::Live => true,
            ProviderMode::Fixture => false,
            ProviderMode::Auto => self.google_oauth().is_some(),
        }
    }

    pub fn default_polling(&self) -> PollingConfig {
        PollingConfig {
            interval_ms: self.poll_interval_ms.max(1),
            timeout_ms: self.poll_timeout_ms,
        }
    }
}

pub static CONFIG: LazyLock<Config> =
    LazyLock::new(|| Config::load().expect("FATAL: invalid journal configuration"));
