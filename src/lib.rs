pub mod config;
pub mod error;
pub mod google_oauth;
pub mod picker;
pub mod service;
pub mod router;
pub mod middleware;
pub mod db;
pub mod handlers;
pub mod types;

pub use error::JournalError;
pub use google_oauth::credentials::GoogleCredential;
pub use google_oauth::service::GoogleOauthService;
