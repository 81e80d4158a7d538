//! Google Photos Picker workflow: session client, poller, and fetch facade.
//!
//! Layout:
//! - `client.rs`: the `PhotoSessionClient` capability trait
//! - `live.rs` / `fixture.rs`: its two variants
//! - `poller.rs`: the per-session polling state machine
//! - `fetch.rs`: normalizes a finalized selection into `SelectedPhoto`s
//! - `library.rs`: browsable sample library for fixture mode

pub mod client;
pub mod fetch;
pub mod fixture;
pub mod library;
pub mod live;
pub mod poller;
pub mod session;

pub use client::PhotoSessionClient;
pub use fetch::PhotoFetcher;
pub use fixture::FixtureClient;
pub use library::{Album, SampleLibrary};
pub use live::LiveClient;
pub use poller::{FailureKind, PollerHandle, PollerState, SessionPoller};
pub use session::{PickerSession, PollingConfig, Resizing, SelectedPhoto};

use crate::config::Config;
use std::sync::Arc;
use tracing::info;

/// Pick the provider variant once, at startup.
pub fn build_client(cfg: &Config, http: reqwest::Client) -> Arc<dyn PhotoSessionClient> {
    let defaults = cfg.default_polling();
    let client: Arc<dyn PhotoSessionClient> = if cfg.use_live_provider() {
        Arc::new(LiveClient::new(http, defaults))
    } else {
        Arc::new(FixtureClient::new(
            defaults,
            Some(cfg.fixture_complete_after),
        ))
    };
    info!(provider = client.name(), "Photo picker provider selected");
    client
}
