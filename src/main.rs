use axum_extra::extract::cookie::Key;
use mimalloc::MiMalloc;
use photo_journal::db::JournalStorage;
use photo_journal::google_oauth::service::{GoogleOauthService, build_http_client};
use photo_journal::picker::{PhotoFetcher, SampleLibrary, build_client};
use photo_journal::router::{AppState, journal_router};
use photo_journal::service::{PickerRegistryArgs, picker_registry};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = &photo_journal::config::CONFIG;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        database_url = %cfg.database_url,
        proxy = %cfg.proxy.as_ref().map(|u| u.as_str()).unwrap_or("<none>"),
        loglevel = %cfg.loglevel,
        oauth_configured = cfg.google_oauth().is_some(),
        provider = ?cfg.photos_provider,
    );

    let storage = JournalStorage::connect(&cfg.database_url).await?;
    let http = build_http_client(cfg)?;
    let accounts = GoogleOauthService::new(http.clone(), storage.clone());

    let picker_client = build_client(cfg, http);
    let fetcher = PhotoFetcher::new(picker_client.clone(), cfg.thumbnail_size);
    let pickers = picker_registry::spawn(PickerRegistryArgs {
        client: picker_client.clone(),
        fetcher,
        retention: Duration::from_secs(cfg.finished_session_retention_secs),
    })
    .await?;

    let cookie_key = match cfg.cookie_secret.as_deref().map(str::as_bytes) {
        Some(secret) => Key::try_from(secret).unwrap_or_else(|_| {
            warn!("cookie_secret shorter than 64 bytes; using a random cookie key");
            Key::generate()
        }),
        None => {
            warn!("cookie_secret not set; OAuth cookies will not survive a restart");
            Key::generate()
        }
    };

    let state = AppState::new(
        storage,
        accounts,
        picker_client,
        pickers,
        Arc::from(cfg.journal_key.as_str()),
        cookie_key,
    )
    .with_oauth_configured(cfg.google_oauth().is_some())
    .with_library((!cfg.use_live_provider()).then(|| SampleLibrary::new(cfg.thumbnail_size)));
    let app = journal_router(state);

    let listener = TcpListener::bind(&cfg.listen_addr).await?;
    info!("HTTP server listening on {}", cfg.listen_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
    }
}
