use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use backon::ExponentialBuilder;
use chrono::{Duration as ChronoDuration, Utc};
use photo_journal::picker::poller::{FailureKind, PollerState, SessionPoller};
use photo_journal::picker::{LiveClient, PhotoFetcher, PhotoSessionClient, PollingConfig};
use photo_journal::{GoogleCredential, JournalError};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use url::Url;

const TOKEN: &str = "good-token";

/// Minimal stand-in for `photospicker.googleapis.com/v1`.
#[derive(Clone, Default)]
struct FakeProvider {
    requests: Arc<AtomicU32>,
    polls: Arc<AtomicU32>,
    deletes: Arc<AtomicU32>,
    fail_create: bool,
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TOKEN}"))
}

async fn create_session(State(fake): State<FakeProvider>, headers: HeaderMap) -> Response {
    fake.requests.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if fake.fail_create {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    Json(json!({
        "id": "s-1",
        "pickerUri": "https://photos.google.com/picker/s-1",
        "pollingConfig": {"pollInterval": "0.25s", "timeoutIn": "1799s"},
        "mediaItemsSet": false
    }))
    .into_response()
}

async fn get_session(
    State(fake): State<FakeProvider>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    fake.requests.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if id != "s-1" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": {"code": 404, "status": "NOT_FOUND"}})),
        )
            .into_response();
    }
    let polls = fake.polls.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({
        "id": id,
        "pickerUri": "https://photos.google.com/picker/s-1",
        "pollingConfig": {"pollInterval": "0.25s", "timeoutIn": "1799s"},
        "mediaItemsSet": polls >= 2
    }))
    .into_response()
}

async fn delete_session(State(fake): State<FakeProvider>, headers: HeaderMap) -> StatusCode {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED;
    }
    fake.deletes.fetch_add(1, Ordering::SeqCst);
    StatusCode::OK
}

async fn list_media_items(
    State(fake): State<FakeProvider>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    fake.requests.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if query.get("sessionId").map(String::as_str) != Some("s-1")
        || query.get("pageSize").map(String::as_str) != Some("100")
    {
        return StatusCode::BAD_REQUEST.into_response();
    }
    Json(json!({
        "mediaItems": [
            {
                "id": "AF1QipA",
                "createTime": "2024-08-24T10:15:00Z",
                "type": "PHOTO",
                "mediaFile": {
                    "baseUrl": "https://lh3.googleusercontent.com/ppa/AF1QipA",
                    "mimeType": "image/jpeg",
                    "filename": "IMG_0001.jpg",
                    "mediaFileMetadata": {"width": 4032, "height": 3024}
                }
            },
            {
                "id": "AF1QipB",
                "type": "PHOTO",
                "mediaFile": {
                    "baseUrl": "https://lh3.googleusercontent.com/ppa/AF1QipB",
                    "mimeType": "image/heic"
                }
            }
        ]
    }))
    .into_response()
}

async fn spawn_provider(fake: FakeProvider) -> Url {
    let app = Router::new()
        .route("/v1/sessions", post(create_session))
        .route("/v1/sessions/{id}", get(get_session).delete(delete_session))
        .route("/v1/mediaItems", get(list_media_items))
        .with_state(fake);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Url::parse(&format!("http://{addr}/v1/")).unwrap()
}

fn credential(token: &str) -> GoogleCredential {
    GoogleCredential {
        email: Some("me@example.com".to_string()),
        access_token: Some(token.to_string()),
        refresh_token: None,
        scopes: None,
        expiry: Utc::now() + ChronoDuration::hours(1),
    }
}

fn fast_retries() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(1))
        .with_max_delay(Duration::from_millis(5))
        .with_max_times(2)
}

fn live(base: Url) -> LiveClient {
    LiveClient::with_base(reqwest::Client::new(), base, PollingConfig::default())
        .with_retry_policy(fast_retries())
}

#[tokio::test]
async fn create_without_credential_never_reaches_provider() {
    let fake = FakeProvider::default();
    let client = live(spawn_provider(fake.clone()).await);

    let err = client.create_session(None).await.unwrap_err();
    assert!(matches!(err, JournalError::NotAuthenticated));

    let mut expired = credential(TOKEN);
    expired.expiry = Utc::now() - ChronoDuration::minutes(1);
    let err = client.create_session(Some(&expired)).await.unwrap_err();
    assert!(matches!(err, JournalError::NotAuthenticated));

    assert_eq!(fake.requests.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn rejected_token_maps_to_not_authenticated() {
    let fake = FakeProvider::default();
    let client = live(spawn_provider(fake.clone()).await);

    let err = client
        .create_session(Some(&credential("stale")))
        .await
        .unwrap_err();
    assert!(matches!(err, JournalError::NotAuthenticated));
    // Not retried.
    assert_eq!(fake.requests.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn provider_hints_shape_the_polling_config() {
    let client = live(spawn_provider(FakeProvider::default()).await);
    let auth = credential(TOKEN);

    let session = client.create_session(Some(&auth)).await.unwrap();
    assert_eq!(session.id, "s-1");
    assert_eq!(session.picker_uri, "https://photos.google.com/picker/s-1");
    assert_eq!(session.polling_config.interval_ms, 250);
    // The provider's 30 minutes is capped by the configured timeout.
    assert_eq!(
        session.polling_config.timeout_ms,
        PollingConfig::DEFAULT_TIMEOUT_MS
    );
}

#[tokio::test]
async fn unknown_session_is_session_not_found() {
    let client = live(spawn_provider(FakeProvider::default()).await);
    let err = client
        .poll_session(Some(&credential(TOKEN)), "gone")
        .await
        .unwrap_err();
    assert!(matches!(err, JournalError::SessionNotFound(id) if id == "gone"));
}

#[tokio::test]
async fn server_errors_are_retried_then_reported_unavailable() {
    let fake = FakeProvider {
        fail_create: true,
        ..FakeProvider::default()
    };
    let client = live(spawn_provider(fake.clone()).await);

    let err = client
        .create_session(Some(&credential(TOKEN)))
        .await
        .unwrap_err();
    assert!(matches!(err, JournalError::ProviderUnavailable(_)));
    // First attempt plus two retries.
    assert_eq!(fake.requests.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn live_session_polls_to_completion() {
    let fake = FakeProvider::default();
    let client: Arc<dyn PhotoSessionClient> = Arc::new(live(spawn_provider(fake.clone()).await));
    let auth = credential(TOKEN);

    let session = client.create_session(Some(&auth)).await.unwrap();
    let poller = SessionPoller::new(
        client.clone(),
        PhotoFetcher::new(client.clone(), 200),
        Some(auth),
        session,
    );
    let (_cancel_tx, cancel_rx) = watch::channel(false);
    let state = poller.run(cancel_rx).await;

    let PollerState::Completed { photos } = state else {
        panic!("expected Completed, got {state:?}");
    };
    assert_eq!(fake.polls.load(Ordering::SeqCst), 2);
    assert_eq!(photos.len(), 2);
    assert_eq!(
        photos[0].thumbnail_url,
        "https://lh3.googleusercontent.com/ppa/AF1QipA=w200-h200-c"
    );
    assert_eq!(photos[0].filename, "IMG_0001.jpg");
    assert_eq!((photos[0].width, photos[0].height), (4032, 3024));
    assert_eq!(photos[1].filename, "Unknown");
    assert_eq!(photos[1].mime_type, "image/heic");
}

#[tokio::test]
async fn lost_credential_fails_the_poller() {
    let client: Arc<dyn PhotoSessionClient> =
        Arc::new(live(spawn_provider(FakeProvider::default()).await));
    let auth = credential(TOKEN);
    let mut session = client.create_session(Some(&auth)).await.unwrap();
    session.polling_config.interval_ms = 10;

    let poller = SessionPoller::new(
        client.clone(),
        PhotoFetcher::new(client.clone(), 200),
        Some(credential("revoked")),
        session,
    );
    let (_cancel_tx, cancel_rx) = watch::channel(false);
    let state = poller.run(cancel_rx).await;

    assert!(matches!(
        state,
        PollerState::Failed {
            reason: FailureKind::NotAuthenticated,
            ..
        }
    ));
}

#[tokio::test]
async fn delete_releases_the_session() {
    let fake = FakeProvider::default();
    let client = live(spawn_provider(fake.clone()).await);
    client
        .delete_session(Some(&credential(TOKEN)), "s-1")
        .await
        .unwrap();
    assert_eq!(fake.deletes.load(Ordering::SeqCst), 1);
}
