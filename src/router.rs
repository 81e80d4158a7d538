use crate::db::JournalStorage;
use crate::google_oauth::service::GoogleOauthService;
use crate::handlers::{google_oauth, journal, library, picker};
use crate::middleware::RequireKeyAuth;
use crate::picker::{PhotoSessionClient, SampleLibrary};
use crate::service::PickerRegistry;
use axum::{
    Router,
    extract::FromRef,
    middleware::from_extractor_with_state,
    routing::{get, post, put},
};
use axum_extra::extract::cookie::Key;
use std::sync::Arc;

/// Shared state of every route.
#[derive(Clone)]
pub struct AppState {
    pub storage: JournalStorage,
    pub accounts: GoogleOauthService,
    pub picker_client: Arc<dyn PhotoSessionClient>,
    pub pickers: PickerRegistry,
    pub journal_key: Arc<str>,
    pub oauth_configured: bool,
    /// Browsable library; only the fixture provider has one.
    pub library: Option<SampleLibrary>,
    cookie_key: Key,
}

impl AppState {
    pub fn new(
        storage: JournalStorage,
        accounts: GoogleOauthService,
        picker_client: Arc<dyn PhotoSessionClient>,
        pickers: PickerRegistry,
        journal_key: Arc<str>,
        cookie_key: Key,
    ) -> Self {
        Self {
            storage,
            accounts,
            picker_client,
            pickers,
            journal_key,
            oauth_configured: false,
            library: None,
            cookie_key,
        }
    }

    pub fn with_oauth_configured(mut self, configured: bool) -> Self {
        self.oauth_configured = configured;
        self
    }

    pub fn with_library(mut self, library: Option<SampleLibrary>) -> Self {
        self.library = library;
        self
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

pub fn journal_router(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/journal-entries",
            get(journal::list_entries).post(journal::create_entry),
        )
        .route("/journal-entries/search", get(journal::search_entries))
        .route(
            "/journal-entries/category/{category}",
            get(journal::entries_by_category),
        )
        .route(
            "/journal-entries/{id}",
            get(journal::get_entry)
                .put(journal::update_entry)
                .delete(journal::delete_entry),
        )
        .route(
            "/journal-entries/{id}/photos",
            put(journal::replace_entry_photos),
        )
        .route(
            "/journal-entries/{id}/photos/from-session/{session_id}",
            post(journal::attach_session_photos),
        )
        .route(
            "/people",
            get(journal::list_people).post(journal::create_person),
        )
        .route("/user", get(google_oauth::current_user))
        .route("/photos/by-date", get(library::photos_by_date))
        .route("/photos/suggested", get(library::suggested_photos))
        .route("/photos/albums", get(library::list_albums))
        .route("/photos/search", get(library::search_photos))
        .route(
            "/photos/picker/session",
            post(picker::create_picker_session),
        )
        .route(
            "/photos/picker/session/{id}",
            get(picker::picker_session_status).delete(picker::cancel_picker_session),
        )
        .route(
            "/photos/picker/session/{id}/photos",
            get(picker::picker_session_photos),
        )
        .route_layer(from_extractor_with_state::<RequireKeyAuth, _>(
            state.clone(),
        ))
        // The frontend asks this before it has a key.
        .route("/oauth-config", get(google_oauth::oauth_config));

    // The browser opens /auth/google directly, so it passes `?key=`.
    let auth = Router::new()
        .route("/google", get(google_oauth::google_oauth_entry))
        .route("/logout", post(google_oauth::google_oauth_logout))
        .route_layer(from_extractor_with_state::<RequireKeyAuth, _>(
            state.clone(),
        ))
        // Bound to the PKCE and CSRF cookies set by the gated entry.
        .route(
            "/google/callback",
            get(google_oauth::google_oauth_callback),
        );

    Router::new()
        .nest("/auth", auth)
        .nest("/api", api)
        .with_state(state)
}
