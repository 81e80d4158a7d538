use crate::error::JournalError;
use crate::handlers::picker::completed_photos;
use crate::router::AppState;
use crate::types::journal::{
    EntryPatch, JournalEntry, JournalPhoto, NewEntry, NewPerson, NewPhoto, Person,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

pub async fn list_entries(
    State(state): State<AppState>,
) -> Result<Json<Vec<JournalEntry>>, JournalError> {
    Ok(Json(state.storage.list_entries().await?))
}

pub async fn get_entry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<JournalEntry>, JournalError> {
    let entry = state
        .storage
        .get_entry(id)
        .await?
        .ok_or(JournalError::EntryNotFound(id))?;
    Ok(Json(entry))
}

pub async fn create_entry(
    State(state): State<AppState>,
    Json(new): Json<NewEntry>,
) -> Result<(StatusCode, Json<JournalEntry>), JournalError> {
    if new.title.trim().is_empty() {
        return Err(JournalError::BadRequest("title must not be empty".to_string()));
    }
    let entry = state.storage.create_entry(new).await?;
    info!(entry_id = entry.id, photos = entry.photos.len(), "Journal entry created");
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn update_entry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<EntryPatch>,
) -> Result<Json<JournalEntry>, JournalError> {
    if patch.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(JournalError::BadRequest("title must not be empty".to_string()));
    }
    let entry = state
        .storage
        .update_entry(id, patch)
        .await?
        .ok_or(JournalError::EntryNotFound(id))?;
    Ok(Json(entry))
}

pub async fn delete_entry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, JournalError> {
    if !state.storage.delete_entry(id).await? {
        return Err(JournalError::EntryNotFound(id));
    }
    info!(entry_id = id, "Journal entry deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/journal-entries/search?q=
pub async fn search_entries(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<JournalEntry>>, JournalError> {
    let q = query.q.as_deref().map(str::trim).unwrap_or_default();
    if q.is_empty() {
        return Err(JournalError::BadRequest("search query required".to_string()));
    }
    Ok(Json(state.storage.search_entries(q).await?))
}

pub async fn entries_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Json<Vec<JournalEntry>>, JournalError> {
    Ok(Json(state.storage.entries_by_category(&category).await?))
}

/// PUT /api/journal-entries/{id}/photos
pub async fn replace_entry_photos(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(photos): Json<Vec<NewPhoto>>,
) -> Result<Json<Vec<JournalPhoto>>, JournalError> {
    Ok(Json(state.storage.replace_photos(id, photos).await?))
}

/// POST /api/journal-entries/{id}/photos/from-session/{session_id}
pub async fn attach_session_photos(
    State(state): State<AppState>,
    Path((id, session_id)): Path<(i64, String)>,
) -> Result<Json<Vec<JournalPhoto>>, JournalError> {
    let selected = completed_photos(&state, &session_id).await?;
    let count = selected.len();
    let photos = state
        .storage
        .append_photos(id, selected.into_iter().map(NewPhoto::from).collect())
        .await?;
    info!(entry_id = id, session_id = %session_id, count, "Picked photos attached");
    Ok(Json(photos))
}

pub async fn list_people(State(state): State<AppState>) -> Result<Json<Vec<Person>>, JournalError> {
    Ok(Json(state.storage.list_people().await?))
}

pub async fn create_person(
    State(state): State<AppState>,
    Json(new): Json<NewPerson>,
) -> Result<(StatusCode, Json<Person>), JournalError> {
    if new.name.trim().is_empty() {
        return Err(JournalError::BadRequest("name must not be empty".to_string()));
    }
    Ok((StatusCode::CREATED, Json(state.storage.create_person(new).await?)))
}
