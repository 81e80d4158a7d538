use crate::error::JournalError;
use crate::picker::{Album, SampleLibrary, SelectedPhoto};
use crate::router::AppState;
use axum::{
    Json,
    extract::{Query, State},
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct DayQuery {
    pub date: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PhotoSearchQuery {
    pub q: Option<String>,
}

/// GET /api/photos/by-date?date=
pub async fn photos_by_date(
    State(state): State<AppState>,
    Query(query): Query<DayQuery>,
) -> Result<Json<Vec<SelectedPhoto>>, JournalError> {
    let day = parse_day(query.date.as_deref())?;
    Ok(Json(library(&state)?.by_date(day)))
}

/// GET /api/photos/suggested?date=&content=
pub async fn suggested_photos(
    State(state): State<AppState>,
    Query(query): Query<DayQuery>,
) -> Result<Json<Vec<SelectedPhoto>>, JournalError> {
    let day = parse_day(query.date.as_deref())?;
    Ok(Json(
        library(&state)?.suggested(day, query.content.as_deref()),
    ))
}

/// GET /api/photos/albums
pub async fn list_albums(State(state): State<AppState>) -> Result<Json<Vec<Album>>, JournalError> {
    Ok(Json(library(&state)?.albums().to_vec()))
}

/// GET /api/photos/search?q=
pub async fn search_photos(
    State(state): State<AppState>,
    Query(query): Query<PhotoSearchQuery>,
) -> Result<Json<Vec<SelectedPhoto>>, JournalError> {
    let q = query.q.unwrap_or_default();
    if q.trim().is_empty() {
        return Err(JournalError::BadRequest("search query required".to_string()));
    }
    Ok(Json(library(&state)?.search(&q)))
}

fn library(state: &AppState) -> Result<&SampleLibrary, JournalError> {
    state
        .library
        .as_ref()
        .ok_or(JournalError::LibraryUnavailable)
}

/// `YYYY-MM-DD` or an RFC 3339 timestamp; today (UTC) when absent.
fn parse_day(raw: Option<&str>) -> Result<NaiveDate, JournalError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(Utc::now().date_naive());
    };
    if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(day);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc).date_naive())
        .map_err(|_| JournalError::BadRequest(format!("invalid date: {raw}")))
}
