use crate::error::JournalError;
use crate::picker::poller::{FailureKind, PollerState};
use crate::picker::session::{PickerSession, SelectedPhoto};
use crate::router::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub session_id: String,
    #[serde(flatten)]
    pub state: PollerState,
}

/// POST /api/photos/picker/session -> create a session and start its poller.
pub async fn create_picker_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<PickerSession>), JournalError> {
    let auth = state.accounts.current_credential().await?;
    let session = state.picker_client.create_session(auth.as_ref()).await?;
    state.pickers.start(session.clone(), auth).await?;
    info!(
        session_id = %session.id,
        provider = state.picker_client.name(),
        "Picker session created"
    );
    Ok((StatusCode::CREATED, Json(session)))
}

/// GET /api/photos/picker/session/{id}
pub async fn picker_session_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionStatus>, JournalError> {
    let current = state
        .pickers
        .state(&session_id)
        .await?
        .ok_or_else(|| JournalError::SessionNotFound(session_id.clone()))?;
    Ok(Json(SessionStatus {
        session_id,
        state: current,
    }))
}

/// DELETE /api/photos/picker/session/{id}
pub async fn cancel_picker_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, JournalError> {
    match state.pickers.state(&session_id).await? {
        None => Err(JournalError::SessionNotFound(session_id)),
        Some(_) => {
            state.pickers.cancel(&session_id).await?;
            Ok(StatusCode::NO_CONTENT)
        }
    }
}

/// GET /api/photos/picker/session/{id}/photos
pub async fn picker_session_photos(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<SelectedPhoto>>, JournalError> {
    let photos = completed_photos(&state, &session_id).await?;
    Ok(Json(photos))
}

/// Photos of a completed session; every other state maps to its error.
pub async fn completed_photos(
    state: &AppState,
    session_id: &str,
) -> Result<Vec<SelectedPhoto>, JournalError> {
    let current = state
        .pickers
        .state(session_id)
        .await?
        .ok_or_else(|| JournalError::SessionNotFound(session_id.to_string()))?;
    photos_of(session_id, current)
}

fn photos_of(session_id: &str, state: PollerState) -> Result<Vec<SelectedPhoto>, JournalError> {
    let id = session_id.to_string();
    match state {
        PollerState::Completed { photos } => Ok(photos),
        PollerState::Idle | PollerState::Polling { .. } => Err(JournalError::SelectionPending(id)),
        PollerState::TimedOut | PollerState::Cancelled => Err(JournalError::SelectionClosed(id)),
        PollerState::Failed { reason, message } => Err(match reason {
            FailureKind::SessionNotFound => JournalError::SessionNotFound(id),
            FailureKind::NotAuthenticated => JournalError::NotAuthenticated,
            FailureKind::FetchFailed => JournalError::FetchFailed(message),
            FailureKind::Internal => JournalError::SelectionClosed(id),
        }),
    }
}
