// src/candidates/handlers/notes.rs

use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::auth::AuthedUser;
use crate::candidates::models::{CandidateNote, CreateNoteRequest, UpdateNoteRequest};
use crate::candidates::notes::NoteService;
use crate::candidates::validators::NoteValidator;
use crate::common::{ApiError, AppState, Validator};

/// POST /api/candidates/:id/notes
pub async fn create_note(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(candidate_id): Path<String>,
    Json(payload): Json<CreateNoteRequest>,
) -> Result<(StatusCode, Json<CandidateNote>), ApiError> {
    NoteValidator.validate(&payload).into_result()?;
    let state = state_lock.read().await.clone();

    let note = NoteService::new(state.db.clone())
        .add(
            &candidate_id,
            &authed,
            &payload.note,
            payload.previous_status.as_deref(),
            payload.new_status.as_deref(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(note)))
}

/// GET /api/candidates/:id/notes
pub async fn list_notes(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    _authed: AuthedUser,
    Path(candidate_id): Path<String>,
) -> Result<Json<Vec<CandidateNote>>, ApiError> {
    let state = state_lock.read().await.clone();
    let notes = NoteService::new(state.db.clone()).list(&candidate_id).await?;
    Ok(Json(notes))
}

/// GET /api/candidates/notes/:note_id
pub async fn get_note(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    _authed: AuthedUser,
    Path(note_id): Path<String>,
) -> Result<Json<CandidateNote>, ApiError> {
    let state = state_lock.read().await.clone();
    let note = NoteService::new(state.db.clone()).get(&note_id).await?;
    Ok(Json(note))
}

/// PATCH /api/candidates/notes/:note_id
pub async fn update_note(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(note_id): Path<String>,
    Json(payload): Json<UpdateNoteRequest>,
) -> Result<Json<CandidateNote>, ApiError> {
    NoteValidator.validate(&payload).into_result()?;
    let state = state_lock.read().await.clone();

    let note = NoteService::new(state.db.clone())
        .update(&note_id, &authed, &payload.note)
        .await?;
    Ok(Json(note))
}

/// DELETE /api/candidates/notes/:note_id
pub async fn delete_note(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(note_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    authed.require_recruiter()?;
    let state = state_lock.read().await.clone();

    NoteService::new(state.db.clone()).delete(&note_id, &authed).await?;
    Ok(StatusCode::NO_CONTENT)
}
