// src/candidates/handlers/candidates.rs

use axum::{
    extract::{Extension, Json, Path, Query},
    http::StatusCode,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::auth::AuthedUser;
use crate::candidates::models::{
    Candidate, CandidateListQuery, CandidateNote, CandidateStatus, EmailSearchQuery,
    SkillSearchQuery, StatusUpdateRequest,
};
use crate::candidates::services::{CandidateFilters, CandidateService, DEFAULT_PAGE_SIZE};
use crate::candidates::validators::StatusUpdateValidator;
use crate::common::{ApiError, AppState, Validator};

#[derive(Debug, Serialize)]
pub struct StatusUpdateResponse {
    pub candidate: Candidate,
    pub note: CandidateNote,
}

/// GET /api/candidates?skip&limit&status&skills&skill_mode
pub async fn list_candidates(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    _authed: AuthedUser,
    Query(query): Query<CandidateListQuery>,
) -> Result<Json<Vec<Candidate>>, ApiError> {
    let state = state_lock.read().await.clone();
    let filters = CandidateFilters::from_query(&query)?;

    let candidates = CandidateService::new(state.db.clone()).list(&filters).await?;
    Ok(Json(candidates))
}

/// GET /api/candidates/:id
pub async fn get_candidate(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    _authed: AuthedUser,
    Path(id): Path<String>,
) -> Result<Json<Candidate>, ApiError> {
    let state = state_lock.read().await.clone();
    let candidate = CandidateService::new(state.db.clone()).get_or_404(&id).await?;
    Ok(Json(candidate))
}

/// GET /api/candidates/search/by-email?email=
pub async fn search_by_email(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    _authed: AuthedUser,
    Query(query): Query<EmailSearchQuery>,
) -> Result<Json<Candidate>, ApiError> {
    let state = state_lock.read().await.clone();

    CandidateService::new(state.db.clone())
        .find_by_email(&query.email)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Candidate not found".to_string()))
}

/// GET /api/candidates/search/by-skill?skill=
pub async fn search_by_skill(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    _authed: AuthedUser,
    Query(query): Query<SkillSearchQuery>,
) -> Result<Json<Vec<Candidate>>, ApiError> {
    if query.skill.trim().is_empty() {
        return Err(ApiError::BadRequest("skill must not be empty".to_string()));
    }

    let state = state_lock.read().await.clone();
    let candidates = CandidateService::new(state.db.clone())
        .search_by_skill(&query.skill, DEFAULT_PAGE_SIZE)
        .await?;
    Ok(Json(candidates))
}

/// DELETE /api/candidates/:id
pub async fn delete_candidate(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    authed.require_recruiter()?;
    let state = state_lock.read().await.clone();

    CandidateService::new(state.db.clone()).delete(&id).await?;

    info!(candidate_id = %id, user_id = %authed.id, "Candidate deleted via API");
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /api/candidates/:id/status
///
/// # Request Body
/// ```json
/// { "status": "interview_scheduled", "note": "Panel on Friday" }
/// ```
pub async fn update_candidate_status(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(id): Path<String>,
    Json(payload): Json<StatusUpdateRequest>,
) -> Result<Json<StatusUpdateResponse>, ApiError> {
    authed.require_recruiter()?;
    StatusUpdateValidator.validate(&payload).into_result()?;

    let new_status: CandidateStatus = payload.status.parse().map_err(ApiError::ValidationError)?;
    let state = state_lock.read().await.clone();

    let (candidate, note) = CandidateService::new(state.db.clone())
        .update_status(&id, new_status, payload.note.as_deref(), &authed)
        .await?;

    Ok(Json(StatusUpdateResponse { candidate, note }))
}
