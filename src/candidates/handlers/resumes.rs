// src/candidates/handlers/resumes.rs
//! Resume upload: validate, store, then queue or ingest inline

use axum::{
    extract::{Extension, Multipart},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::auth::AuthedUser;
use crate::candidates::models::UploadAccepted;
use crate::candidates::services::CandidateService;
use crate::candidates::validators::{UploadFile, UploadValidator};
use crate::common::{ApiError, AppState, Validator};
use crate::services::{ExecutionMode, FileStorage, IngestionRequest};

/// POST /api/candidates/upload
/// Stores the file and queues it for background ingestion
pub async fn upload_resume(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    authed.require_recruiter()?;
    let state = state_lock.read().await.clone();

    let request = receive_upload(&state, &authed, multipart).await?;

    let task = match state.task_queue.enqueue(&request).await {
        Ok(task) => task,
        Err(e) => {
            error!(error = %e, filename = %request.filename, "Failed to queue ingestion task");
            FileStorage::remove_best_effort(&request.file_path).await;
            return Err(ApiError::DatabaseError(e));
        }
    };

    info!(
        user_id = %authed.id,
        task_id = %task.id,
        filename = %request.filename,
        size = request.file_size,
        "Resume queued for processing"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(UploadAccepted {
            message: "Resume uploaded successfully and queued for processing".to_string(),
            filename: request.filename,
            status: "processing".to_string(),
            task_id: task.id,
        }),
    ))
}

/// POST /api/candidates/upload/sync
/// Runs the whole pipeline in the request and returns the candidate
pub async fn upload_resume_sync(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    authed.require_recruiter()?;
    let state = state_lock.read().await.clone();

    let request = receive_upload(&state, &authed, multipart).await?;
    let outcome = state.pipeline.execute(&request, ExecutionMode::Inline).await?;

    info!(
        user_id = %authed.id,
        candidate_id = %outcome.candidate_id,
        is_update = outcome.is_update,
        "Resume processed inline"
    );

    let candidate = CandidateService::new(state.db.clone())
        .get_or_404(&outcome.candidate_id)
        .await?;

    Ok((StatusCode::CREATED, Json(candidate)))
}

/// Read the `file` field, validate it and write it to the upload directory
async fn receive_upload(
    state: &AppState,
    authed: &AuthedUser,
    mut multipart: Multipart,
) -> Result<IngestionRequest, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|_| ApiError::BadRequest("Invalid file".to_string()))?;

        let validator = UploadValidator {
            allowed_extensions: &state.config.allowed_extensions,
            max_size: state.config.max_upload_size,
        };
        let validation = validator.validate(&UploadFile {
            filename: &filename,
            size: data.len(),
        });
        if !validation.is_valid {
            warn!(user_id = %authed.id, filename = %filename, size = data.len(), "Upload rejected");
            return Err(validation.into());
        }

        let stored = state.storage.save(&filename, &data).await.map_err(|e| {
            error!(error = %e, filename = %filename, "Failed to store upload");
            ApiError::InternalServer("Failed to save file".to_string())
        })?;

        return Ok(IngestionRequest {
            file_path: stored.path,
            filename,
            file_size: stored.size,
            uploaded_by: authed.id.clone(),
        });
    }

    Err(ApiError::BadRequest("No file provided".to_string()))
}
