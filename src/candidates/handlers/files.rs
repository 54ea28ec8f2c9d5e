// src/candidates/handlers/files.rs
//! File serving for candidate resumes

use axum::{
    extract::{Extension, Path},
    http::{header, StatusCode},
    response::IntoResponse,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

use crate::auth::AuthedUser;
use crate::candidates::services::CandidateService;
use crate::common::{ApiError, AppState};
use crate::services::text_extractor::file_extension;

/// GET /api/candidates/:id/download - Serve the candidate's current resume file
pub async fn download_resume(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    _authed: AuthedUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    let candidate = CandidateService::new(state.db.clone()).get_or_404(&id).await?;

    let file_path = std::path::Path::new(&candidate.file_path);
    let content = tokio::fs::read(file_path).await.map_err(|e| {
        warn!(candidate_id = %id, path = %candidate.file_path, error = %e, "Resume file unavailable");
        ApiError::NotFound("File not found".to_string())
    })?;

    let content_type = content_type_for(&file_extension(file_path));
    let disposition = format!(
        "attachment; filename=\"{}\"",
        candidate.filename.replace('"', "")
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        content,
    ))
}

fn content_type_for(extension: &str) -> &'static str {
    match extension {
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "doc" => "application/msword",
        _ => "application/octet-stream",
    }
}
