// src/candidates/handlers/tasks.rs

use axum::extract::{Extension, Json, Path};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::auth::AuthedUser;
use crate::common::{ApiError, AppState};
use crate::services::task_queue::IngestionTask;

/// GET /api/ingestion-tasks/:id - Poll a queued upload
pub async fn get_ingestion_task(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    _authed: AuthedUser,
    Path(id): Path<String>,
) -> Result<Json<IngestionTask>, ApiError> {
    let state = state_lock.read().await.clone();

    state
        .task_queue
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Ingestion task not found".to_string()))
}
