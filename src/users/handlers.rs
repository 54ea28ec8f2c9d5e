// src/users/handlers.rs

use axum::{
    extract::{Extension, Json, Path, Query},
    http::StatusCode,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::models::{CreateUserRequest, UpdateUserRequest, UserListQuery};
use super::services::UserService;
use super::validators::UserValidator;
use crate::auth::{AuthedUser, User};
use crate::common::{ApiError, AppState, Validator};

/// GET /api/users/me
pub async fn get_me(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<Json<User>, ApiError> {
    let state = state_lock.read().await.clone();
    let user = UserService::new(state.db.clone()).get(&authed.id).await?;
    Ok(Json(user))
}

/// PUT /api/users/me - Role and active flag are not self-service
pub async fn update_me(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<User>, ApiError> {
    let payload = payload.self_service();
    let validation = UserValidator.validate(&payload);
    if !validation.is_valid {
        warn!(user_id = %authed.id, errors = ?validation.errors, "Profile update validation failed");
        return Err(ApiError::from(validation));
    }

    let state = state_lock.read().await.clone();
    let user = UserService::new(state.db.clone())
        .update(&authed.id, &payload)
        .await?;
    Ok(Json(user))
}

/// POST /api/users (admin)
pub async fn create_user(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    authed.require_admin()?;
    UserValidator.validate(&payload).into_result()?;
    let state = state_lock.read().await.clone();

    let user = UserService::new(state.db.clone()).create(&payload).await?;
    info!(created_by = %authed.id, user_id = %user.id, "Admin created user");

    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /api/users (admin)
pub async fn list_users(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Query(query): Query<UserListQuery>,
) -> Result<Json<Vec<User>>, ApiError> {
    authed.require_admin()?;
    let state = state_lock.read().await.clone();
    let users = UserService::new(state.db.clone()).list(&query).await?;
    Ok(Json(users))
}

/// GET /api/users/:id (admin)
pub async fn get_user(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(id): Path<String>,
) -> Result<Json<User>, ApiError> {
    authed.require_admin()?;
    let state = state_lock.read().await.clone();
    let user = UserService::new(state.db.clone()).get(&id).await?;
    Ok(Json(user))
}

/// PUT /api/users/:id (admin)
pub async fn update_user(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<User>, ApiError> {
    authed.require_admin()?;
    UserValidator.validate(&payload).into_result()?;
    let state = state_lock.read().await.clone();

    let user = UserService::new(state.db.clone()).update(&id, &payload).await?;
    Ok(Json(user))
}

/// PATCH /api/users/:id/activate (admin)
pub async fn activate_user(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(id): Path<String>,
) -> Result<Json<User>, ApiError> {
    authed.require_admin()?;
    let state = state_lock.read().await.clone();
    let user = UserService::new(state.db.clone())
        .set_active(&id, true, &authed)
        .await?;
    Ok(Json(user))
}

/// PATCH /api/users/:id/deactivate (admin)
pub async fn deactivate_user(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(id): Path<String>,
) -> Result<Json<User>, ApiError> {
    authed.require_admin()?;
    let state = state_lock.read().await.clone();
    let user = UserService::new(state.db.clone())
        .set_active(&id, false, &authed)
        .await?;
    Ok(Json(user))
}

/// DELETE /api/users/:id (admin) - Cascades to the user's candidates and notes
pub async fn delete_user(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    authed.require_admin()?;
    let state = state_lock.read().await.clone();
    UserService::new(state.db.clone()).delete(&id, &authed).await?;
    Ok(StatusCode::NO_CONTENT)
}
