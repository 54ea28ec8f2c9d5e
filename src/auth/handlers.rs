//! Authentication handlers

use axum::extract::{Extension, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use super::extractors::AuthedUser;
use super::models::{create_access_token, User};
use crate::common::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct IssueTokenRequest {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in_minutes: i64,
}

/// POST /api/auth/token
/// Issues an access token for an active user (admin only)
///
/// # Request Body
/// ```json
/// { "user_id": "U_K7NP3X" }
/// ```
pub async fn issue_token(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Json(payload): Json<IssueTokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    authed.require_admin()?;
    let state = state_lock.read().await.clone();

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(&payload.user_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if !user.is_active {
        warn!(user_id = %user.id, "Refusing to issue token for inactive user");
        return Err(ApiError::BadRequest("Inactive user".to_string()));
    }

    let ttl = state.config.access_token_ttl_minutes;
    let access_token = create_access_token(&state.config.jwt_secret, &user.id, ttl).map_err(|e| {
        error!(error = %e, user_id = %user.id, "Failed to encode access token");
        ApiError::InternalServer(format!("token encoding failed: {}", e))
    })?;

    info!(issued_by = %authed.id, user_id = %user.id, "Access token issued");

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
        expires_in_minutes: ttl,
    }))
}

/// POST /api/auth/logout
/// Tokens are stateless; logout is handled client-side
pub async fn logout_handler(authed: AuthedUser) -> Result<Json<serde_json::Value>, ApiError> {
    info!(user_id = %authed.id, "User logout successful");
    Ok(Json(serde_json::json!({
        "message": "Logout successful"
    })))
}
