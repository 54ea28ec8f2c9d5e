//! Authentication extractors for Axum

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};

use super::models::{Claims, Role, User};
use crate::common::{safe_email_log, ApiError, AppState};

/// Authenticated user extractor
///
/// Validates the bearer JWT and loads the user (role, superuser flag) from
/// the database. Inactive users are rejected.
#[derive(Debug, Clone)]
pub struct AuthedUser {
    pub id: String,
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,
    pub role: Role,
    pub is_superuser: bool,
}

impl AuthedUser {
    /// Superusers pass every role check
    pub fn has_role_at_least(&self, minimum: Role) -> bool {
        self.is_superuser || self.role >= minimum
    }

    pub fn require_role(&self, minimum: Role) -> Result<(), ApiError> {
        if self.has_role_at_least(minimum) {
            Ok(())
        } else {
            warn!(
                user_id = %self.id,
                role = %self.role,
                required = %minimum,
                "Role check failed"
            );
            Err(ApiError::Forbidden(format!(
                "User role '{}' is not authorized. Required role: {} or higher",
                self.role, minimum
            )))
        }
    }

    pub fn require_recruiter(&self) -> Result<(), ApiError> {
        self.require_role(Role::Recruiter)
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        self.require_role(Role::Admin)
    }
}

impl From<User> for AuthedUser {
    fn from(u: User) -> Self {
        let role = u.role();
        AuthedUser {
            id: u.id,
            email: u.email,
            username: u.username,
            full_name: u.full_name,
            role,
            is_superuser: u.is_superuser,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Extract the Extension containing the AppState
        let Extension(state_lock): Extension<Arc<RwLock<AppState>>> =
            Extension::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::InternalServer("missing app state".to_string()))?;

        let app_state = state_lock.read().await.clone();

        // DEV MODE: Bypass authentication completely
        if app_state.dev_mode.is_enabled() {
            let dev_user = app_state.dev_mode.create_dev_user();

            debug!(
                user_id = %dev_user.id,
                email = %safe_email_log(&dev_user.email),
                role = %dev_user.role,
                "DEV MODE: Authentication bypassed"
            );

            return Ok(AuthedUser::from(dev_user));
        }

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .map(|s| s.to_string());

        let token = match token {
            Some(t) => t,
            None => {
                warn!("Authentication failed: missing Authorization header");
                return Err(ApiError::Unauthorized("missing auth".into()));
            }
        };

        // Handle "Bearer <token>" format or raw token
        let bare_token = token.strip_prefix("Bearer ").unwrap_or(&token);

        let decoded = match decode::<Claims>(
            bare_token,
            &DecodingKey::from_secret(app_state.config.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        ) {
            Ok(d) => d,
            Err(e) => {
                warn!(error = %e, "JWT token validation failed");
                return Err(ApiError::Unauthorized("invalid token".into()));
            }
        };

        let user_id = decoded.claims.sub;

        let user: Option<User> = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(&user_id)
            .fetch_optional(&app_state.db)
            .await
            .map_err(|e| {
                error!(
                    error = %e,
                    user_id = %user_id,
                    "Database error during user lookup in authentication"
                );
                ApiError::DatabaseError(e)
            })?;

        match user {
            Some(u) if !u.is_active => {
                warn!(user_id = %u.id, "Authentication failed: inactive user");
                Err(ApiError::Unauthorized("inactive user".into()))
            }
            Some(u) => {
                debug!(
                    user_id = %u.id,
                    email = %safe_email_log(&u.email),
                    role = %u.role,
                    "User authentication successful via extractor"
                );
                Ok(AuthedUser::from(u))
            }
            None => {
                warn!(user_id = %user_id, "Authentication failed: user not found in database");
                Err(ApiError::Unauthorized("user not found".into()))
            }
        }
    }
}
