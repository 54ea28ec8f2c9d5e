// src/users/services.rs

use sqlx::SqlitePool;
use std::path::Path;
use tracing::{error, info, warn};

use super::models::{CreateUserRequest, UpdateUserRequest, UserListQuery};
use crate::auth::{AuthedUser, Role, User};
use crate::candidates::services::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::candidates::skill_query::escape_like;
use crate::common::error::ApiError;
use crate::common::generate_user_id;
use crate::common::helpers::now_timestamp;
use crate::services::FileStorage;

pub struct UserService {
    db: SqlitePool,
}

impl UserService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn get(&self, id: &str) -> Result<User, ApiError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .map_err(ApiError::DatabaseError)?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    }

    pub async fn create(&self, request: &CreateUserRequest) -> Result<User, ApiError> {
        let email = request.email.trim();
        let username = request.username.trim();

        self.ensure_unique(Some(email), Some(username), None).await?;

        let id = generate_user_id();
        let now = now_timestamp();
        let role = request.role.unwrap_or(Role::Viewer);

        sqlx::query(
            r#"
            INSERT INTO users (id, email, username, full_name, role, is_active, is_superuser, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 1, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(email)
        .bind(username)
        .bind(request.full_name.as_deref().map(str::trim))
        .bind(role.as_str())
        .bind(request.is_superuser)
        .bind(&now)
        .bind(&now)
        .execute(&self.db)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to create user");
            ApiError::DatabaseError(e)
        })?;

        info!(user_id = %id, role = %role, "User created");
        self.get(&id).await
    }

    pub async fn list(&self, query: &UserListQuery) -> Result<Vec<User>, ApiError> {
        let mut sql = "SELECT * FROM users WHERE 1 = 1".to_string();
        let mut binds: Vec<String> = Vec::new();

        if let Some(role) = query.role {
            sql.push_str(" AND role = ?");
            binds.push(role.as_str().to_string());
        }

        if let Some(is_active) = query.is_active {
            sql.push_str(if is_active {
                " AND is_active = 1"
            } else {
                " AND is_active = 0"
            });
        }

        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", escape_like(&search.to_lowercase()));
            sql.push_str(
                r" AND (LOWER(username) LIKE ? ESCAPE '\' OR LOWER(email) LIKE ? ESCAPE '\')",
            );
            binds.push(pattern.clone());
            binds.push(pattern);
        }

        sql.push_str(" ORDER BY created_at ASC, id ASC LIMIT ? OFFSET ?");

        let mut q = sqlx::query_as::<_, User>(&sql);
        for value in &binds {
            q = q.bind(value);
        }

        q.bind(query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE))
            .bind(query.skip.unwrap_or(0).max(0))
            .fetch_all(&self.db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to list users");
                ApiError::DatabaseError(e)
            })
    }

    pub async fn update(&self, id: &str, request: &UpdateUserRequest) -> Result<User, ApiError> {
        let existing = self.get(id).await?;

        let email = request.email.as_deref().map(str::trim);
        let username = request.username.as_deref().map(str::trim);
        self.ensure_unique(
            email.filter(|e| *e != existing.email),
            username.filter(|u| *u != existing.username),
            Some(id),
        )
        .await?;

        let mut sql = "UPDATE users SET updated_at = ?".to_string();
        let mut binds: Vec<Option<String>> = vec![Some(now_timestamp())];

        if let Some(email) = email {
            sql.push_str(", email = ?");
            binds.push(Some(email.to_string()));
        }
        if let Some(username) = username {
            sql.push_str(", username = ?");
            binds.push(Some(username.to_string()));
        }
        if let Some(full_name) = &request.full_name {
            sql.push_str(", full_name = ?");
            let trimmed = full_name.trim();
            binds.push((!trimmed.is_empty()).then(|| trimmed.to_string()));
        }
        if let Some(role) = request.role {
            sql.push_str(", role = ?");
            binds.push(Some(role.as_str().to_string()));
        }
        if let Some(is_active) = request.is_active {
            sql.push_str(if is_active {
                ", is_active = 1"
            } else {
                ", is_active = 0"
            });
        }
        sql.push_str(" WHERE id = ?");

        let mut q = sqlx::query(&sql);
        for value in &binds {
            q = q.bind(value);
        }

        q.bind(id).execute(&self.db).await.map_err(|e| {
            error!(error = %e, user_id = %id, "Failed to update user");
            ApiError::DatabaseError(e)
        })?;

        info!(user_id = %id, "User updated");
        self.get(id).await
    }

    /// Flip `is_active`, refusing no-op transitions and self-deactivation
    pub async fn set_active(
        &self,
        id: &str,
        active: bool,
        actor: &AuthedUser,
    ) -> Result<User, ApiError> {
        let user = self.get(id).await?;

        if !active && user.id == actor.id {
            return Err(ApiError::BadRequest(
                "You cannot deactivate your own account".to_string(),
            ));
        }
        if user.is_active == active {
            let state = if active { "active" } else { "inactive" };
            return Err(ApiError::BadRequest(format!("User is already {}", state)));
        }

        self.update(
            id,
            &UpdateUserRequest {
                is_active: Some(active),
                ..Default::default()
            },
        )
        .await
    }

    /// Remove the account, its candidates and notes, then their stored files
    pub async fn delete(&self, id: &str, actor: &AuthedUser) -> Result<(), ApiError> {
        let user = self.get(id).await?;

        if user.id == actor.id {
            return Err(ApiError::BadRequest(
                "You cannot delete your own account".to_string(),
            ));
        }

        let file_paths: Vec<String> =
            sqlx::query_scalar("SELECT file_path FROM candidates WHERE uploaded_by = ?")
                .bind(id)
                .fetch_all(&self.db)
                .await
                .map_err(ApiError::DatabaseError)?;

        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(|e| {
                error!(error = %e, user_id = %id, "Failed to delete user");
                ApiError::DatabaseError(e)
            })?;

        for path in &file_paths {
            FileStorage::remove_best_effort(Path::new(path)).await;
        }

        info!(
            user_id = %id,
            deleted_by = %actor.id,
            candidates_removed = file_paths.len(),
            "User deleted"
        );
        Ok(())
    }

    async fn ensure_unique(
        &self,
        email: Option<&str>,
        username: Option<&str>,
        exclude_id: Option<&str>,
    ) -> Result<(), ApiError> {
        let exclude = exclude_id.unwrap_or("");

        if let Some(email) = email {
            let taken: Option<String> =
                sqlx::query_scalar("SELECT id FROM users WHERE LOWER(email) = LOWER(?) AND id != ?")
                    .bind(email)
                    .bind(exclude)
                    .fetch_optional(&self.db)
                    .await
                    .map_err(ApiError::DatabaseError)?;
            if taken.is_some() {
                warn!("Rejected duplicate email");
                return Err(ApiError::BadRequest("Email already registered".to_string()));
            }
        }

        if let Some(username) = username {
            let taken: Option<String> =
                sqlx::query_scalar("SELECT id FROM users WHERE username = ? AND id != ?")
                    .bind(username)
                    .bind(exclude)
                    .fetch_optional(&self.db)
                    .await
                    .map_err(ApiError::DatabaseError)?;
            if taken.is_some() {
                warn!(username = %username, "Rejected duplicate username");
                return Err(ApiError::BadRequest("Username already taken".to_string()));
            }
        }

        Ok(())
    }
}
