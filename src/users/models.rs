// src/users/models.rs

use serde::Deserialize;

use crate::auth::Role;

/// Admin request body for creating an account
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,
    pub role: Option<Role>,
    #[serde(default)]
    pub is_superuser: bool,
}

/// Partial update; absent fields are left unchanged
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

impl UpdateUserRequest {
    /// Fields a user may change on their own account
    pub fn self_service(self) -> Self {
        Self {
            role: None,
            is_active: None,
            ..self
        }
    }

    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.username.is_none()
            && self.full_name.is_none()
            && self.role.is_none()
            && self.is_active.is_none()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}
