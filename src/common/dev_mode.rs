// src/common/dev_mode.rs
//! Development mode configuration and utilities
//! Allows bypassing authentication for testing purposes

use sqlx::SqlitePool;
use std::env;

use crate::auth::models::{Role, User};
use crate::common::helpers::now_timestamp;

/// Fixed id so that candidates uploaded in dev mode keep a stable owner
pub const DEV_USER_ID: &str = "U_DEV000";

#[derive(Debug, Clone)]
pub struct DevModeConfig {
    pub enabled: bool,
    pub user_email: String,
    pub user_name: String,
    pub user_role: Role,
}

impl DevModeConfig {
    pub fn from_env() -> Self {
        let enabled = env::var("DEV_MODE")
            .unwrap_or_else(|_| "false".to_string())
            .to_lowercase()
            == "true";

        let user_email = env::var("DEV_USER_EMAIL").unwrap_or_else(|_| "dev@test.com".to_string());

        let user_name = env::var("DEV_USER_NAME").unwrap_or_else(|_| "Dev User".to_string());

        let user_role = env::var("DEV_USER_ROLE")
            .ok()
            .and_then(|r| r.parse::<Role>().ok())
            .unwrap_or(Role::Admin);

        Self {
            enabled,
            user_email,
            user_name,
            user_role,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Create the dev user returned by the auth extractor
    pub fn create_dev_user(&self) -> User {
        let now = now_timestamp();
        User {
            id: DEV_USER_ID.to_string(),
            email: self.user_email.clone(),
            username: "dev".to_string(),
            full_name: Some(self.user_name.clone()),
            role: self.user_role.as_str().to_string(),
            is_active: true,
            is_superuser: false,
            created_at: Some(now.clone()),
            updated_at: Some(now),
        }
    }

    /// Make sure the dev user exists so uploads satisfy the owner foreign key
    pub async fn ensure_dev_user(&self, pool: &SqlitePool) -> Result<(), sqlx::Error> {
        if !self.enabled {
            return Ok(());
        }

        let user = self.create_dev_user();
        sqlx::query(
            r#"
            INSERT INTO users (id, email, username, full_name, role, is_active, is_superuser, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 1, 0, ?, ?)
            ON CONFLICT(id) DO UPDATE SET role = excluded.role, full_name = excluded.full_name
            "#,
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.full_name)
        .bind(&user.role)
        .bind(&user.created_at)
        .bind(&user.updated_at)
        .execute(pool)
        .await?;

        Ok(())
    }
}

/// Print dev mode status on startup
pub fn print_dev_mode_status(config: &DevModeConfig) {
    if config.enabled {
        println!("⚠️  🔓 DEV MODE ENABLED 🔓 ⚠️");
        println!("   Authentication bypassed for testing");
        println!("   Dev User: {} ({})", config.user_name, config.user_email);
        println!("   Role: {}", config.user_role.as_str());
        println!("   ⚠️  DO NOT USE IN PRODUCTION ⚠️");
        println!();
    } else {
        println!("🔒 Production mode - Authentication required");
    }
}

/// CLI argument parsing for dev mode
pub fn parse_dev_mode_args() -> Option<bool> {
    env::args().find_map(|arg| match arg.as_str() {
        "--dev" | "--dev-mode" => Some(true),
        "--no-dev" | "--prod" | "--production" => Some(false),
        _ => None,
    })
}

/// Override dev mode from CLI args
pub fn apply_cli_override(mut config: DevModeConfig) -> DevModeConfig {
    if let Some(cli_dev_mode) = parse_dev_mode_args() {
        println!("🔧 CLI override: DEV_MODE = {}", cli_dev_mode);
        config.enabled = cli_dev_mode;
    }

    config
}
