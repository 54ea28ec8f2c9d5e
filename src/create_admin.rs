// create_admin.rs
// Utility to bootstrap the first admin account and print an access token

#[path = "auth/models.rs"]
#[allow(dead_code)]
mod models;

#[path = "common/migrations.rs"]
mod migrations;

#[path = "common/id_generator.rs"]
#[allow(dead_code)]
mod id_generator;

use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use dotenv::dotenv;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::env;
use std::str::FromStr;

use models::{create_access_token, Role, User};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt().with_target(false).init();

    let database_url =
        env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://candidates.db".to_string());
    let jwt_secret =
        env::var("JWT_SECRET").unwrap_or_else(|_| "replace_with_strong_secret".to_string());
    let ttl_minutes = env::var("ACCESS_TOKEN_EXPIRE_MINUTES")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(30);

    let email = env::var("ADMIN_EMAIL").unwrap_or_else(|_| "admin@example.com".to_string());
    let username = env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string());
    let full_name =
        env::var("ADMIN_FULL_NAME").unwrap_or_else(|_| "System Administrator".to_string());

    let connect_options = SqliteConnectOptions::from_str(&database_url)?
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(connect_options)
        .await
        .with_context(|| format!("failed to open {}", database_url))?;

    migrations::run_migrations(&pool).await?;

    let existing = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ? OR email = ?")
        .bind(&username)
        .bind(&email)
        .fetch_optional(&pool)
        .await?;

    let admin = match existing {
        Some(user) => {
            println!("ℹ️  Admin user already exists: {} ({})", user.username, user.id);
            user
        }
        None => {
            let id = id_generator::generate_user_id();
            let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

            sqlx::query(
                r#"
                INSERT INTO users (id, email, username, full_name, role, is_active, is_superuser, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, 1, 1, ?, ?)
                "#,
            )
            .bind(&id)
            .bind(&email)
            .bind(&username)
            .bind(&full_name)
            .bind(Role::Admin.as_str())
            .bind(&now)
            .bind(&now)
            .execute(&pool)
            .await
            .context("failed to insert admin user")?;

            println!("✅ Admin user created successfully!");
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
                .bind(&id)
                .fetch_one(&pool)
                .await?
        }
    };

    let token = create_access_token(&jwt_secret, &admin.id, ttl_minutes)?;

    println!("─────────────────────────────────────────────────");
    println!("User id:  {}", admin.id);
    println!("Name:     {}", admin.display_name());
    println!("Username: {}", admin.username);
    println!("Email:    {}", admin.email);
    println!("Role:     {}", admin.role());
    println!("─────────────────────────────────────────────────");
    println!("Access token (valid {} minutes):", ttl_minutes);
    println!("{}", token);

    Ok(())
}
