// Shared fixtures for database-backed tests

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::auth::models::{create_access_token, Role, User};
use crate::candidates::skill_query::skills_search_text;
use crate::common::config::{parse_extensions, AppConfig, OpenAIConfig, WorkerConfig};
use crate::common::dev_mode::DevModeConfig;
use crate::common::helpers::encode_string_list;
use crate::common::id_generator::{generate_candidate_id, generate_user_id};
use crate::common::migrations::create_schema;
use crate::common::AppState;
use crate::services::oracle::{ExtractionOracle, OracleMode};
use crate::services::{FileStorage, IngestionPipeline, RetryPolicy, TaskQueue};

pub const TEST_JWT_SECRET: &str = "test-secret";

/// Fresh in-memory database with the full schema
///
/// A single connection: every `sqlite::memory:` connection is its own database.
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory database");
    create_schema(&pool).await.expect("schema");
    pool
}

pub async fn insert_user(pool: &SqlitePool, role: Role) -> User {
    insert_user_named(pool, role, None).await
}

pub async fn insert_user_named(pool: &SqlitePool, role: Role, full_name: Option<&str>) -> User {
    let id = generate_user_id();
    let username = format!("user_{}", id.to_lowercase());
    let email = format!("{}@example.com", username);

    sqlx::query(
        r#"
        INSERT INTO users (id, email, username, full_name, role, is_active, is_superuser, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, 1, 0, '2024-01-01T00:00:00.000000Z', '2024-01-01T00:00:00.000000Z')
        "#,
    )
    .bind(&id)
    .bind(&email)
    .bind(&username)
    .bind(full_name)
    .bind(role.as_str())
    .execute(pool)
    .await
    .expect("insert user");

    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(&id)
        .fetch_one(pool)
        .await
        .expect("fetch user")
}

/// Candidate row builder for tests
#[derive(Debug, Clone)]
pub struct CandidateSeed {
    pub uploaded_by: String,
    pub created_at: String,
    pub status: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub skills: Vec<String>,
    pub file_path: String,
}

impl CandidateSeed {
    pub fn completed(uploaded_by: &str, created_at: &str) -> Self {
        Self {
            uploaded_by: uploaded_by.to_string(),
            created_at: created_at.to_string(),
            status: "completed".to_string(),
            name: None,
            email: None,
            phone: None,
            skills: Vec::new(),
            file_path: "/nonexistent/seed.pdf".to_string(),
        }
    }

    pub fn status(mut self, status: &str) -> Self {
        self.status = status.to_string();
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }

    pub fn phone(mut self, phone: &str) -> Self {
        self.phone = Some(phone.to_string());
        self
    }

    pub fn skills(mut self, skills: &[&str]) -> Self {
        self.skills = skills.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn file_path(mut self, path: &str) -> Self {
        self.file_path = path.to_string();
        self
    }
}

/// Insert a candidate and return its id
pub async fn insert_candidate(pool: &SqlitePool, seed: CandidateSeed) -> String {
    let id = generate_candidate_id();
    let filename = seed
        .file_path
        .rsplit('/')
        .next()
        .unwrap_or("seed.pdf")
        .to_string();

    sqlx::query(
        r#"
        INSERT INTO candidates (
            id, filename, file_path, file_size, status, name, email, phone,
            skills, skills_search, designations, uploaded_by, created_at, updated_at
        ) VALUES (?, ?, ?, 100, ?, ?, ?, ?, ?, ?, '[]', ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&filename)
    .bind(&seed.file_path)
    .bind(&seed.status)
    .bind(&seed.name)
    .bind(&seed.email)
    .bind(&seed.phone)
    .bind(encode_string_list(&seed.skills))
    .bind(skills_search_text(&seed.skills))
    .bind(&seed.uploaded_by)
    .bind(&seed.created_at)
    .bind(&seed.created_at)
    .execute(pool)
    .await
    .expect("insert candidate");

    id
}

pub async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .expect("count rows")
}

/// Configuration for handler tests: 1 MiB uploads, fast retries
pub fn test_config(upload_dir: &Path) -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        upload_dir: upload_dir.to_path_buf(),
        max_upload_size: 1024 * 1024,
        allowed_extensions: parse_extensions("pdf,doc,docx"),
        jwt_secret: TEST_JWT_SECRET.to_string(),
        access_token_ttl_minutes: 30,
        openai: OpenAIConfig {
            api_key: None,
            base_url: "http://127.0.0.1:9".to_string(),
            model: "test-model".to_string(),
            mode: OracleMode::Validating,
            request_timeout: Duration::from_secs(1),
        },
        worker: WorkerConfig {
            retry_base_delay: Duration::from_millis(0),
            ..WorkerConfig::default()
        },
        cors_origins: vec!["http://localhost:3000".to_string()],
        port: 0,
        sentry_dsn: None,
    }
}

/// Shared state wired to `oracle`, with authentication enforced
pub fn test_state(
    pool: SqlitePool,
    oracle: Arc<dyn ExtractionOracle>,
    config: AppConfig,
) -> Arc<RwLock<AppState>> {
    let pipeline = Arc::new(IngestionPipeline::new(pool.clone(), oracle));
    let task_queue = TaskQueue::new(pool.clone(), RetryPolicy::from(&config.worker));
    let storage = FileStorage::new(config.upload_dir.clone());

    Arc::new(RwLock::new(AppState {
        db: pool,
        config: Arc::new(config),
        dev_mode: DevModeConfig {
            enabled: false,
            user_email: "dev@test.com".to_string(),
            user_name: "Dev User".to_string(),
            user_role: Role::Admin,
        },
        storage,
        pipeline,
        task_queue,
    }))
}

/// `Authorization` header value for `user`
pub fn bearer(user: &User) -> String {
    let token = create_access_token(TEST_JWT_SECRET, &user.id, 30).expect("token");
    format!("Bearer {}", token)
}
