// src/common/config.rs
//! Environment-driven application configuration

use std::collections::HashSet;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::services::oracle::OracleMode;

/// All runtime settings, read once at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub upload_dir: PathBuf,
    pub max_upload_size: usize,
    pub allowed_extensions: HashSet<String>,
    pub jwt_secret: String,
    pub access_token_ttl_minutes: i64,
    pub openai: OpenAIConfig,
    pub worker: WorkerConfig,
    pub cors_origins: Vec<String>,
    pub port: u16,
    pub sentry_dsn: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub mode: OracleMode,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub concurrency: usize,
    pub poll_interval: Duration,
    pub retry_base_delay: Duration,
    pub max_retries: u32,
    pub soft_time_limit: Duration,
    pub hard_time_limit: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            poll_interval: Duration::from_secs(2),
            retry_base_delay: Duration::from_secs(60),
            max_retries: 3,
            soft_time_limit: Duration::from_secs(240),
            hard_time_limit: Duration::from_secs(300),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = WorkerConfig::default();

        let worker = WorkerConfig {
            concurrency: parse_env("WORKER_CONCURRENCY", defaults.concurrency).max(1),
            poll_interval: Duration::from_secs(parse_env("WORKER_POLL_INTERVAL_SECS", 2)),
            retry_base_delay: Duration::from_secs(parse_env("RETRY_BASE_DELAY_SECS", 60)),
            max_retries: parse_env("MAX_RETRIES", defaults.max_retries),
            soft_time_limit: Duration::from_secs(parse_env("TASK_SOFT_TIME_LIMIT_SECS", 240)),
            hard_time_limit: Duration::from_secs(parse_env("TASK_TIME_LIMIT_SECS", 300)),
        };

        let mode = env::var("ORACLE_MODE")
            .ok()
            .and_then(|m| m.parse::<OracleMode>().ok())
            .unwrap_or_default();

        let openai = OpenAIConfig {
            api_key: env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty()),
            base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com".to_string()),
            model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            mode,
            request_timeout: Duration::from_secs(parse_env("OPENAI_TIMEOUT_SECS", 180)),
        };

        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://candidates.db".to_string()),
            upload_dir: PathBuf::from(
                env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".to_string()),
            ),
            max_upload_size: parse_env("MAX_UPLOAD_SIZE", 10 * 1024 * 1024),
            allowed_extensions: parse_extensions(
                &env::var("ALLOWED_EXTENSIONS").unwrap_or_else(|_| "pdf,doc,docx".to_string()),
            ),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| "replace_with_strong_secret".to_string()),
            access_token_ttl_minutes: parse_env("ACCESS_TOKEN_EXPIRE_MINUTES", 30),
            openai,
            worker,
            cors_origins: env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3000".to_string())
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
            port: parse_env("PORT", 8080),
            sentry_dsn: env::var("SENTRY_DSN").ok().filter(|d| !d.trim().is_empty()),
        }
    }
}

/// Parse a comma-separated extension list into a lower-cased set
pub fn parse_extensions(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect()
}

fn parse_env<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_extensions_normalizes() {
        let exts = parse_extensions(" PDF, .docx ,doc,, ");
        assert_eq!(exts.len(), 3);
        assert!(exts.contains("pdf"));
        assert!(exts.contains("docx"));
        assert!(exts.contains("doc"));
    }

    #[test]
    fn test_worker_defaults() {
        let worker = WorkerConfig::default();
        assert_eq!(worker.max_retries, 3);
        assert_eq!(worker.retry_base_delay, Duration::from_secs(60));
        assert!(worker.soft_time_limit < worker.hard_time_limit);
    }
}
