// Application state shared across all modules

use sqlx::SqlitePool;
use std::sync::Arc;

use crate::common::config::AppConfig;
use crate::common::dev_mode::DevModeConfig;
use crate::services::{FileStorage, IngestionPipeline, TaskQueue};

/// Application state containing database pool, services, and configuration
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
    pub dev_mode: DevModeConfig,
    pub storage: FileStorage,
    pub pipeline: Arc<IngestionPipeline>,
    pub task_queue: TaskQueue,
}
