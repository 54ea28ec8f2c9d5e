// src/services/task_queue.rs
//! Persisted ingestion queue and the worker pool that drains it
//!
//! Every upload becomes an `ingestion_tasks` row. The worker claims due rows
//! with a compare-and-set update, so several workers may share a database.
//! Retries are ordinary row state: `attempts` and `next_run_at`.

use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::common::config::WorkerConfig;
use crate::common::generate_task_id;
use crate::common::helpers::{now_timestamp, timestamp_after};
use crate::services::file_storage::FileStorage;
use crate::services::ingestion::{
    ExecutionMode, IngestionError, IngestionOutcome, IngestionPipeline, IngestionRequest,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Running => "running",
            TaskStatus::Succeeded => "succeeded",
            TaskStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct IngestionTask {
    pub id: String,
    #[serde(skip_serializing)]
    pub file_path: String,
    pub filename: String,
    pub file_size: i64,
    pub uploaded_by: String,
    pub status: String,
    pub attempts: i64,
    pub max_retries: i64,
    pub next_run_at: String,
    pub last_error: Option<String>,
    pub candidate_id: Option<String>,
    pub is_update: Option<bool>,
    pub created_at: String,
    pub updated_at: String,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
}

impl IngestionTask {
    pub fn request(&self) -> IngestionRequest {
        IngestionRequest {
            file_path: PathBuf::from(&self.file_path),
            filename: self.filename.clone(),
            file_size: self.file_size,
            uploaded_by: self.uploaded_by.clone(),
        }
    }
}

/// Exponential backoff: `base_delay * 2^attempts`
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn delay_for(&self, attempts: u32) -> Duration {
        let factor = 2u32.checked_pow(attempts).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

impl From<&WorkerConfig> for RetryPolicy {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: config.retry_base_delay,
        }
    }
}

/// What happened to a task after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDisposition {
    Retry { delay: Duration },
    Terminal,
}

#[derive(Clone)]
pub struct TaskQueue {
    db: SqlitePool,
    policy: RetryPolicy,
}

impl TaskQueue {
    pub fn new(db: SqlitePool, policy: RetryPolicy) -> Self {
        Self { db, policy }
    }

    pub async fn enqueue(&self, request: &IngestionRequest) -> Result<IngestionTask, sqlx::Error> {
        let id = generate_task_id();
        let now = now_timestamp();

        sqlx::query(
            r#"
            INSERT INTO ingestion_tasks (
                id, file_path, filename, file_size, uploaded_by, status,
                attempts, max_retries, next_run_at, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, 'queued', 0, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(request.file_path.to_string_lossy().into_owned())
        .bind(&request.filename)
        .bind(request.file_size)
        .bind(&request.uploaded_by)
        .bind(self.policy.max_retries as i64)
        .bind(&now)
        .bind(&now)
        .bind(&now)
        .execute(&self.db)
        .await?;

        debug!(task_id = %id, filename = %request.filename, "Ingestion task queued");

        self.get(&id).await?.ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn get(&self, id: &str) -> Result<Option<IngestionTask>, sqlx::Error> {
        sqlx::query_as::<_, IngestionTask>("SELECT * FROM ingestion_tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db)
            .await
    }

    /// Move up to `limit` due tasks from `queued` to `running`
    pub async fn claim_due(&self, limit: usize) -> Result<Vec<IngestionTask>, sqlx::Error> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let now = now_timestamp();
        let due: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT id FROM ingestion_tasks
            WHERE status = 'queued' AND next_run_at <= ?
            ORDER BY next_run_at ASC
            LIMIT ?
            "#,
        )
        .bind(&now)
        .bind(limit as i64)
        .fetch_all(&self.db)
        .await?;

        let mut claimed = Vec::with_capacity(due.len());
        for (id,) in due {
            let result = sqlx::query(
                r#"
                UPDATE ingestion_tasks
                SET status = 'running', started_at = ?, updated_at = ?
                WHERE id = ? AND status = 'queued'
                "#,
            )
            .bind(&now)
            .bind(&now)
            .bind(&id)
            .execute(&self.db)
            .await?;

            // Someone else got it first
            if result.rows_affected() == 0 {
                continue;
            }

            if let Some(task) = self.get(&id).await? {
                claimed.push(task);
            }
        }

        Ok(claimed)
    }

    pub async fn mark_succeeded(&self, id: &str, outcome: &IngestionOutcome) -> Result<(), sqlx::Error> {
        let now = now_timestamp();
        sqlx::query(
            r#"
            UPDATE ingestion_tasks
            SET status = 'succeeded', candidate_id = ?, is_update = ?, last_error = NULL,
                finished_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&outcome.candidate_id)
        .bind(outcome.is_update)
        .bind(&now)
        .bind(&now)
        .bind(id)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    /// Put a task back in the queue after `delay`, counting the attempt
    pub async fn reschedule(&self, id: &str, delay: Duration, error: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE ingestion_tasks
            SET status = 'queued', attempts = attempts + 1, next_run_at = ?,
                last_error = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(timestamp_after(delay))
        .bind(error)
        .bind(now_timestamp())
        .bind(id)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    pub async fn mark_failed(&self, id: &str, error: &str) -> Result<(), sqlx::Error> {
        let now = now_timestamp();
        sqlx::query(
            r#"
            UPDATE ingestion_tasks
            SET status = 'failed', last_error = ?, finished_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(error)
        .bind(&now)
        .bind(&now)
        .bind(id)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    /// Apply the retry policy to a failed attempt
    pub async fn record_failure(
        &self,
        task: &IngestionTask,
        err: &IngestionError,
    ) -> Result<FailureDisposition, sqlx::Error> {
        let message = err.to_string();

        if err.is_retryable() && task.attempts < task.max_retries {
            let delay = self.policy.delay_for(task.attempts.max(0) as u32);
            self.reschedule(&task.id, delay, &message).await?;
            Ok(FailureDisposition::Retry { delay })
        } else {
            self.mark_failed(&task.id, &message).await?;
            Ok(FailureDisposition::Terminal)
        }
    }

    /// Return tasks orphaned by a crash to the queue
    pub async fn requeue_stale_running(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE ingestion_tasks SET status = 'queued', updated_at = ? WHERE status = 'running'",
        )
        .bind(now_timestamp())
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected())
    }
}

/// Polls the queue and runs ingestion attempts on a bounded pool
pub struct IngestionWorker {
    queue: TaskQueue,
    pipeline: Arc<IngestionPipeline>,
    config: WorkerConfig,
    permits: Arc<Semaphore>,
}

impl IngestionWorker {
    pub fn new(queue: TaskQueue, pipeline: Arc<IngestionPipeline>, config: WorkerConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.concurrency.max(1)));
        Self {
            queue,
            pipeline,
            config,
            permits,
        }
    }

    /// Poll until `shutdown` resolves
    pub async fn run(self, shutdown: impl Future<Output = ()>) {
        info!(
            concurrency = self.config.concurrency,
            poll_interval_secs = self.config.poll_interval.as_secs(),
            "Ingestion worker started"
        );

        let mut interval = tokio::time::interval(self.config.poll_interval);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.dispatch().await {
                        error!(error = %e, "Failed to claim ingestion tasks");
                    }
                }
                _ = &mut shutdown => {
                    info!("Ingestion worker stopping");
                    break;
                }
            }
        }
    }

    /// Claim whatever is due and wait for all of it to finish
    pub async fn run_once(&self) -> Result<usize, sqlx::Error> {
        let handles = self.dispatch().await?;
        let count = handles.len();
        for result in futures::future::join_all(handles).await {
            if let Err(e) = result {
                error!(error = %e, "Ingestion task panicked");
            }
        }
        Ok(count)
    }

    async fn dispatch(&self) -> Result<Vec<JoinHandle<()>>, sqlx::Error> {
        let capacity = self.permits.available_permits();
        let tasks = self.queue.claim_due(capacity).await?;

        let mut handles = Vec::with_capacity(tasks.len());
        for task in tasks {
            let Ok(permit) = self.permits.clone().acquire_owned().await else {
                break;
            };

            let queue = self.queue.clone();
            let pipeline = self.pipeline.clone();
            let limits = (self.config.soft_time_limit, self.config.hard_time_limit);

            handles.push(tokio::spawn(async move {
                let _permit = permit;
                process_task(queue, pipeline, limits, task).await;
            }));
        }

        Ok(handles)
    }
}

async fn process_task(
    queue: TaskQueue,
    pipeline: Arc<IngestionPipeline>,
    (soft_limit, hard_limit): (Duration, Duration),
    task: IngestionTask,
) {
    let request = task.request();
    info!(
        task_id = %task.id,
        filename = %task.filename,
        attempt = task.attempts + 1,
        "Processing ingestion task"
    );

    let attempt = pipeline.execute(&request, ExecutionMode::Queued);
    let result = with_time_limits(attempt, soft_limit, hard_limit, &task.id).await;

    match result {
        Ok(outcome) => {
            if let Err(e) = queue.mark_succeeded(&task.id, &outcome).await {
                error!(task_id = %task.id, error = %e, "Failed to record task success");
            }
        }
        Err(err) => match queue.record_failure(&task, &err).await {
            Ok(FailureDisposition::Retry { delay }) => {
                warn!(
                    task_id = %task.id,
                    attempts = task.attempts + 1,
                    retry_in_secs = delay.as_secs(),
                    error = %err,
                    "Ingestion task will be retried"
                );
            }
            Ok(FailureDisposition::Terminal) => {
                error!(
                    task_id = %task.id,
                    stage = %err.stage(),
                    error = %err,
                    "Ingestion task failed permanently"
                );
                FileStorage::remove_best_effort(&request.file_path).await;
            }
            Err(e) => {
                error!(task_id = %task.id, error = %e, "Failed to record task failure");
            }
        },
    }
}

/// Warn once past `soft`, abandon the attempt at `hard`
async fn with_time_limits<F>(
    attempt: F,
    soft: Duration,
    hard: Duration,
    task_id: &str,
) -> Result<IngestionOutcome, IngestionError>
where
    F: Future<Output = Result<IngestionOutcome, IngestionError>>,
{
    let watched = async {
        tokio::pin!(attempt);
        tokio::select! {
            result = &mut attempt => result,
            _ = tokio::time::sleep(soft) => {
                warn!(task_id = %task_id, soft_limit_secs = soft.as_secs(), "Ingestion task exceeded soft time limit");
                attempt.await
            }
        }
    };

    match tokio::time::timeout(hard, watched).await {
        Ok(result) => result,
        Err(_) => Err(IngestionError::TimedOut(hard)),
    }
}
