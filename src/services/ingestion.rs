// src/services/ingestion.rs
//! Resume ingestion: text extraction, structured extraction, identity
//! resolution and the create-or-update commit.

use sqlx::SqlitePool;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::candidates::models::Candidate;
use crate::candidates::skill_query::skills_search_text;
use crate::common::helpers::{encode_string_list, now_timestamp};
use crate::common::{generate_candidate_id, safe_email_log};
use crate::services::file_storage::FileStorage;
use crate::services::identity::IdentityResolver;
use crate::services::oracle::{ExtractionOracle, OracleError, StructuredCandidate};
use crate::services::text_extractor::{self, TextExtractionError};

/// One stored upload waiting to be turned into a candidate
#[derive(Debug, Clone)]
pub struct IngestionRequest {
    pub file_path: PathBuf,
    pub filename: String,
    pub file_size: i64,
    pub uploaded_by: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionStage {
    Received,
    ExtractingText,
    ExtractingStructure,
    ResolvingIdentity,
    Committing,
    Done,
    TimedOut,
}

impl fmt::Display for IngestionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IngestionStage::Received => "received",
            IngestionStage::ExtractingText => "extracting_text",
            IngestionStage::ExtractingStructure => "extracting_structure",
            IngestionStage::ResolvingIdentity => "resolving_identity",
            IngestionStage::Committing => "committing",
            IngestionStage::Done => "done",
            IngestionStage::TimedOut => "timed_out",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IngestionError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("Error extracting text: {0}")]
    ExtractionFailure(String),

    #[error("No text could be extracted from the document")]
    EmptyText,

    #[error("Document is not a resume ({document_type}): {reason}")]
    NotAResume { document_type: String, reason: String },

    #[error("Malformed extraction response: {0}")]
    MalformedOracleResponse(String),

    #[error("Extraction service error: {0}")]
    Oracle(String),

    #[error("Database error while {stage}: {source}")]
    Database {
        stage: IngestionStage,
        #[source]
        source: sqlx::Error,
    },

    #[error("Processing exceeded the time limit of {0:?}")]
    TimedOut(Duration),
}

impl IngestionError {
    /// Stage the attempt was in when it failed
    pub fn stage(&self) -> IngestionStage {
        match self {
            IngestionError::UnsupportedFormat(_)
            | IngestionError::ExtractionFailure(_)
            | IngestionError::EmptyText => IngestionStage::ExtractingText,
            IngestionError::NotAResume { .. }
            | IngestionError::MalformedOracleResponse(_)
            | IngestionError::Oracle(_) => IngestionStage::ExtractingStructure,
            IngestionError::Database { stage, .. } => *stage,
            IngestionError::TimedOut(_) => IngestionStage::TimedOut,
        }
    }

    /// Document problems are final; infrastructure problems may clear up
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            IngestionError::UnsupportedFormat(_)
                | IngestionError::ExtractionFailure(_)
                | IngestionError::EmptyText
                | IngestionError::NotAResume { .. }
        )
    }
}

impl From<TextExtractionError> for IngestionError {
    fn from(e: TextExtractionError) -> Self {
        match e {
            TextExtractionError::UnsupportedFormat(ext) => IngestionError::UnsupportedFormat(ext),
            TextExtractionError::ExtractionFailure(reason) => IngestionError::ExtractionFailure(reason),
        }
    }
}

impl From<OracleError> for IngestionError {
    fn from(e: OracleError) -> Self {
        match e {
            OracleError::NotAResume { document_type, reason } => {
                IngestionError::NotAResume { document_type, reason }
            }
            OracleError::MalformedResponse(msg) => IngestionError::MalformedOracleResponse(msg),
            other => IngestionError::Oracle(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionOutcome {
    pub candidate_id: String,
    pub candidate_name: Option<String>,
    pub is_update: bool,
}

/// Who owns retries and file cleanup for an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Request path: one attempt, the file goes on any failure
    Inline,
    /// Worker path: retryable failures keep the file for the next attempt
    Queued,
}

impl ExecutionMode {
    fn removes_file_on(&self, err: &IngestionError) -> bool {
        match self {
            ExecutionMode::Inline => true,
            ExecutionMode::Queued => !err.is_retryable(),
        }
    }
}

pub struct IngestionPipeline {
    db: SqlitePool,
    oracle: Arc<dyn ExtractionOracle>,
    resolver: IdentityResolver,
}

impl IngestionPipeline {
    pub fn new(db: SqlitePool, oracle: Arc<dyn ExtractionOracle>) -> Self {
        let resolver = IdentityResolver::new(db.clone());
        Self { db, oracle, resolver }
    }

    /// Run one attempt and apply the file cleanup rule of `mode`
    pub async fn execute(
        &self,
        request: &IngestionRequest,
        mode: ExecutionMode,
    ) -> Result<IngestionOutcome, IngestionError> {
        let result = self.run_attempt(request).await;

        if let Err(e) = &result {
            warn!(
                filename = %request.filename,
                stage = %e.stage(),
                retryable = e.is_retryable(),
                mode = ?mode,
                error = %e,
                "Ingestion attempt failed"
            );
            if mode.removes_file_on(e) {
                FileStorage::remove_best_effort(&request.file_path).await;
            }
        }

        result
    }

    /// Single attempt without any cleanup
    pub async fn run_attempt(&self, request: &IngestionRequest) -> Result<IngestionOutcome, IngestionError> {
        debug!(filename = %request.filename, stage = %IngestionStage::Received, "Ingestion started");

        // Stage: text
        let extension = declared_extension(request);
        debug!(filename = %request.filename, stage = %IngestionStage::ExtractingText, "Extracting text");
        let text = text_extractor::extract(&request.file_path, &extension).await?;
        if text.trim().is_empty() {
            return Err(IngestionError::EmptyText);
        }

        // Stage: structure
        debug!(
            filename = %request.filename,
            stage = %IngestionStage::ExtractingStructure,
            text_length = text.len(),
            "Requesting structured extraction"
        );
        let structured = self.oracle.extract_structured(&text).await?;

        // Stage: identity
        let existing = if structured.has_identity() {
            self.resolver
                .find_existing(structured.email.as_deref(), structured.phone.as_deref())
                .await
                .map_err(|source| IngestionError::Database {
                    stage: IngestionStage::ResolvingIdentity,
                    source,
                })?
        } else {
            debug!(filename = %request.filename, "No email or phone extracted, skipping identity match");
            None
        };

        let outcome = self.commit(request, &structured, existing).await?;

        info!(
            candidate_id = %outcome.candidate_id,
            is_update = outcome.is_update,
            email = %structured.email.as_deref().map(safe_email_log).unwrap_or_default(),
            stage = %IngestionStage::Done,
            "Resume ingested"
        );

        Ok(outcome)
    }

    /// Update the matched row, or insert when there is none
    ///
    /// A match deleted after resolution falls back to an insert and its old
    /// file is left alone.
    async fn commit(
        &self,
        request: &IngestionRequest,
        structured: &StructuredCandidate,
        existing: Option<Candidate>,
    ) -> Result<IngestionOutcome, IngestionError> {
        if let Some(previous) = existing {
            if self.update_existing(&previous.id, request, structured).await? {
                if Path::new(&previous.file_path) != request.file_path {
                    FileStorage::remove_best_effort(Path::new(&previous.file_path)).await;
                }

                return Ok(IngestionOutcome {
                    candidate_id: previous.id,
                    candidate_name: structured.name.clone(),
                    is_update: true,
                });
            }

            warn!(
                candidate_id = %previous.id,
                filename = %request.filename,
                stage = %IngestionStage::Committing,
                "Matched candidate disappeared before commit, inserting instead"
            );
        }

        let candidate_id = self.insert_new(request, structured).await?;
        Ok(IngestionOutcome {
            candidate_id,
            candidate_name: structured.name.clone(),
            is_update: false,
        })
    }

    /// `false` when the row no longer exists
    async fn update_existing(
        &self,
        candidate_id: &str,
        request: &IngestionRequest,
        structured: &StructuredCandidate,
    ) -> Result<bool, IngestionError> {
        let now = now_timestamp();

        let result = sqlx::query(
            r#"
            UPDATE candidates SET
                filename = ?, file_path = ?, file_size = ?,
                status = 'completed',
                name = ?, email = ?, phone = ?,
                skills = ?, skills_search = ?, designations = ?, domain_knowledge = ?,
                raw_parsed_data = ?, error_message = NULL,
                processed_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&request.filename)
        .bind(request.file_path.to_string_lossy().into_owned())
        .bind(request.file_size)
        .bind(&structured.name)
        .bind(&structured.email)
        .bind(&structured.phone)
        .bind(encode_string_list(&structured.skills))
        .bind(skills_search_text(&structured.skills))
        .bind(encode_string_list(&structured.designations))
        .bind(&structured.domain_knowledge)
        .bind(raw_json(structured))
        .bind(&now)
        .bind(&now)
        .bind(candidate_id)
        .execute(&self.db)
        .await
        .map_err(commit_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_new(
        &self,
        request: &IngestionRequest,
        structured: &StructuredCandidate,
    ) -> Result<String, IngestionError> {
        let candidate_id = generate_candidate_id();
        let now = now_timestamp();

        sqlx::query(
            r#"
            INSERT INTO candidates (
                id, filename, file_path, file_size, status,
                name, email, phone, skills, skills_search, designations, domain_knowledge,
                raw_parsed_data, uploaded_by, created_at, updated_at, processed_at
            ) VALUES (?, ?, ?, ?, 'completed', ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&candidate_id)
        .bind(&request.filename)
        .bind(request.file_path.to_string_lossy().into_owned())
        .bind(request.file_size)
        .bind(&structured.name)
        .bind(&structured.email)
        .bind(&structured.phone)
        .bind(encode_string_list(&structured.skills))
        .bind(skills_search_text(&structured.skills))
        .bind(encode_string_list(&structured.designations))
        .bind(&structured.domain_knowledge)
        .bind(raw_json(structured))
        .bind(&request.uploaded_by)
        .bind(&now)
        .bind(&now)
        .bind(&now)
        .execute(&self.db)
        .await
        .map_err(commit_error)?;

        Ok(candidate_id)
    }
}

fn declared_extension(request: &IngestionRequest) -> String {
    let from_name = text_extractor::file_extension(Path::new(&request.filename));
    if from_name.is_empty() {
        text_extractor::file_extension(&request.file_path)
    } else {
        from_name
    }
}

fn raw_json(structured: &StructuredCandidate) -> String {
    serde_json::to_string(structured).unwrap_or_else(|_| "{}".to_string())
}

fn commit_error(source: sqlx::Error) -> IngestionError {
    IngestionError::Database {
        stage: IngestionStage::Committing,
        source,
    }
}
