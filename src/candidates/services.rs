// src/candidates/services.rs

use sqlx::SqlitePool;
use std::path::Path;
use tracing::{error, info};

use crate::auth::AuthedUser;
use crate::candidates::models::{Candidate, CandidateListQuery, CandidateNote, CandidateStatus};
use crate::candidates::notes::{NoteService, NOTE_SELECT};
use crate::candidates::skill_query::{escape_like, SkillQuery, SkillQueryMode};
use crate::common::error::ApiError;
use crate::common::generate_note_id;
use crate::common::helpers::now_timestamp;
use crate::services::FileStorage;

pub const DEFAULT_PAGE_SIZE: i64 = 100;
pub const MAX_PAGE_SIZE: i64 = 500;

/// Validated list parameters
#[derive(Debug, Clone)]
pub struct CandidateFilters {
    pub skip: i64,
    pub limit: i64,
    pub status: Option<String>,
    pub skills: SkillQuery,
}

impl CandidateFilters {
    pub fn from_query(query: &CandidateListQuery) -> Result<Self, ApiError> {
        let mode = match query.skill_mode.as_deref() {
            Some(raw) if !raw.trim().is_empty() => {
                raw.parse::<SkillQueryMode>().map_err(ApiError::BadRequest)?
            }
            _ => SkillQueryMode::default(),
        };

        let skills = query
            .skills
            .as_deref()
            .map(|raw| SkillQuery::parse(raw, mode))
            .unwrap_or_default();

        Ok(Self {
            skip: query.skip.unwrap_or(0).max(0),
            limit: query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
            status: query
                .status
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            skills,
        })
    }
}

pub struct CandidateService {
    db: SqlitePool,
}

impl CandidateService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Filter, then order newest first, then page
    pub async fn list(&self, filters: &CandidateFilters) -> Result<Vec<Candidate>, ApiError> {
        let mut sql = "SELECT * FROM candidates WHERE 1 = 1".to_string();
        let mut binds: Vec<String> = Vec::new();

        if let Some(status) = &filters.status {
            sql.push_str(" AND status = ?");
            binds.push(status.clone());
        }

        if let Some((fragment, patterns)) = filters.skills.to_sql("skills_search") {
            sql.push_str(" AND ");
            sql.push_str(&fragment);
            binds.extend(patterns);
        }

        sql.push_str(" ORDER BY created_at DESC LIMIT ? OFFSET ?");

        let mut query = sqlx::query_as::<_, Candidate>(&sql);
        for value in &binds {
            query = query.bind(value);
        }

        query
            .bind(filters.limit)
            .bind(filters.skip)
            .fetch_all(&self.db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to list candidates");
                ApiError::DatabaseError(e)
            })
    }

    pub async fn get(&self, id: &str) -> Result<Option<Candidate>, ApiError> {
        sqlx::query_as::<_, Candidate>("SELECT * FROM candidates WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .map_err(ApiError::DatabaseError)
    }

    pub async fn get_or_404(&self, id: &str) -> Result<Candidate, ApiError> {
        self.get(id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Candidate not found".to_string()))
    }

    /// Oldest candidate carrying `email`, in any status
    pub async fn find_by_email(&self, email: &str) -> Result<Option<Candidate>, ApiError> {
        sqlx::query_as::<_, Candidate>(
            "SELECT * FROM candidates WHERE email = ? ORDER BY created_at ASC LIMIT 1",
        )
        .bind(email.trim())
        .fetch_optional(&self.db)
        .await
        .map_err(ApiError::DatabaseError)
    }

    /// Completed candidates whose skills mention `skill`
    pub async fn search_by_skill(&self, skill: &str, limit: i64) -> Result<Vec<Candidate>, ApiError> {
        let pattern = format!("%{}%", escape_like(&skill.trim().to_lowercase()));

        sqlx::query_as::<_, Candidate>(
            r#"
            SELECT * FROM candidates
            WHERE status = 'completed' AND skills_search LIKE ? ESCAPE '\'
            ORDER BY created_at DESC
            LIMIT ?
            "#,
        )
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.db)
        .await
        .map_err(ApiError::DatabaseError)
    }

    /// Remove the stored file, then the row; notes go with it
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let candidate = self.get_or_404(id).await?;

        FileStorage::remove_best_effort(Path::new(&candidate.file_path)).await;

        sqlx::query("DELETE FROM candidates WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(|e| {
                error!(error = %e, candidate_id = %id, "Failed to delete candidate");
                ApiError::DatabaseError(e)
            })?;

        info!(candidate_id = %id, "Candidate deleted");
        Ok(())
    }

    /// Set a new status and record the transition as a note, atomically
    pub async fn update_status(
        &self,
        id: &str,
        new_status: CandidateStatus,
        note: Option<&str>,
        author: &AuthedUser,
    ) -> Result<(Candidate, CandidateNote), ApiError> {
        let candidate = self.get_or_404(id).await?;
        let previous_status = candidate.status.clone();
        let note_text = note
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| {
                format!("Status changed from {} to {}", previous_status, new_status)
            });

        let note_id = generate_note_id();
        let now = now_timestamp();

        let mut tx = self.db.begin().await.map_err(ApiError::DatabaseError)?;

        sqlx::query("UPDATE candidates SET status = ?, updated_at = ? WHERE id = ?")
            .bind(new_status.as_str())
            .bind(&now)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::DatabaseError)?;

        sqlx::query(
            r#"
            INSERT INTO candidate_notes (id, candidate_id, user_id, note, previous_status, new_status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&note_id)
        .bind(id)
        .bind(&author.id)
        .bind(&note_text)
        .bind(&previous_status)
        .bind(new_status.as_str())
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(ApiError::DatabaseError)?;

        tx.commit().await.map_err(ApiError::DatabaseError)?;

        info!(
            candidate_id = %id,
            user_id = %author.id,
            from = %previous_status,
            to = %new_status,
            "Candidate status changed"
        );

        let updated = self.get_or_404(id).await?;
        let note = sqlx::query_as::<_, CandidateNote>(&format!("{} WHERE n.id = ?", NOTE_SELECT))
            .bind(&note_id)
            .fetch_one(&self.db)
            .await
            .map_err(ApiError::DatabaseError)?;

        Ok((updated, note))
    }

    pub fn notes(&self) -> NoteService {
        NoteService::new(self.db.clone())
    }
}
