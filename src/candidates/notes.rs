// src/candidates/notes.rs
//! Candidate notes. Any authenticated user may write one; only the author or
//! a recruiter-or-above may change or remove it.

use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::auth::{AuthedUser, Role};
use crate::candidates::models::CandidateNote;
use crate::common::error::ApiError;
use crate::common::generate_note_id;
use crate::common::helpers::now_timestamp;

/// Note columns plus the author's display name
pub const NOTE_SELECT: &str = r#"
    SELECT n.id, n.candidate_id, n.user_id, n.note, n.previous_status, n.new_status,
           n.created_at, n.updated_at,
           COALESCE(NULLIF(TRIM(u.full_name), ''), u.username) AS created_by
    FROM candidate_notes n
    JOIN users u ON u.id = n.user_id"#;

pub fn can_modify_note(note: &CandidateNote, actor: &AuthedUser) -> bool {
    note.user_id == actor.id || actor.has_role_at_least(Role::Recruiter)
}

pub struct NoteService {
    db: SqlitePool,
}

impl NoteService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    async fn ensure_candidate(&self, candidate_id: &str) -> Result<(), ApiError> {
        let exists: Option<(String,)> = sqlx::query_as("SELECT id FROM candidates WHERE id = ?")
            .bind(candidate_id)
            .fetch_optional(&self.db)
            .await
            .map_err(ApiError::DatabaseError)?;

        exists
            .map(|_| ())
            .ok_or_else(|| ApiError::NotFound("Candidate not found".to_string()))
    }

    pub async fn add(
        &self,
        candidate_id: &str,
        author: &AuthedUser,
        text: &str,
        previous_status: Option<&str>,
        new_status: Option<&str>,
    ) -> Result<CandidateNote, ApiError> {
        self.ensure_candidate(candidate_id).await?;

        let note_id = generate_note_id();
        let now = now_timestamp();

        sqlx::query(
            r#"
            INSERT INTO candidate_notes (id, candidate_id, user_id, note, previous_status, new_status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&note_id)
        .bind(candidate_id)
        .bind(&author.id)
        .bind(text.trim())
        .bind(previous_status)
        .bind(new_status)
        .bind(&now)
        .bind(&now)
        .execute(&self.db)
        .await
        .map_err(ApiError::DatabaseError)?;

        info!(note_id = %note_id, candidate_id = %candidate_id, user_id = %author.id, "Note added");

        self.get(&note_id).await
    }

    /// Oldest first
    pub async fn list(&self, candidate_id: &str) -> Result<Vec<CandidateNote>, ApiError> {
        self.ensure_candidate(candidate_id).await?;

        sqlx::query_as::<_, CandidateNote>(&format!(
            "{} WHERE n.candidate_id = ? ORDER BY n.created_at ASC, n.id ASC",
            NOTE_SELECT
        ))
        .bind(candidate_id)
        .fetch_all(&self.db)
        .await
        .map_err(ApiError::DatabaseError)
    }

    pub async fn get(&self, note_id: &str) -> Result<CandidateNote, ApiError> {
        sqlx::query_as::<_, CandidateNote>(&format!("{} WHERE n.id = ?", NOTE_SELECT))
            .bind(note_id)
            .fetch_optional(&self.db)
            .await
            .map_err(ApiError::DatabaseError)?
            .ok_or_else(|| ApiError::NotFound("Note not found".to_string()))
    }

    pub async fn update(
        &self,
        note_id: &str,
        actor: &AuthedUser,
        text: &str,
    ) -> Result<CandidateNote, ApiError> {
        let note = self.get(note_id).await?;
        self.authorize(&note, actor)?;

        sqlx::query("UPDATE candidate_notes SET note = ?, updated_at = ? WHERE id = ?")
            .bind(text.trim())
            .bind(now_timestamp())
            .bind(note_id)
            .execute(&self.db)
            .await
            .map_err(ApiError::DatabaseError)?;

        self.get(note_id).await
    }

    pub async fn delete(&self, note_id: &str, actor: &AuthedUser) -> Result<(), ApiError> {
        let note = self.get(note_id).await?;
        self.authorize(&note, actor)?;

        sqlx::query("DELETE FROM candidate_notes WHERE id = ?")
            .bind(note_id)
            .execute(&self.db)
            .await
            .map_err(ApiError::DatabaseError)?;

        info!(note_id = %note_id, user_id = %actor.id, "Note deleted");
        Ok(())
    }

    fn authorize(&self, note: &CandidateNote, actor: &AuthedUser) -> Result<(), ApiError> {
        if can_modify_note(note, actor) {
            Ok(())
        } else {
            warn!(note_id = %note.id, user_id = %actor.id, "Note modification denied");
            Err(ApiError::Forbidden(
                "Only the author or a recruiter can modify this note".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::test_support::{insert_candidate, insert_user, test_pool, CandidateSeed};

    async fn setup() -> (NoteService, String, AuthedUser, AuthedUser, AuthedUser) {
        let pool = test_pool().await;
        let author = insert_user(&pool, Role::Viewer).await;
        let other_viewer = insert_user(&pool, Role::Viewer).await;
        let recruiter = insert_user(&pool, Role::Recruiter).await;
        let candidate_id = insert_candidate(
            &pool,
            CandidateSeed::completed(&recruiter.id, "2024-01-01T00:00:00.000000Z"),
        )
        .await;
        (
            NoteService::new(pool),
            candidate_id,
            author.into(),
            other_viewer.into(),
            recruiter.into(),
        )
    }

    #[tokio::test]
    async fn test_viewer_cannot_edit_others_note_but_recruiter_can() {
        let (notes, candidate_id, author, other_viewer, recruiter) = setup().await;
        let note = notes.add(&candidate_id, &author, "Original", None, None).await.unwrap();

        let denied = notes.update(&note.id, &other_viewer, "Hijacked").await;
        assert!(matches!(denied, Err(ApiError::Forbidden(_))));
        assert_eq!(notes.get(&note.id).await.unwrap().note, "Original");

        let edited = notes.update(&note.id, &recruiter, "Edited by recruiter").await.unwrap();
        assert_eq!(edited.note, "Edited by recruiter");
        assert_eq!(edited.user_id, author.id);

        let own = notes.update(&note.id, &author, "Author again").await.unwrap();
        assert_eq!(own.note, "Author again");
    }

    #[tokio::test]
    async fn test_delete_requires_author_or_recruiter() {
        let (notes, candidate_id, author, other_viewer, recruiter) = setup().await;
        let note = notes.add(&candidate_id, &author, "To remove", None, None).await.unwrap();

        assert!(matches!(
            notes.delete(&note.id, &other_viewer).await,
            Err(ApiError::Forbidden(_))
        ));
        notes.delete(&note.id, &recruiter).await.unwrap();
        assert!(matches!(notes.get(&note.id).await, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_is_chronological_with_author_name() {
        let (notes, candidate_id, author, _other, recruiter) = setup().await;
        notes.add(&candidate_id, &author, "first", None, None).await.unwrap();
        notes
            .add(&candidate_id, &recruiter, "second", Some("completed"), Some("reviewing"))
            .await
            .unwrap();

        let listed = notes.list(&candidate_id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].note, "first");
        assert_eq!(listed[1].new_status.as_deref(), Some("reviewing"));
        // No full name on test users: falls back to username
        assert_eq!(listed[0].created_by, author.username);
    }

    #[tokio::test]
    async fn test_missing_candidate_is_not_found() {
        let (notes, _candidate_id, author, _other, _recruiter) = setup().await;
        assert!(matches!(
            notes.add("C_NOPE00", &author, "x", None, None).await,
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(notes.list("C_NOPE00").await, Err(ApiError::NotFound(_))));
    }
}
