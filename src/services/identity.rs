// src/services/identity.rs
//! Maps freshly extracted contact details onto an existing candidate row

use sqlx::SqlitePool;
use tracing::debug;

use crate::candidates::models::Candidate;
use crate::common::safe_email_log;

#[derive(Clone)]
pub struct IdentityResolver {
    db: SqlitePool,
}

impl IdentityResolver {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Completed candidate with the same email or phone
    ///
    /// An email hit wins over a phone hit; ties go to the oldest row.
    /// Returns `None` when neither identifier is present.
    pub async fn find_existing(
        &self,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Option<Candidate>, sqlx::Error> {
        if email.is_none() && phone.is_none() {
            return Ok(None);
        }

        let existing = sqlx::query_as::<_, Candidate>(
            r#"
            SELECT * FROM candidates
            WHERE status = 'completed'
              AND ((?1 IS NOT NULL AND email = ?1) OR (?2 IS NOT NULL AND phone = ?2))
            ORDER BY CASE WHEN ?1 IS NOT NULL AND email = ?1 THEN 0 ELSE 1 END, created_at ASC
            LIMIT 1
            "#,
        )
        .bind(email)
        .bind(phone)
        .fetch_optional(&self.db)
        .await?;

        if let Some(candidate) = &existing {
            debug!(
                candidate_id = %candidate.id,
                email = %email.map(safe_email_log).unwrap_or_default(),
                "Matched existing candidate"
            );
        }

        Ok(existing)
    }
}
