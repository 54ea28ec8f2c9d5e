// src/candidates/models.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

use crate::common::helpers::{parse_string_list, serialize_string_list};

// ============================================================================
// Candidate Models
// ============================================================================

#[derive(FromRow, Serialize, Debug, Clone)]
pub struct Candidate {
    pub id: String,
    pub filename: String,
    pub file_path: String,
    pub file_size: i64,
    pub status: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(serialize_with = "serialize_string_list")]
    pub skills: Option<String>,
    #[serde(serialize_with = "serialize_string_list")]
    pub designations: Option<String>,
    pub domain_knowledge: Option<String>,
    #[serde(skip_serializing)]
    pub raw_parsed_data: Option<String>,
    pub uploaded_by: String,
    pub error_message: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub processed_at: Option<String>,
}

impl Candidate {
    pub fn skills_list(&self) -> Vec<String> {
        parse_string_list(self.skills.as_deref())
    }
}

/// Candidate lifecycle vocabulary
///
/// The first four values belong to ingestion; the rest are recruiting
/// stages set only by users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    Uploaded,
    Processing,
    Completed,
    Failed,
    Reviewing,
    CallbackRequested,
    InitialScreeningCompleted,
    InterviewScheduled,
    Selected,
    Rejected,
}

impl CandidateStatus {
    pub const ALL: [CandidateStatus; 10] = [
        CandidateStatus::Uploaded,
        CandidateStatus::Processing,
        CandidateStatus::Completed,
        CandidateStatus::Failed,
        CandidateStatus::Reviewing,
        CandidateStatus::CallbackRequested,
        CandidateStatus::InitialScreeningCompleted,
        CandidateStatus::InterviewScheduled,
        CandidateStatus::Selected,
        CandidateStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateStatus::Uploaded => "uploaded",
            CandidateStatus::Processing => "processing",
            CandidateStatus::Completed => "completed",
            CandidateStatus::Failed => "failed",
            CandidateStatus::Reviewing => "reviewing",
            CandidateStatus::CallbackRequested => "callback_requested",
            CandidateStatus::InitialScreeningCompleted => "initial_screening_completed",
            CandidateStatus::InterviewScheduled => "interview_scheduled",
            CandidateStatus::Selected => "selected",
            CandidateStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for CandidateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CandidateStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|s| s.as_str()).collect();
                format!("Invalid status '{}'. Must be one of: {}", s.trim(), valid.join(", "))
            })
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct CandidateListQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<String>,
    pub skills: Option<String>,
    pub skill_mode: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EmailSearchQuery {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct SkillSearchQuery {
    pub skill: String,
}

#[derive(Debug, Serialize)]
pub struct UploadAccepted {
    pub message: String,
    pub filename: String,
    pub status: String,
    pub task_id: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
    pub note: Option<String>,
}

// ============================================================================
// Note Models
// ============================================================================

/// Note row joined with its author's display name
#[derive(FromRow, Serialize, Debug, Clone)]
pub struct CandidateNote {
    pub id: String,
    pub candidate_id: String,
    pub user_id: String,
    pub note: String,
    pub previous_status: Option<String>,
    pub new_status: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub created_by: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
    pub note: String,
    pub previous_status: Option<String>,
    pub new_status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateNoteRequest {
    pub note: String,
}
