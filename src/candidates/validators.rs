// src/candidates/validators.rs

use std::collections::HashSet;

use super::models::*;
use crate::common::{ValidationResult, Validator};

pub const MAX_NOTE_LENGTH: usize = 5000;

// ============================================================================
// Upload Validators
// ============================================================================

/// What the upload handler knows before anything is written to disk
pub struct UploadFile<'a> {
    pub filename: &'a str,
    pub size: usize,
}

pub struct UploadValidator<'a> {
    pub allowed_extensions: &'a HashSet<String>,
    pub max_size: usize,
}

impl<'a> Validator<UploadFile<'a>> for UploadValidator<'_> {
    fn validate(&self, data: &UploadFile<'a>) -> ValidationResult {
        let mut result = ValidationResult::new();

        let extension = data
            .filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();

        if data.filename.trim().is_empty() {
            result.add_error("file", "File name is required");
        } else if !self.allowed_extensions.contains(&extension) {
            let mut allowed: Vec<&str> = self.allowed_extensions.iter().map(String::as_str).collect();
            allowed.sort_unstable();
            result.add_error(
                "file",
                &format!("File type not allowed. Allowed types: {}", allowed.join(", ")),
            );
        }

        if data.size == 0 {
            result.add_error("file", "File is empty");
        } else if data.size > self.max_size {
            result.add_error(
                "file",
                &format!(
                    "File too large. Maximum size: {} MB",
                    self.max_size / (1024 * 1024)
                ),
            );
        }

        result
    }
}

// ============================================================================
// Note Validators
// ============================================================================

pub struct NoteValidator;

impl Validator<CreateNoteRequest> for NoteValidator {
    fn validate(&self, data: &CreateNoteRequest) -> ValidationResult {
        let mut result = ValidationResult::new();
        result.check_text("note", &data.note, MAX_NOTE_LENGTH);

        for (field, value) in [
            ("previous_status", &data.previous_status),
            ("new_status", &data.new_status),
        ] {
            if let Some(status) = value {
                if let Err(message) = status.parse::<CandidateStatus>() {
                    result.add_error(field, &message);
                }
            }
        }

        result
    }
}

impl Validator<UpdateNoteRequest> for NoteValidator {
    fn validate(&self, data: &UpdateNoteRequest) -> ValidationResult {
        let mut result = ValidationResult::new();
        result.check_text("note", &data.note, MAX_NOTE_LENGTH);
        result
    }
}

pub struct StatusUpdateValidator;

impl Validator<StatusUpdateRequest> for StatusUpdateValidator {
    fn validate(&self, data: &StatusUpdateRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if let Err(message) = data.status.parse::<CandidateStatus>() {
            result.add_error("status", &message);
        }

        if let Some(note) = &data.note {
            if note.chars().count() > MAX_NOTE_LENGTH {
                result.add_error(
                    "note",
                    &format!("must be at most {} characters", MAX_NOTE_LENGTH),
                );
            }
        }

        result
    }
}
