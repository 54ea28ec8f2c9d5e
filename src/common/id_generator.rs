// src/common/id_generator.rs
//! Crockford Base32 ID Generator
//!
//! Generates human-readable, prefixed IDs using Crockford Base32 encoding.
//! Format: PREFIX_XXXXXX (e.g., C_K7NP3X for candidates)
//!
//! No ambiguous characters (I, L, O, U are excluded) and ~1 billion
//! combinations per entity type (32^6).

use rand::Rng;

/// Crockford Base32 alphabet (excludes I, L, O, U to avoid confusion)
const CROCKFORD_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Entity type prefixes for ID generation
#[derive(Debug, Clone, Copy)]
pub enum EntityPrefix {
    /// Candidate (C_)
    Candidate,
    /// Candidate note (N_)
    Note,
    /// User (U_)
    User,
    /// Ingestion task (T_)
    Task,
}

impl EntityPrefix {
    /// Get the string prefix for this entity type
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityPrefix::Candidate => "C",
            EntityPrefix::Note => "N",
            EntityPrefix::User => "U",
            EntityPrefix::Task => "T",
        }
    }
}

/// Generate a random Crockford Base32 string of specified length
fn generate_crockford_string(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..32);
            CROCKFORD_ALPHABET[idx] as char
        })
        .collect()
}

/// Generate a prefixed ID using Crockford Base32 encoding
///
/// Returns a string in format "PREFIX_XXXXXX" (e.g., "C_K7NP3X")
pub fn generate_id(prefix: EntityPrefix) -> String {
    format!("{}_{}", prefix.as_str(), generate_crockford_string(6))
}

/// Generate a Candidate ID (C_XXXXXX)
pub fn generate_candidate_id() -> String {
    generate_id(EntityPrefix::Candidate)
}

/// Generate a Note ID (N_XXXXXX)
pub fn generate_note_id() -> String {
    generate_id(EntityPrefix::Note)
}

/// Generate a User ID (U_XXXXXX)
pub fn generate_user_id() -> String {
    generate_id(EntityPrefix::User)
}

/// Generate an ingestion Task ID (T_XXXXXX)
pub fn generate_task_id() -> String {
    generate_id(EntityPrefix::Task)
}
