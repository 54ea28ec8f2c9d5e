// src/candidates/handlers/mod.rs

pub mod candidates;
pub mod files;
pub mod notes;
pub mod resumes;
pub mod tasks;

// Re-export handler functions
pub use candidates::*;
pub use files::*;
pub use notes::*;
pub use resumes::*;
pub use tasks::*;
