// src/services/mod.rs
//
// Shared services module: the ingestion pipeline and everything it is
// built from

pub mod file_storage;
pub mod identity;
pub mod ingestion;
pub mod openai;
pub mod oracle;
pub mod task_queue;
pub mod text_extractor;

// Re-export commonly used types for convenience
pub use file_storage::FileStorage;
pub use identity::IdentityResolver;
pub use ingestion::{ExecutionMode, IngestionError, IngestionPipeline, IngestionRequest};
pub use openai::OpenAIOracle;
pub use oracle::{ExtractionOracle, OracleMode, StructuredCandidate};
pub use task_queue::{IngestionWorker, RetryPolicy, TaskQueue};
