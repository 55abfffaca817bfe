//! PersistenceStore port - durable history beyond the process lifetime.
//!
//! The in-memory context store stays the source of truth while the process
//! runs. The engine writes here without waiting on the result, so adapters
//! are free to be slow.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::codegen::{FeedbackRecord, Snippet};
use crate::domain::foundation::ProjectId;

/// Port for durable snippet and feedback storage.
#[async_trait]
pub trait PersistenceStore: Send + Sync {
    /// Insert or replace a snippet, keyed by its id.
    async fn save_snippet(&self, snippet: &Snippet) -> Result<(), PersistenceError>;

    /// All stored snippets of a project, oldest first, one per id.
    async fn load_snippets(&self, project_id: &ProjectId) -> Result<Vec<Snippet>, PersistenceError>;

    /// Append a batch of feedback records.
    async fn save_feedback(&self, records: &[FeedbackRecord]) -> Result<(), PersistenceError>;

    /// All stored feedback records in submission order.
    async fn load_feedback(&self) -> Result<Vec<FeedbackRecord>, PersistenceError>;
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}
