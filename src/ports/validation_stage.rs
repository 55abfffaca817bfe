//! ValidationStage port - one pass of snippet analysis.
//!
//! Stages are synchronous, CPU-bound and must not touch shared state. The
//! pipeline runs each one on the blocking pool and enforces deadlines from
//! the outside, so a stage never has to check the clock itself.

use thiserror::Error;

use crate::domain::codegen::{ProjectConfig, Snippet, StageKind, ValidationFinding};

/// Port for a single validation stage.
pub trait ValidationStage: Send + Sync {
    /// Which stage this is. Determines weight and default severity.
    fn kind(&self) -> StageKind;

    /// Analyse the snippet and return everything found.
    ///
    /// An empty vector means the snippet passed this stage.
    fn check(
        &self,
        snippet: &Snippet,
        config: &ProjectConfig,
    ) -> Result<Vec<ValidationFinding>, StageError>;
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StageError {
    /// The stage has no analysis for this language.
    #[error("language '{0}' is not supported")]
    UnsupportedLanguage(String),

    #[error("analysis failed: {0}")]
    Failed(String),
}
