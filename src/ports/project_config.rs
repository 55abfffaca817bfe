//! ProjectConfigProvider port - read-only project settings.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::codegen::ProjectConfig;
use crate::domain::foundation::ProjectId;

/// Port for looking up project configuration.
///
/// The engine reads one snapshot per request and never writes back.
#[async_trait]
pub trait ProjectConfigProvider: Send + Sync {
    async fn get(&self, project_id: &ProjectId) -> Result<ProjectConfig, ProjectConfigError>;
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectConfigError {
    #[error("project configuration unavailable: {0}")]
    Unavailable(String),

    #[error("project configuration for '{project_id}' is malformed: {reason}")]
    Malformed { project_id: ProjectId, reason: String },
}
