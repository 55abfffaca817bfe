//! In-memory project configuration.
//!
//! Unknown projects get [`ProjectConfig::default_for`]; the provider never
//! fails unless told to.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::codegen::ProjectConfig;
use crate::domain::foundation::ProjectId;
use crate::ports::{ProjectConfigError, ProjectConfigProvider};

#[derive(Debug, Clone, Default)]
pub struct InMemoryProjectConfigProvider {
    configs: Arc<RwLock<HashMap<ProjectId, ProjectConfig>>>,
    failure: Arc<RwLock<Option<ProjectConfigError>>>,
}

impl InMemoryProjectConfigProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores or replaces the configuration of `config.project_id`.
    pub async fn set(&self, config: ProjectConfig) {
        self.configs
            .write()
            .await
            .insert(config.project_id.clone(), config);
    }

    pub async fn remove(&self, project_id: &ProjectId) {
        self.configs.write().await.remove(project_id);
    }

    /// Makes every lookup fail with `error` until cleared with `None`.
    pub async fn set_failure(&self, error: Option<ProjectConfigError>) {
        *self.failure.write().await = error;
    }
}

#[async_trait]
impl ProjectConfigProvider for InMemoryProjectConfigProvider {
    async fn get(&self, project_id: &ProjectId) -> Result<ProjectConfig, ProjectConfigError> {
        if let Some(err) = self.failure.read().await.clone() {
            return Err(err);
        }

        let configs = self.configs.read().await;
        Ok(configs
            .get(project_id)
            .cloned()
            .unwrap_or_else(|| ProjectConfig::default_for(project_id.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::BackendId;

    fn project(id: &str) -> ProjectId {
        ProjectId::new(id).unwrap()
    }

    #[tokio::test]
    async fn unknown_project_gets_defaults() {
        let provider = InMemoryProjectConfigProvider::new();

        let config = provider.get(&project("p1")).await.unwrap();

        assert_eq!(config, ProjectConfig::default_for(project("p1")));
        assert!(config.enforce_security_scanning);
    }

    #[tokio::test]
    async fn stored_config_is_returned() {
        let provider = InMemoryProjectConfigProvider::new();
        let config = ProjectConfig::default_for(project("p1"))
            .with_preferred_backend(BackendId::new("local").unwrap())
            .with_security_scanning(false);
        provider.set(config.clone()).await;

        assert_eq!(provider.get(&project("p1")).await.unwrap(), config);

        provider.remove(&project("p1")).await;
        assert_eq!(
            provider.get(&project("p1")).await.unwrap(),
            ProjectConfig::default_for(project("p1"))
        );
    }

    #[tokio::test]
    async fn injected_failure_is_returned_until_cleared() {
        let provider = InMemoryProjectConfigProvider::new();
        provider
            .set_failure(Some(ProjectConfigError::Unavailable("offline".to_string())))
            .await;

        assert!(provider.get(&project("p1")).await.is_err());

        provider.set_failure(None).await;
        assert!(provider.get(&project("p1")).await.is_ok());
    }
}
