//! Project-level settings snapshot consumed by selection and validation.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{BackendId, ProjectId};

use super::StageKind;

/// Point-in-time project configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub project_id: ProjectId,
    /// Backend tried right after the request's own preference.
    #[serde(default)]
    pub preferred_backend: Option<BackendId>,
    /// Runs the security stage when set.
    #[serde(default = "default_enforce_security")]
    pub enforce_security_scanning: bool,
    /// Framework used when a request does not name one.
    #[serde(default)]
    pub framework: Option<String>,
    /// Stages this project opts out of.
    #[serde(default)]
    pub disabled_stages: Vec<StageKind>,
}

impl ProjectConfig {
    /// Configuration used for projects nobody configured.
    pub fn default_for(project_id: ProjectId) -> Self {
        Self {
            project_id,
            preferred_backend: None,
            enforce_security_scanning: default_enforce_security(),
            framework: None,
            disabled_stages: Vec::new(),
        }
    }

    pub fn with_preferred_backend(mut self, backend: BackendId) -> Self {
        self.preferred_backend = Some(backend);
        self
    }

    pub fn with_security_scanning(mut self, enforce: bool) -> Self {
        self.enforce_security_scanning = enforce;
        self
    }

    pub fn with_disabled_stage(mut self, stage: StageKind) -> Self {
        if !self.disabled_stages.contains(&stage) {
            self.disabled_stages.push(stage);
        }
        self
    }

    /// Whether the pipeline should run `stage` for this project.
    pub fn runs_stage(&self, stage: StageKind) -> bool {
        if self.disabled_stages.contains(&stage) {
            return false;
        }
        stage != StageKind::Security || self.enforce_security_scanning
    }
}

fn default_enforce_security() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> ProjectConfig {
        ProjectConfig::default_for(ProjectId::new("p1").unwrap())
    }

    #[test]
    fn defaults_enable_every_stage() {
        let config = project();
        assert!(config.enforce_security_scanning);
        for stage in StageKind::ALL {
            assert!(config.runs_stage(stage));
        }
    }

    #[test]
    fn security_stage_follows_enforcement_flag() {
        let config = project().with_security_scanning(false);
        assert!(!config.runs_stage(StageKind::Security));
        assert!(config.runs_stage(StageKind::Syntax));
    }

    #[test]
    fn disabled_stages_do_not_run() {
        let config = project()
            .with_disabled_stage(StageKind::Lint)
            .with_disabled_stage(StageKind::Lint);
        assert_eq!(config.disabled_stages.len(), 1);
        assert!(!config.runs_stage(StageKind::Lint));
    }

    #[test]
    fn missing_fields_deserialize_to_defaults() {
        let config: ProjectConfig = serde_json::from_str(r#"{"project_id":"p9"}"#).unwrap();
        assert!(config.enforce_security_scanning);
        assert!(config.preferred_backend.is_none());
    }
}
