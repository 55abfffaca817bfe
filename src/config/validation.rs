//! Validation pipeline configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ConfigValidationError;
use crate::application::PipelineConfig;

/// Validation pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationConfig {
    /// Budget for the whole pipeline, in milliseconds
    #[serde(default = "default_pipeline_timeout")]
    pub pipeline_timeout_ms: u64,

    /// Budget for one stage, in milliseconds
    #[serde(default = "default_stage_timeout")]
    pub stage_timeout_ms: u64,

    /// Longest line the lint stage accepts
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,
}

impl ValidationConfig {
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::default()
            .with_pipeline_timeout(Duration::from_millis(self.pipeline_timeout_ms))
            .with_stage_timeout(Duration::from_millis(self.stage_timeout_ms))
    }

    /// Validate pipeline configuration
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.pipeline_timeout_ms == 0 {
            return Err(ConfigValidationError::ZeroTimeout("validation.pipeline_timeout_ms"));
        }
        if self.stage_timeout_ms == 0 {
            return Err(ConfigValidationError::ZeroTimeout("validation.stage_timeout_ms"));
        }
        if self.stage_timeout_ms > self.pipeline_timeout_ms {
            return Err(ConfigValidationError::StageTimeoutExceedsPipeline);
        }
        if self.max_line_length == 0 {
            return Err(ConfigValidationError::ZeroCapacity("validation.max_line_length"));
        }
        Ok(())
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            pipeline_timeout_ms: default_pipeline_timeout(),
            stage_timeout_ms: default_stage_timeout(),
            max_line_length: default_max_line_length(),
        }
    }
}

fn default_pipeline_timeout() -> u64 {
    5000
}

fn default_stage_timeout() -> u64 {
    2000
}

fn default_max_line_length() -> usize {
    120
}
