//! Backend selection configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ConfigValidationError;

/// Backend selection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SelectorConfig {
    /// Budget for one backend health probe, in milliseconds
    #[serde(default = "default_health_check_timeout")]
    pub health_check_timeout_ms: u64,
}

impl SelectorConfig {
    pub fn health_check_timeout(&self) -> Duration {
        Duration::from_millis(self.health_check_timeout_ms)
    }

    /// Validate selector configuration
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.health_check_timeout_ms == 0 {
            return Err(ConfigValidationError::ZeroTimeout("selector.health_check_timeout_ms"));
        }
        Ok(())
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            health_check_timeout_ms: default_health_check_timeout(),
        }
    }
}

fn default_health_check_timeout() -> u64 {
    500
}
