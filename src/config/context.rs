//! Session context configuration

use serde::Deserialize;

use super::error::ConfigValidationError;

/// Session context configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ContextConfig {
    /// Conversation entries kept per session
    #[serde(default = "default_conversation_cap")]
    pub conversation_cap: usize,
}

impl ContextConfig {
    /// Validate context configuration
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.conversation_cap == 0 {
            return Err(ConfigValidationError::ZeroCapacity("context.conversation_cap"));
        }
        Ok(())
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            conversation_cap: default_conversation_cap(),
        }
    }
}

fn default_conversation_cap() -> usize {
    10
}
