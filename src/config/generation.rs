//! Generation configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ConfigValidationError;

/// Generation defaults and deadline
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    /// Time a backend gets to answer, in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Sampling temperature of fresh sessions
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Token budget of fresh sessions
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Target language of fresh sessions
    #[serde(default = "default_language")]
    pub default_language: String,

    /// Target framework of fresh sessions, empty for none
    #[serde(default)]
    pub default_framework: String,
}

impl GenerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate generation configuration
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.timeout_secs == 0 {
            return Err(ConfigValidationError::ZeroTimeout("generation.timeout_secs"));
        }
        if !(0.0..=1.0).contains(&self.default_temperature) {
            return Err(ConfigValidationError::TemperatureOutOfRange(self.default_temperature));
        }
        if self.default_max_tokens == 0 {
            return Err(ConfigValidationError::ZeroCapacity("generation.default_max_tokens"));
        }
        if self.default_language.trim().is_empty() {
            return Err(ConfigValidationError::EmptyLanguage);
        }
        Ok(())
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            default_language: default_language(),
            default_framework: String::new(),
        }
    }
}

fn default_timeout() -> u64 {
    60
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_language() -> String {
    "python".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_config_defaults() {
        let config = GenerationConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert_eq!(config.default_language, "python");
        assert!(config.default_framework.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_temperature_out_of_range() {
        let config = GenerationConfig {
            default_temperature: 1.5,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::TemperatureOutOfRange(1.5))
        );
    }

    #[test]
    fn test_blank_language_rejected() {
        let config = GenerationConfig {
            default_language: "  ".to_string(),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigValidationError::EmptyLanguage));
    }

    #[test]
    fn test_generation_config_deserialization() {
        let json = r#"{ "timeout_secs": 30, "default_language": "rust" }"#;

        let config: GenerationConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.default_language, "rust");
        assert_eq!(config.default_max_tokens, 2048);
    }
}
