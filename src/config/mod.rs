//! Engine configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `CODEGEN_ENGINE` prefix and nested values use double underscores as separators.
//! Every section has defaults, so an empty environment yields a usable config.
//!
//! # Example
//!
//! ```no_run
//! use codegen_engine::config::{init_tracing, EngineConfig};
//!
//! let config = EngineConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! init_tracing(&config.logging).expect("Failed to install tracing");
//! ```

mod context;
mod error;
mod feedback;
mod generation;
mod logging;
mod selector;
mod validation;

pub use context::ContextConfig;
pub use error::{ConfigError, ConfigValidationError};
pub use feedback::FeedbackConfig;
pub use generation::GenerationConfig;
pub use logging::{init_tracing, LoggingConfig};
pub use selector::SelectorConfig;
pub use validation::ValidationConfig;

use serde::Deserialize;

use crate::application::ContextDefaults;
use crate::domain::codegen::Language;

/// Root engine configuration
///
/// Load using [`EngineConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineConfig {
    /// Backend health probing
    #[serde(default)]
    pub selector: SelectorConfig,

    /// Generation deadline and fresh-session defaults
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Conversation retention
    #[serde(default)]
    pub context: ContextConfig,

    /// Validation deadlines and lint limits
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Feedback queue and flusher
    #[serde(default)]
    pub feedback: FeedbackConfig,

    /// Log filter and format
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `CODEGEN_ENGINE` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `CODEGEN_ENGINE__SELECTOR__HEALTH_CHECK_TIMEOUT_MS=250` -> `selector.health_check_timeout_ms = 250`
    /// - `CODEGEN_ENGINE__CONTEXT__CONVERSATION_CAP=20` -> `context.conversation_cap = 20`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("CODEGEN_ENGINE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ConfigValidationError` for zero timeouts or capacities, a
    /// temperature outside 0.0..=1.0, a stage timeout longer than the
    /// pipeline timeout, or an unparseable log filter.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        self.selector.validate()?;
        self.generation.validate()?;
        self.context.validate()?;
        self.validation.validate()?;
        self.feedback.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Starting values for fresh session contexts.
    pub fn context_defaults(&self) -> ContextDefaults {
        ContextDefaults {
            language: Language::from_name(&self.generation.default_language),
            framework: self.generation.default_framework.clone(),
            temperature: self.generation.default_temperature,
            max_tokens: self.generation.default_max_tokens,
            conversation_cap: self.context.conversation_cap,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;
    use std::time::Duration;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn clear_env() {
        env::remove_var("CODEGEN_ENGINE__SELECTOR__HEALTH_CHECK_TIMEOUT_MS");
        env::remove_var("CODEGEN_ENGINE__CONTEXT__CONVERSATION_CAP");
        env::remove_var("CODEGEN_ENGINE__GENERATION__DEFAULT_LANGUAGE");
        env::remove_var("CODEGEN_ENGINE__LOGGING__JSON");
    }

    #[test]
    fn test_load_with_empty_environment_uses_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let result = EngineConfig::load();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.selector.health_check_timeout_ms, 500);
        assert_eq!(config.context.conversation_cap, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("CODEGEN_ENGINE__SELECTOR__HEALTH_CHECK_TIMEOUT_MS", "250");
        env::set_var("CODEGEN_ENGINE__CONTEXT__CONVERSATION_CAP", "20");
        env::set_var("CODEGEN_ENGINE__GENERATION__DEFAULT_LANGUAGE", "rust");
        env::set_var("CODEGEN_ENGINE__LOGGING__JSON", "true");
        let result = EngineConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.selector.health_check_timeout(), Duration::from_millis(250));
        assert_eq!(config.context.conversation_cap, 20);
        assert_eq!(config.generation.default_language, "rust");
        assert!(config.logging.json);
    }

    #[test]
    fn test_context_defaults_follow_generation_section() {
        let mut config = EngineConfig::default();
        config.generation.default_language = "typescript".to_string();
        config.generation.default_framework = "react".to_string();
        config.context.conversation_cap = 4;

        let defaults = config.context_defaults();
        assert_eq!(defaults.language, Language::from_name("typescript"));
        assert_eq!(defaults.framework, "react");
        assert_eq!(defaults.conversation_cap, 4);
        assert_eq!(defaults.max_tokens, 2048);
    }

    #[test]
    fn test_validate_reports_first_invalid_section() {
        let mut config = EngineConfig::default();
        config.context.conversation_cap = 0;

        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::ZeroCapacity("context.conversation_cap"))
        );
    }
}
