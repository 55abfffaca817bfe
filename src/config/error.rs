//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ConfigValidationError),

    #[error("Tracing initialization failed: {0}")]
    Logging(String),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq)]
pub enum ConfigValidationError {
    #[error("Timeout must be greater than zero: {0}")]
    ZeroTimeout(&'static str),

    #[error("Capacity must be greater than zero: {0}")]
    ZeroCapacity(&'static str),

    #[error("Default temperature {0} is outside 0.0..=1.0")]
    TemperatureOutOfRange(f32),

    #[error("Stage timeout exceeds pipeline timeout")]
    StageTimeoutExceedsPipeline,

    #[error("Default language must not be empty")]
    EmptyLanguage,

    #[error("Invalid log filter: {0}")]
    InvalidLogFilter(String),
}
