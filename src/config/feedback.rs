//! Feedback intake configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ConfigValidationError;
use crate::application::FeedbackFlusherConfig;

/// Feedback queue and flusher configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackConfig {
    /// Records the queue holds before rejecting
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// How often queued records are persisted, in milliseconds
    #[serde(default = "default_flush_interval")]
    pub flush_interval_ms: u64,

    /// Records written per flush
    #[serde(default = "default_flush_batch_size")]
    pub flush_batch_size: usize,
}

impl FeedbackConfig {
    pub fn flusher_config(&self) -> FeedbackFlusherConfig {
        FeedbackFlusherConfig::default()
            .with_flush_interval(Duration::from_millis(self.flush_interval_ms))
            .with_batch_size(self.flush_batch_size)
    }

    /// Validate feedback configuration
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.queue_capacity == 0 {
            return Err(ConfigValidationError::ZeroCapacity("feedback.queue_capacity"));
        }
        if self.flush_interval_ms == 0 {
            return Err(ConfigValidationError::ZeroTimeout("feedback.flush_interval_ms"));
        }
        if self.flush_batch_size == 0 {
            return Err(ConfigValidationError::ZeroCapacity("feedback.flush_batch_size"));
        }
        Ok(())
    }
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            flush_interval_ms: default_flush_interval(),
            flush_batch_size: default_flush_batch_size(),
        }
    }
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_flush_interval() -> u64 {
    1000
}

fn default_flush_batch_size() -> usize {
    100
}
