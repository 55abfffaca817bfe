//! Backend port - uniform contract over one model provider.
//!
//! A backend turns a prompt plus a [`CommandContext`] into snippets and can
//! report whether it is currently usable. The engine never talks to a model
//! vendor directly; everything goes through this trait.
//!
//! # Contract
//!
//! - `generate` honours the request deadline and the cancellation token. On
//!   either it returns [`BackendError::Timeout`] / [`BackendError::Cancelled`]
//!   and leaves no partial state behind.
//! - `health_check` returns within its timeout. A probe that cannot finish in
//!   time reports `Ok(false)`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::domain::codegen::{BackendKind, CommandContext, Snippet};
use crate::domain::foundation::BackendId;

/// Port for a model backend.
#[async_trait]
pub trait BackendHandle: Send + Sync {
    /// Identity, kind and parameter limits of this backend.
    fn descriptor(&self) -> &BackendDescriptor;

    /// Generate snippets for the request.
    ///
    /// Returns at least one snippet on success. The first one is the primary
    /// answer.
    async fn generate(
        &self,
        request: GenerateRequest,
        cancel: CancellationToken,
    ) -> Result<Vec<Snippet>, BackendError>;

    /// Bounded liveness probe.
    async fn health_check(&self, timeout: Duration) -> Result<bool, BackendError>;
}

/// Generation parameters owned by a backend.
///
/// Request values above these are clamped down to them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationLimits {
    pub max_temperature: f32,
    pub max_tokens: u32,
}

impl GenerationLimits {
    /// Clamps a requested temperature and token budget.
    pub fn clamp(&self, temperature: f32, max_tokens: u32) -> (f32, u32) {
        (temperature.min(self.max_temperature), max_tokens.min(self.max_tokens))
    }
}

impl Default for GenerationLimits {
    fn default() -> Self {
        Self {
            max_temperature: 1.0,
            max_tokens: 8192,
        }
    }
}

/// Static description of a registered backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendDescriptor {
    pub id: BackendId,
    pub kind: BackendKind,
    /// Model identifier (e.g. "gpt-4o", "codellama:13b").
    pub model: String,
    pub limits: GenerationLimits,
}

impl BackendDescriptor {
    pub fn new(id: BackendId, kind: BackendKind, model: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            model: model.into(),
            limits: GenerationLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: GenerationLimits) -> Self {
        self.limits = limits;
        self
    }
}

/// A single generation call.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub prompt: String,
    pub context: CommandContext,
    /// Point in time after which the backend must give up.
    pub deadline: Instant,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>, context: CommandContext, deadline: Instant) -> Self {
        Self {
            prompt: prompt.into(),
            context,
            deadline,
        }
    }

    /// Time left before the deadline, zero if already past.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}

/// Backend failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    /// The call ran past its deadline.
    #[error("timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The caller cancelled the call.
    #[error("cancelled")]
    Cancelled,

    /// The provider throttled the request.
    #[error("rate limited")]
    RateLimited { retry_after_secs: Option<u32> },

    /// The provider cannot serve requests right now.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// The provider answered without any usable content.
    #[error("empty response")]
    EmptyResponse,

    /// Any other generation failure.
    #[error("generation failed: {0}")]
    Generation(String),
}

impl BackendError {
    pub fn timeout(elapsed: Duration) -> Self {
        BackendError::Timeout {
            timeout_ms: elapsed.as_millis() as u64,
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        BackendError::Unavailable(message.into())
    }

    pub fn generation(message: impl Into<String>) -> Self {
        BackendError::Generation(message.into())
    }
}
