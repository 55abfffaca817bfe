//! Error taxonomy of the generation engine.

use crate::domain::foundation::{BackendId, ErrorCode, ValidationError};

/// Terminal errors of a generation request.
///
/// Validation stage failures are not represented here; they are recovered
/// inside the pipeline and surface as incomplete stages of the report.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum EngineError {
    #[error("no healthy backend available ({attempted} candidates probed)")]
    BackendUnavailable { attempted: usize },

    #[error("backend '{backend}' timed out after {timeout_ms}ms")]
    BackendTimeout { backend: BackendId, timeout_ms: u64 },

    #[error("request cancelled")]
    Cancelled,

    #[error("backend '{backend}' is rate limited")]
    RateLimited {
        backend: BackendId,
        retry_after_secs: Option<u32>,
    },

    #[error("backend '{backend}' failed: {message}")]
    BackendFailed { backend: BackendId, message: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl EngineError {
    /// Stable code for callers and telemetry.
    pub fn code(&self) -> ErrorCode {
        match self {
            EngineError::BackendUnavailable { .. } => ErrorCode::BackendUnavailable,
            EngineError::BackendTimeout { .. } => ErrorCode::BackendTimeout,
            EngineError::Cancelled => ErrorCode::Cancelled,
            EngineError::RateLimited { .. } => ErrorCode::RateLimited,
            EngineError::BackendFailed { .. } => ErrorCode::BackendFailed,
            EngineError::InvalidRequest(_) => ErrorCode::InvalidRequest,
        }
    }

    /// Returns true if the caller may retry, possibly on another backend.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::BackendUnavailable { .. }
                | EngineError::BackendTimeout { .. }
                | EngineError::RateLimited { .. }
        )
    }
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::InvalidRequest(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> BackendId {
        BackendId::new("primary").unwrap()
    }

    #[test]
    fn unavailable_displays_attempt_count() {
        let err = EngineError::BackendUnavailable { attempted: 3 };
        assert_eq!(err.to_string(), "no healthy backend available (3 candidates probed)");
        assert_eq!(err.code(), ErrorCode::BackendUnavailable);
    }

    #[test]
    fn rate_limit_is_retryable_and_distinct_from_unavailable() {
        let err = EngineError::RateLimited {
            backend: backend(),
            retry_after_secs: Some(30),
        };
        assert!(err.is_retryable());
        assert_eq!(err.code(), ErrorCode::RateLimited);
        assert_ne!(err.code(), ErrorCode::BackendUnavailable);
    }

    #[test]
    fn retryable_classification() {
        assert!(EngineError::BackendTimeout { backend: backend(), timeout_ms: 10 }.is_retryable());
        assert!(EngineError::BackendUnavailable { attempted: 0 }.is_retryable());
        assert!(!EngineError::Cancelled.is_retryable());
        assert!(!EngineError::InvalidRequest("empty prompt".into()).is_retryable());
        assert!(!EngineError::BackendFailed { backend: backend(), message: "boom".into() }.is_retryable());
    }

    #[test]
    fn validation_errors_become_invalid_request() {
        let err: EngineError = ValidationError::empty_field("prompt").into();
        assert!(matches!(err, EngineError::InvalidRequest(ref m) if m.contains("prompt")));
    }
}
