//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers and error types that form the
//! vocabulary of the code generation engine.

mod errors;
mod feedback_rating;
mod ids;
mod quality_score;
mod timestamp;

pub use errors::{ErrorCode, ValidationError};
pub use feedback_rating::FeedbackRating;
pub use ids::{BackendId, FileId, ProjectId, SessionKey, SnippetId, UserId};
pub use quality_score::QualityScore;
pub use timestamp::Timestamp;
