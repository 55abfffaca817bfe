//! Code generation domain - contexts, snippets, findings and feedback.
//!
//! Pure types with no knowledge of backends, storage or the runtime.

mod backend_kind;
mod command_context;
mod conversation;
mod errors;
mod feedback;
mod language;
mod project;
mod snippet;
mod validation;

pub use backend_kind::{BackendFamily, BackendKind};
pub use command_context::{CommandContext, CommandContextBuilder, ContextPatch, GenerationMode, Role};
pub use conversation::{ConversationEntry, ConversationLog};
pub use errors::EngineError;
pub use feedback::FeedbackRecord;
pub use language::Language;
pub use project::ProjectConfig;
pub use snippet::{Snippet, SnippetDraft};
pub use validation::{
    IncompleteStage, SecurityClass, Severity, StageKind, ValidationFinding, ValidationReport,
};
