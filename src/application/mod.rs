//! Application layer - Services that coordinate domain and ports.
//!
//! - `ModelSelector` - Ranks registered backends and health checks them
//! - `ContextStore` - Session contexts, conversations and snippet history
//! - `ValidationPipeline` - Concurrent, deadline-bound snippet validation
//! - `FeedbackCollector` - Bounded rating intake and its background flusher
//! - `Orchestrator` - The request path through all of the above

pub mod context_store;
pub mod feedback_collector;
pub mod model_selector;
pub mod orchestrator;
pub mod validation_pipeline;

pub use context_store::{ContextDefaults, ContextStore, DEFAULT_CONVERSATION_CAP};
pub use feedback_collector::{
    FeedbackAck, FeedbackCollector, FeedbackFlusher, FeedbackFlusherConfig, RejectReason,
    DEFAULT_QUEUE_CAPACITY,
};
pub use model_selector::{
    rank_candidates, BackendRegistry, Candidate, CandidateSource, ModelSelector, ProbeOutcome,
    ProbeResult, Selection, DEFAULT_HEALTH_CHECK_TIMEOUT,
};
pub use orchestrator::{GenerationOutcome, Orchestrator, OrchestratorDeps, DEFAULT_GENERATION_TIMEOUT};
pub use validation_pipeline::{PipelineConfig, ValidationPipeline};
