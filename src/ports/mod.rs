//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the engine and the outside world. Adapters implement these ports.
//!
//! ## Generation Ports
//!
//! - `BackendHandle` - A model backend that produces snippets
//! - `ModelClient` - Streaming text completion underneath a backend
//!
//! ## Collaborator Ports
//!
//! - `ProjectConfigProvider` - Read-only project settings
//! - `PersistenceStore` - Durable snippet and feedback history
//! - `TelemetrySink` - Fire-and-forget analytics
//!
//! ## Validation Ports
//!
//! - `ValidationStage` - One pass of snippet analysis

mod backend;
mod model_client;
mod persistence;
mod project_config;
mod telemetry;
mod validation_stage;

pub use backend::{BackendDescriptor, BackendError, BackendHandle, GenerateRequest, GenerationLimits};
pub use model_client::{
    ChunkStream, CompletionRequest, FinishReason, Message, MessageRole, ModelClient, ModelError,
    ProviderInfo, RequestMetadata, StreamChunk, TokenUsage,
};
pub use persistence::{PersistenceError, PersistenceStore};
pub use project_config::{ProjectConfigError, ProjectConfigProvider};
pub use telemetry::{TelemetryFields, TelemetrySink};
pub use validation_stage::{StageError, ValidationStage};
