//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the engine to backends, storage and the host:
//! - `backends` - Model-client backed and scripted code generation backends
//! - `persistence` - In-memory and JSON-lines snippet and feedback stores
//! - `project_config` - In-memory project configuration provider
//! - `telemetry` - Tracing, in-memory and no-op telemetry sinks
//! - `validation` - The heuristic validation stages

pub mod backends;
pub mod persistence;
pub mod project_config;
pub mod telemetry;
pub mod validation;

pub use backends::{MockBackend, MockModelClient, ProviderBackend};
pub use persistence::{InMemoryPersistenceStore, JsonFilePersistenceStore};
pub use project_config::InMemoryProjectConfigProvider;
pub use telemetry::{InMemoryTelemetrySink, NoOpTelemetrySink, TracingTelemetrySink};
pub use validation::default_stages;
