//! Telemetry Adapters.
//!
//! Implementations of the TelemetrySink port.
//!
//! - `TracingTelemetrySink` - Forwards events to `tracing`
//! - `InMemoryTelemetrySink` - Captures events for test assertions
//! - `NoOpTelemetrySink` - Discards everything

mod in_memory;
mod tracing_sink;

pub use in_memory::{InMemoryTelemetrySink, RecordedEvent};
pub use tracing_sink::{NoOpTelemetrySink, TracingTelemetrySink};
