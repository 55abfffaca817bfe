//! Telemetry sinks that do not keep state.

use std::error::Error;

use crate::ports::{TelemetryFields, TelemetrySink};

/// Writes telemetry as structured `tracing` events under the
/// `codegen_engine::telemetry` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTelemetrySink;

impl TracingTelemetrySink {
    pub fn new() -> Self {
        Self
    }
}

impl TelemetrySink for TracingTelemetrySink {
    fn log_event(&self, name: &str, fields: &TelemetryFields) {
        tracing::info!(
            target: "codegen_engine::telemetry",
            event = name,
            fields = %fields,
            "telemetry event"
        );
    }

    fn log_error(&self, name: &str, error: &dyn Error, fields: &TelemetryFields) {
        tracing::warn!(
            target: "codegen_engine::telemetry",
            event = name,
            error = %error,
            fields = %fields,
            "telemetry error"
        );
    }
}

/// Drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpTelemetrySink;

impl TelemetrySink for NoOpTelemetrySink {
    fn log_event(&self, _name: &str, _fields: &TelemetryFields) {}

    fn log_error(&self, _name: &str, _error: &dyn Error, _fields: &TelemetryFields) {}
}
