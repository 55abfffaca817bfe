//! In-memory telemetry sink for testing.
//!
//! # Security Note
//!
//! This adapter is for **testing only**. It uses `.expect()` on lock
//! operations which will panic if locks are poisoned.

use std::error::Error;
use std::sync::RwLock;

use crate::ports::{TelemetryFields, TelemetrySink};

/// One captured telemetry call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    pub name: String,
    pub fields: TelemetryFields,
    /// Display of the error for `log_error` calls.
    pub error: Option<String>,
}

/// Captures telemetry for assertions.
///
/// # Example
///
/// ```ignore
/// let telemetry = Arc::new(InMemoryTelemetrySink::new());
/// // ... run the engine ...
/// assert!(telemetry.has_event("codegen.snippet_generated"));
/// ```
#[derive(Debug, Default)]
pub struct InMemoryTelemetrySink {
    events: RwLock<Vec<RecordedEvent>>,
}

impl InMemoryTelemetrySink {
    pub fn new() -> Self {
        Self::default()
    }

    // === Test Helpers ===

    /// All captured calls in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events
            .read()
            .expect("InMemoryTelemetrySink: events lock poisoned")
            .clone()
    }

    /// Captured calls with the given name.
    pub fn events_named(&self, name: &str) -> Vec<RecordedEvent> {
        self.events().into_iter().filter(|e| e.name == name).collect()
    }

    pub fn has_event(&self, name: &str) -> bool {
        !self.events_named(name).is_empty()
    }

    pub fn event_count(&self) -> usize {
        self.events().len()
    }

    /// Clears captured calls.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn clear(&self) {
        self.events
            .write()
            .expect("InMemoryTelemetrySink: events lock poisoned")
            .clear();
    }

    fn record(&self, event: RecordedEvent) {
        // Telemetry must never panic the caller.
        if let Ok(mut events) = self.events.write() {
            events.push(event);
        }
    }
}

impl TelemetrySink for InMemoryTelemetrySink {
    fn log_event(&self, name: &str, fields: &TelemetryFields) {
        self.record(RecordedEvent {
            name: name.to_string(),
            fields: fields.clone(),
            error: None,
        });
    }

    fn log_error(&self, name: &str, error: &dyn Error, fields: &TelemetryFields) {
        self.record(RecordedEvent {
            name: name.to_string(),
            fields: fields.clone(),
            error: Some(error.to_string()),
        });
    }
}
