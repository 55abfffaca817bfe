//! Telemetry port - fire-and-forget event and error reporting.
//!
//! Both methods are synchronous and infallible: a sink must never block the
//! caller or make a request fail. Sinks that ship data elsewhere buffer
//! internally.

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;

/// Port for reporting engine activity to an analytics collaborator.
pub trait TelemetrySink: Send + Sync {
    /// Report a named event.
    fn log_event(&self, name: &str, fields: &TelemetryFields);

    /// Report a named failure.
    fn log_error(&self, name: &str, error: &dyn Error, fields: &TelemetryFields);
}

/// Ordered key/value attributes attached to a telemetry call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetryFields(BTreeMap<&'static str, String>);

impl TelemetryFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &'static str, value: impl ToString) -> Self {
        self.0.insert(key, value.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TelemetryFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, value) in self.iter() {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{}={}", key, value)?;
            first = false;
        }
        Ok(())
    }
}
