//! Telemetry events: one-way, fire-and-forget emission.
//!
//! The pipeline emits an event after each major step. Emission is
//! synchronous and infallible from the pipeline's point of view: a sink that
//! cannot deliver simply drops the event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named event with string properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub name: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,

    pub timestamp: DateTime<Utc>,
}

impl TelemetryEvent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: BTreeMap::new(),
            timestamp: Utc::now(),
        }
    }

    /// Add a property (builder style).
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.properties.insert(key.into(), value.to_string());
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

/// Receives telemetry events. Must never block or panic.
pub trait TelemetrySink: Send + Sync {
    fn emit(&self, event: TelemetryEvent);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl TelemetrySink for NoopSink {
    fn emit(&self, _event: TelemetryEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_sink_accepts_events() {
        let sink: &dyn TelemetrySink = &NoopSink;
        sink.emit(TelemetryEvent::new("reply_failed").with("error", "no subscribers"));
    }

    #[test]
    fn with_stringifies_values() {
        let event = TelemetryEvent::new("chat_latency_in_ms")
            .with("chat_latency_in_ms", 42)
            .with("Temperature", 0.5);
        assert_eq!(event.property("chat_latency_in_ms"), Some("42"));
        assert_eq!(event.property("Temperature"), Some("0.5"));
        assert_eq!(event.property("missing"), None);
    }

    #[test]
    fn builder_overwrites_duplicate_keys() {
        let event = TelemetryEvent::new("json").with("k", "a").with("k", "b");
        assert_eq!(event.properties.len(), 1);
        assert_eq!(event.property("k"), Some("b"));
    }
}
