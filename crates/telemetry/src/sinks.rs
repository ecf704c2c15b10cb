//! Forwarding sinks.

use ragline_core::event::{TelemetryEvent, TelemetrySink};
use std::sync::Arc;

/// Logs each event through `tracing` at `info` (target `ragline::telemetry`).
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn emit(&self, event: TelemetryEvent) {
        let properties = serde_json::to_string(&event.properties).unwrap_or_default();
        tracing::info!(
            target: "ragline::telemetry",
            event = %event.name,
            properties = %properties,
            "telemetry"
        );
    }
}

/// Sends every event to each inner sink in turn.
#[derive(Default, Clone)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn TelemetrySink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl TelemetrySink for FanoutSink {
    fn emit(&self, event: TelemetryEvent) {
        if let Some((last, rest)) = self.sinks.split_last() {
            for sink in rest {
                sink.emit(event.clone());
            }
            last.emit(event);
        }
    }
}
