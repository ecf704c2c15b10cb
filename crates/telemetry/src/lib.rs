//! Telemetry sinks for Ragline.
//!
//! Every sink implements `ragline_core::TelemetrySink`: emission is
//! synchronous, never fails, and never blocks the pipeline.
//!
//! - [`TracingSink`] forwards events to the `tracing` subscriber
//! - [`EventRecorder`] keeps a bounded in-memory log and serves summaries
//! - [`FanoutSink`] duplicates events to several sinks

pub mod engine;
pub mod model;
pub mod sinks;

pub use engine::EventRecorder;
pub use model::{LatencyStats, TelemetrySummary};
pub use sinks::{FanoutSink, TracingSink};

/// Well-known event names.
pub mod events {
    pub const REPLY_STEP: &str = "reply_step";
    pub const REPLY_COMPLETED: &str = "reply_completed";
    pub const REPLY_FAILED: &str = "reply_failed";
    pub const CHAT_LATENCY: &str = "chat_latency_in_ms";
    pub const JSON: &str = "json";
}
