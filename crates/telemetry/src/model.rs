//! Aggregated views over recorded events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Completion latency statistics, from `chat_latency_in_ms` events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub samples: u64,
    pub min_ms: u64,
    pub max_ms: u64,
    pub mean_ms: f64,
}

impl LatencyStats {
    /// Build stats from raw samples. Returns `None` for an empty slice.
    pub fn from_samples(samples: &[u64]) -> Option<Self> {
        let min_ms = *samples.iter().min()?;
        let max_ms = *samples.iter().max()?;
        let total: u64 = samples.iter().sum();
        Some(Self {
            samples: samples.len() as u64,
            min_ms,
            max_ms,
            mean_ms: total as f64 / samples.len() as f64,
        })
    }
}

/// Aggregated summary of the recorded event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySummary {
    /// Events currently held.
    pub total_events: u64,
    /// Count per event name.
    pub by_name: BTreeMap<String, u64>,
    pub replies_completed: u64,
    pub replies_failed: u64,
    /// Recovered (apology) answers among completed replies.
    pub replies_recovered: u64,
    pub chat_latency: Option<LatencyStats>,
    /// Oldest event timestamp.
    pub from: Option<DateTime<Utc>>,
    /// Newest event timestamp.
    pub to: Option<DateTime<Utc>>,
}

impl std::fmt::Display for TelemetrySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "events: {} (completed: {}, recovered: {}, failed: {})",
            self.total_events, self.replies_completed, self.replies_recovered, self.replies_failed
        )?;
        if let Some(lat) = &self.chat_latency {
            writeln!(
                f,
                "chat latency: {} samples, min {}ms, mean {:.1}ms, max {}ms",
                lat.samples, lat.min_ms, lat.mean_ms, lat.max_ms
            )?;
        }
        Ok(())
    }
}
