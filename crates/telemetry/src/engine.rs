//! Bounded in-memory event log.

use crate::events;
use crate::model::{LatencyStats, TelemetrySummary};
use ragline_core::event::{TelemetryEvent, TelemetrySink};
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Records every emitted event, oldest first.
///
/// Thread-safe via `RwLock`. When `capacity` is reached the oldest tenth of
/// the log is dropped. A poisoned lock is recovered rather than propagated
/// since emission must never fail.
pub struct EventRecorder {
    capacity: usize,
    events: RwLock<Vec<TelemetryEvent>>,
}

impl EventRecorder {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            events: RwLock::new(Vec::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<TelemetryEvent>> {
        self.events.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<TelemetryEvent>> {
        self.events.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn record(&self, event: TelemetryEvent) {
        let mut log = self.write();
        if log.len() >= self.capacity {
            let drain_count = (self.capacity / 10).max(1);
            let n = drain_count.min(log.len());
            log.drain(..n);
        }
        log.push(event);
    }

    /// All recorded events, oldest first.
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.read().clone()
    }

    pub fn events_named(&self, name: &str) -> Vec<TelemetryEvent> {
        self.read().iter().filter(|e| e.name == name).cloned().collect()
    }

    /// Events carrying `TargetingId` or `session_id` equal to `session`.
    pub fn events_for_session(&self, session: &str) -> Vec<TelemetryEvent> {
        self.read()
            .iter()
            .filter(|e| {
                e.property("session_id") == Some(session) || e.property("TargetingId") == Some(session)
            })
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    pub fn summary(&self) -> TelemetrySummary {
        let log = self.read();

        let mut by_name: BTreeMap<String, u64> = BTreeMap::new();
        for event in log.iter() {
            *by_name.entry(event.name.clone()).or_default() += 1;
        }

        let latencies: Vec<u64> = log
            .iter()
            .filter(|e| e.name == events::CHAT_LATENCY)
            .filter_map(|e| e.property(events::CHAT_LATENCY)?.parse().ok())
            .collect();

        let replies_recovered = log
            .iter()
            .filter(|e| e.name == events::REPLY_COMPLETED && e.property("outcome") == Some("recovered"))
            .count() as u64;

        TelemetrySummary {
            total_events: log.len() as u64,
            replies_completed: by_name.get(events::REPLY_COMPLETED).copied().unwrap_or(0),
            replies_failed: by_name.get(events::REPLY_FAILED).copied().unwrap_or(0),
            replies_recovered,
            chat_latency: LatencyStats::from_samples(&latencies),
            from: log.first().map(|e| e.timestamp),
            to: log.last().map(|e| e.timestamp),
            by_name,
        }
    }
}

impl Default for EventRecorder {
    fn default() -> Self {
        Self::new(1_000)
    }
}

impl TelemetrySink for EventRecorder {
    fn emit(&self, event: TelemetryEvent) {
        self.record(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_in_order() {
        let recorder = EventRecorder::default();
        recorder.emit(TelemetryEvent::new("reply_step").with("step", "embedding"));
        recorder.emit(TelemetryEvent::new("reply_step").with("step", "query"));
        let events = recorder.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].property("step"), Some("embedding"));
        assert_eq!(recorder.events_named("reply_step").len(), 2);
    }

    #[test]
    fn prunes_oldest_at_capacity() {
        let recorder = EventRecorder::new(10);
        for i in 0..25 {
            recorder.emit(TelemetryEvent::new("reply_step").with("i", i));
        }
        // One event (10% of capacity) is dropped per overflow.
        assert_eq!(recorder.len(), 10);
        let events = recorder.events();
        assert_eq!(events.last().unwrap().property("i"), Some("24"));
        assert_eq!(events[0].property("i"), Some("15"));
    }

    #[test]
    fn summary_counts_and_latency() {
        let recorder = EventRecorder::default();
        recorder.emit(TelemetryEvent::new(events::CHAT_LATENCY).with(events::CHAT_LATENCY, 120));
        recorder.emit(TelemetryEvent::new(events::CHAT_LATENCY).with(events::CHAT_LATENCY, 80));
        recorder.emit(TelemetryEvent::new(events::REPLY_COMPLETED).with("outcome", "recovered"));
        recorder.emit(TelemetryEvent::new(events::REPLY_FAILED).with("error", "boom"));

        let summary = recorder.summary();
        assert_eq!(summary.total_events, 4);
        assert_eq!(summary.replies_completed, 1);
        assert_eq!(summary.replies_recovered, 1);
        assert_eq!(summary.replies_failed, 1);
        let lat = summary.chat_latency.unwrap();
        assert_eq!(lat.min_ms, 80);
        assert_eq!(lat.max_ms, 120);
        assert_eq!(summary.by_name.get(events::CHAT_LATENCY), Some(&2));
    }

    #[test]
    fn filters_by_session() {
        let recorder = EventRecorder::default();
        recorder.emit(TelemetryEvent::new(events::CHAT_LATENCY).with("TargetingId", "s-1"));
        recorder.emit(TelemetryEvent::new(events::REPLY_STEP).with("session_id", "s-1"));
        recorder.emit(TelemetryEvent::new(events::REPLY_STEP).with("session_id", "s-2"));
        assert_eq!(recorder.events_for_session("s-1").len(), 2);
    }

    #[test]
    fn clear_empties_log() {
        let recorder = EventRecorder::default();
        recorder.emit(TelemetryEvent::new("json"));
        assert!(!recorder.is_empty());
        recorder.clear();
        assert!(recorder.is_empty());
    }
}
