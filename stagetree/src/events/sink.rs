//! Event sink trait and implementations.

use parking_lot::RwLock;
use tracing::{debug, info, trace, Level};

/// Receiver for stage lifecycle events.
///
/// Sinks are called inline from the scheduler, possibly from several tasks
/// at once. Implementations must not block and must never panic.
pub trait EventSink: Send + Sync {
    /// Records one event.
    ///
    /// # Arguments
    ///
    /// * `event_type` - The type of event (e.g., "stage.started")
    /// * `data` - The enriched event payload
    fn emit(&self, event_type: &str, data: serde_json::Value);
}

/// A no-op event sink that discards all events.
///
/// Used as the default when no sink is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
    fn emit(&self, _event_type: &str, _data: serde_json::Value) {}
}

/// An event sink that logs events using the tracing framework.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a new logging event sink with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }
}

impl EventSink for LoggingEventSink {
    fn emit(&self, event_type: &str, data: serde_json::Value) {
        match self.level {
            Level::TRACE => trace!(event_type = %event_type, event_data = %data, "Event: {}", event_type),
            Level::DEBUG => debug!(event_type = %event_type, event_data = %data, "Event: {}", event_type),
            _ => info!(event_type = %event_type, event_data = %data, "Event: {}", event_type),
        }
    }
}

/// An event sink that keeps every event in memory, for tests and inspection.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: RwLock<Vec<(String, serde_json::Value)>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events in arrival order.
    #[must_use]
    pub fn events(&self) -> Vec<(String, serde_json::Value)> {
        self.events.read().clone()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Returns the payloads of every event of exactly `event_type`.
    #[must_use]
    pub fn events_of_type(&self, event_type: &str) -> Vec<serde_json::Value> {
        self.events
            .read()
            .iter()
            .filter(|(t, _)| t == event_type)
            .map(|(_, data)| data.clone())
            .collect()
    }

    /// Returns the `stage` field of every event of `event_type`, in order.
    #[must_use]
    pub fn stages_for(&self, event_type: &str) -> Vec<String> {
        self.events_of_type(event_type)
            .iter()
            .filter_map(|data| data.get("stage").and_then(|s| s.as_str()))
            .map(String::from)
            .collect()
    }
}

impl EventSink for CollectingEventSink {
    fn emit(&self, event_type: &str, data: serde_json::Value) {
        self.events.write().push((event_type.to_string(), data));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_noop_and_logging_sinks_accept_events() {
        NoOpEventSink.emit("test", serde_json::json!({"x": 1}));
        LoggingEventSink::default().emit("test.event", serde_json::json!({"key": "value"}));
        LoggingEventSink::debug().emit("test.event", serde_json::Value::Null);
    }

    #[test]
    fn test_collecting_sink() {
        let sink = CollectingEventSink::new();
        assert!(sink.is_empty());

        sink.emit("stage.started", serde_json::json!({"stage": "a"}));
        sink.emit("stage.completed", serde_json::json!({"stage": "a"}));
        sink.emit("stage.started", serde_json::json!({"stage": "b"}));

        assert_eq!(sink.len(), 3);
        assert_eq!(sink.events()[1].0, "stage.completed");
        assert_eq!(sink.stages_for("stage.started"), vec!["a", "b"]);
        assert_eq!(sink.events_of_type("stage.completed").len(), 1);

        sink.clear();
        assert!(sink.is_empty());
    }
}
