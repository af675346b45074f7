//! rdk-telemetry
//!
//! Named-event telemetry boundary.
//!
//! The engine reports what happened through [`EventSink`]; where those events
//! go (tracing, a collector, a test recorder) is the sink's business. The
//! trait is deliberately infallible: a sink must never be able to fail a
//! reconciliation cycle, so `event`/`exception` return nothing and any sink
//! trouble stays inside the sink.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

// ---------------------------------------------------------------------------
// TelemetryEvent
// ---------------------------------------------------------------------------

/// One named event with string properties and numeric metrics.
///
/// Property/metric keys are part of the observability contract downstream
/// dashboards query; see the emitting call sites in rdk-engine for the
/// catalog (`Drain`, `Rain`, `WeatherStationUpdate`, `RainfallUpdate`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub name: String,
    /// Ordered for deterministic rendering.
    pub properties: BTreeMap<String, String>,
    pub metrics: BTreeMap<String, f64>,
}

impl TelemetryEvent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: BTreeMap::new(),
            metrics: BTreeMap::new(),
        }
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn metric(mut self, key: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(key.into(), value);
        self
    }
}

// ---------------------------------------------------------------------------
// EventSink
// ---------------------------------------------------------------------------

/// Destination for engine telemetry. Implementations must be cheap enough to
/// call inline from a cycle and must swallow their own failures.
pub trait EventSink: Send + Sync {
    fn event(&self, event: TelemetryEvent);

    /// Record a non-fatal anomaly (overly long delay, failed source fetch).
    fn exception(&self, message: &str);
}

/// Sink that forwards events onto `tracing` at info/error level.
pub struct TracingSink;

impl EventSink for TracingSink {
    fn event(&self, event: TelemetryEvent) {
        tracing::info!(
            target: "rdk::telemetry",
            name = %event.name,
            properties = %render(&event.properties),
            metrics = %render(&event.metrics),
            "event"
        );
    }

    fn exception(&self, message: &str) {
        tracing::error!(target: "rdk::telemetry", "{message}");
    }
}

/// Sink that drops everything. For callers that genuinely want no telemetry.
pub struct NullSink;

impl EventSink for NullSink {
    fn event(&self, _event: TelemetryEvent) {}
    fn exception(&self, _message: &str) {}
}

/// Sink that records everything in memory. For tests asserting on the event
/// catalog a cycle emits.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<TelemetryEvent>>,
    exceptions: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn exceptions(&self) -> Vec<String> {
        self.exceptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Recorded events with the given name, in emission order.
    pub fn events_named(&self, name: &str) -> Vec<TelemetryEvent> {
        self.events().into_iter().filter(|e| e.name == name).collect()
    }
}

impl EventSink for RecordingSink {
    fn event(&self, event: TelemetryEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    fn exception(&self, message: &str) {
        self.exceptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }
}

fn render<T: Serialize>(v: &T) -> String {
    // Cannot fail for string/float maps (non-finite floats render as null);
    // fall back to an empty object rather than lose the log line.
    serde_json::to_string(v).unwrap_or_else(|_| "{}".to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_properties_and_metrics() {
        let ev = TelemetryEvent::new("Drain")
            .property("puddle", "north")
            .metric("gallons", 5.1)
            .metric("remaining", 4.9);

        assert_eq!(ev.name, "Drain");
        assert_eq!(ev.properties.get("puddle").map(String::as_str), Some("north"));
        assert_eq!(ev.metrics.get("gallons"), Some(&5.1));
        assert_eq!(ev.metrics.len(), 2);
    }

    #[test]
    fn properties_render_in_key_order() {
        let ev = TelemetryEvent::new("x")
            .property("b", "2")
            .property("a", "1");
        assert_eq!(render(&ev.properties), r#"{"a":"1","b":"2"}"#);
    }

    #[test]
    fn render_survives_non_finite_metrics() {
        let ev = TelemetryEvent::new("x").metric("bad", f64::NAN);
        assert_eq!(render(&ev.metrics), r#"{"bad":null}"#);
    }

    #[test]
    fn recording_sink_keeps_emission_order_and_filters_by_name() {
        let sink = RecordingSink::new();
        sink.event(TelemetryEvent::new("Drain").property("puddle", "north"));
        sink.event(TelemetryEvent::new("Rain").property("puddle", "north"));
        sink.event(TelemetryEvent::new("Drain").property("puddle", "south"));
        sink.exception("station KWA1 failed");

        assert_eq!(sink.events().len(), 3);
        let drains = sink.events_named("Drain");
        assert_eq!(drains.len(), 2);
        assert_eq!(drains[1].properties.get("puddle").map(String::as_str), Some("south"));
        assert_eq!(sink.exceptions(), vec!["station KWA1 failed".to_string()]);
    }
}
