//! rdk-testkit
//!
//! Shared scenario plumbing: a scripted weather source, document and config
//! builders, and a fixed-instant engine harness over the in-memory store.
//! The end-to-end scenarios live under `tests/`; production crates never
//! depend on this one.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rdk_engine::BalanceEngine;
use rdk_schemas::{ApplicationState, PuddleConfig, PuddleState, StateSeed, StationState};
use rdk_store::MemoryStateStore;
use rdk_telemetry::RecordingSink;
use rdk_weather::StationReading;

mod scripted;

pub use scripted::ScriptedWeatherSource;

/// Parse a fixed RFC 3339 instant. Panics on bad input; test-only.
pub fn ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .expect("fixed test timestamp")
        .with_timezone(&Utc)
}

pub fn puddle_config(name: &str, area_square_feet: f64, rate: f64) -> PuddleConfig {
    PuddleConfig {
        name: name.to_string(),
        area_square_feet,
        drain_rate_gallons_per_minute: rate,
    }
}

pub fn reading(precip_in_per_hr: f64, temp_c: f64, observed: DateTime<Utc>) -> StationReading {
    StationReading {
        precipitation_inches_last_hour: precip_in_per_hr,
        temperature_c: temp_c,
        observation_time: observed,
    }
}

// ---------------------------------------------------------------------------
// Document builder
// ---------------------------------------------------------------------------

/// Builds an [`ApplicationState`] document entry by entry, for scenarios
/// that start from a lived-in document rather than a fresh one.
#[derive(Default)]
pub struct DocumentBuilder {
    puddles: Vec<PuddleState>,
    stations: Vec<StationState>,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn puddle(
        mut self,
        name: &str,
        gallons: f64,
        temp_c: f64,
        draining: bool,
        observed: DateTime<Utc>,
    ) -> Self {
        self.puddles.push(PuddleState {
            name: name.to_string(),
            estimated_gallons_remaining: gallons,
            temperature_c: temp_c,
            last_drain_observation_time: observed,
            drained_at_last_observation_time: draining,
        });
        self
    }

    pub fn station(mut self, name: &str, cursor: DateTime<Utc>) -> Self {
        self.stations.push(StationState {
            name: name.to_string(),
            last_observation_time: cursor,
        });
        self
    }

    pub fn build(self) -> ApplicationState {
        ApplicationState {
            puddles: self.puddles,
            stations: self.stations,
        }
    }
}

// ---------------------------------------------------------------------------
// Engine harness
// ---------------------------------------------------------------------------

/// A [`BalanceEngine`] wired to an in-memory store, a scripted source, and a
/// recording sink, with direct handles to all three so scenarios can stage
/// documents and inspect what happened.
pub struct EngineHarness {
    pub store: Arc<MemoryStateStore>,
    pub source: Arc<ScriptedWeatherSource>,
    pub sink: Arc<RecordingSink>,
    pub engine: BalanceEngine,
}

impl EngineHarness {
    /// Harness over an empty, unseeded store: every entry the engine touches
    /// is created lazily at the cycle's own instant, keeping fixed-instant
    /// scenarios off the wall clock.
    pub fn new(puddles: Vec<PuddleConfig>, stations: Vec<&str>) -> Self {
        let store = Arc::new(MemoryStateStore::new("scenario", StateSeed::default()));
        let source = Arc::new(ScriptedWeatherSource::new());
        let sink = Arc::new(RecordingSink::new());
        let engine = BalanceEngine::new(
            store.clone(),
            source.clone(),
            sink.clone(),
            puddles,
            stations.iter().map(|s| s.to_string()).collect(),
        );
        Self {
            store,
            source,
            sink,
            engine,
        }
    }
}
