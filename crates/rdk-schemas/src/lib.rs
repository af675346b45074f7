//! rdk-schemas
//!
//! Persisted state documents and the puddle configuration shape.
//!
//! The serialized field names of [`ApplicationState`] are a stable contract:
//! documents written by earlier deployments must keep decoding, so every
//! rename here is a breaking change to live state. Field names are camelCase
//! on the wire (see the serialization tests at the bottom of this file).
//!
//! This crate owns no I/O and no reconciliation logic.

mod device;

pub use device::{DrainDeviceReport, DrainDeviceStatus};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ApplicationState: the root persisted document
// ---------------------------------------------------------------------------

/// The full application state for one deployment environment.
///
/// One document per state key. Both collections are ordered and keyed by
/// case-insensitive name; insertion order is preserved but carries no
/// meaning. Entries are created lazily on first reference and never deleted
/// during normal operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationState {
    pub puddles: Vec<PuddleState>,
    pub stations: Vec<StationState>,
}

impl ApplicationState {
    /// Freshly initialized document: one default entry per seeded name.
    ///
    /// Used by the state store when no document exists yet (absent version
    /// token path).
    pub fn initial(seed: &StateSeed, now: DateTime<Utc>) -> Self {
        Self {
            puddles: seed
                .puddle_names
                .iter()
                .map(|n| PuddleState::initial(n, now))
                .collect(),
            stations: seed
                .station_names
                .iter()
                .map(|n| StationState::initial(n, now))
                .collect(),
        }
    }

    /// Upsert-by-name: returns the puddle entry, creating the default entry
    /// the first time a name is seen. Name matching is ASCII case-insensitive;
    /// the stored name keeps the spelling of whoever created the entry.
    pub fn puddle_mut(&mut self, name: &str, now: DateTime<Utc>) -> &mut PuddleState {
        let idx = match self
            .puddles
            .iter()
            .position(|p| p.name.eq_ignore_ascii_case(name))
        {
            Some(i) => i,
            None => {
                self.puddles.push(PuddleState::initial(name, now));
                self.puddles.len() - 1
            }
        };
        &mut self.puddles[idx]
    }

    /// Upsert-by-name for station entries. Same rules as [`puddle_mut`].
    ///
    /// [`puddle_mut`]: ApplicationState::puddle_mut
    pub fn station_mut(&mut self, name: &str, now: DateTime<Utc>) -> &mut StationState {
        let idx = match self
            .stations
            .iter()
            .position(|s| s.name.eq_ignore_ascii_case(name))
        {
            Some(i) => i,
            None => {
                self.stations.push(StationState::initial(name, now));
                self.stations.len() - 1
            }
        };
        &mut self.stations[idx]
    }

    /// Read-only lookup (case-insensitive). No entry is created.
    pub fn puddle(&self, name: &str) -> Option<&PuddleState> {
        self.puddles
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Read-only lookup (case-insensitive). No entry is created.
    pub fn station(&self, name: &str) -> Option<&StationState> {
        self.stations
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }
}

// ---------------------------------------------------------------------------
// PuddleState / StationState
// ---------------------------------------------------------------------------

/// One modeled roof catch basin.
///
/// Mutated only by the water-balance model (volume, hysteresis flag) and the
/// weather application step (volume, temperature).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PuddleState {
    pub name: String,
    /// Estimated standing water, gallons. Clamped at zero, never negative.
    pub estimated_gallons_remaining: f64,
    /// Last known ambient temperature, °C.
    pub temperature_c: f64,
    pub last_drain_observation_time: DateTime<Utc>,
    /// Hysteresis "currently draining" flag. Transition rule lives in
    /// rdk-balance; this crate only stores it.
    pub drained_at_last_observation_time: bool,
}

impl PuddleState {
    /// Default entry for a name seen for the first time: empty, cold, not
    /// draining, last observed one hour ago.
    pub fn initial(name: &str, now: DateTime<Utc>) -> Self {
        Self {
            name: name.to_string(),
            estimated_gallons_remaining: 0.0,
            temperature_c: 0.0,
            last_drain_observation_time: now - Duration::hours(1),
            drained_at_last_observation_time: false,
        }
    }
}

/// One external weather station's reconciliation cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationState {
    pub name: String,
    /// Observation time of the last reading taken from this station.
    pub last_observation_time: DateTime<Utc>,
}

impl StationState {
    pub fn initial(name: &str, now: DateTime<Utc>) -> Self {
        Self {
            name: name.to_string(),
            last_observation_time: now - Duration::hours(1),
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration shapes
// ---------------------------------------------------------------------------

/// Configuration for one drained roof puddle. Comes from layered YAML config
/// (snake_case keys), not from the persisted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PuddleConfig {
    pub name: String,
    pub area_square_feet: f64,
    pub drain_rate_gallons_per_minute: f64,
}

/// Name lists used to build the initial [`ApplicationState`] when no document
/// has been persisted yet.
#[derive(Debug, Clone, Default)]
pub struct StateSeed {
    pub puddle_names: Vec<String>,
    pub station_names: Vec<String>,
}

impl StateSeed {
    pub fn new(puddle_names: Vec<String>, station_names: Vec<String>) -> Self {
        Self {
            puddle_names,
            station_names,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
