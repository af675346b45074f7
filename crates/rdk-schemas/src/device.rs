//! Drain-device check-in model.
//!
//! The physical drain device reports timestamps on its own millisecond clock
//! (monotonic since device boot, no wall-clock on board). A raw
//! [`DrainDeviceReport`] is therefore only meaningful relative to the
//! device's `current_time`; [`DrainDeviceReport::resolve`] rebases every
//! device timestamp onto the caller's wall clock.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Raw check-in posted by the drain device. All `*_time` fields are device
/// clock milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrainDeviceReport {
    /// Current temperature reading at the drain, °C.
    pub current_temperature: f64,
    pub is_frozen: bool,
    /// Device clock "now", ms.
    pub current_time: i64,
    pub time_of_last_prime: i64,
    pub time_of_last_drain: i64,
    pub time_of_next_prime: i64,
    pub is_draining: bool,
    #[serde(default)]
    pub message: String,
}

impl DrainDeviceReport {
    /// Rebase device-relative timestamps onto wall-clock time:
    /// `resolved = now - (current_time - time_of_x)`.
    ///
    /// A device timestamp ahead of `current_time` (scheduled next prime)
    /// resolves to the future; one behind resolves to the past. Device clock
    /// wrap is not corrected here.
    pub fn resolve(&self, now: DateTime<Utc>) -> DrainDeviceStatus {
        let rebase = |device_ms: i64| now - Duration::milliseconds(self.current_time - device_ms);

        DrainDeviceStatus {
            updated: now,
            current_temperature: self.current_temperature,
            is_frozen: self.is_frozen,
            time_of_last_prime: rebase(self.time_of_last_prime),
            time_of_last_drain: rebase(self.time_of_last_drain),
            time_of_next_prime: rebase(self.time_of_next_prime),
            is_draining: self.is_draining,
            message: self.message.clone(),
        }
    }
}

/// A device check-in resolved against wall-clock time. Held in memory by the
/// orchestrator; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrainDeviceStatus {
    /// When the report was received.
    pub updated: DateTime<Utc>,
    pub current_temperature: f64,
    pub is_frozen: bool,
    pub time_of_last_prime: DateTime<Utc>,
    pub time_of_last_drain: DateTime<Utc>,
    pub time_of_next_prime: DateTime<Utc>,
    pub is_draining: bool,
    pub message: String,
}
