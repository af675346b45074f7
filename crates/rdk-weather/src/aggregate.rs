//! Per-source observation reconciliation and the aggregation fold.
//!
//! Pure functions over the in-memory document; no clock, no network. The
//! caller fetches readings ([`crate::collect_observations`]), hands the
//! successes to [`fold_readings`], and owns persistence.
//!
//! Order of operations per reading is load-bearing: the station cursor is
//! overwritten with the reading's observation time *unconditionally*, but the
//! freshness decision uses the pre-overwrite value. A stale reading therefore
//! moves the cursor backwards while contributing nothing; the next genuine
//! reading re-advances it.

use chrono::{DateTime, Duration, Utc};
use rdk_schemas::ApplicationState;

use crate::SourceReading;

/// Observation gaps beyond this many hours contribute no rainfall: the
/// trailing-hour precipitation figure cannot stand in for a multi-hour gap.
pub const OVERLY_LONG_WEATHER_DELAY_HOURS: i64 = 3;

/// Upper clamp on any single source's rainfall contribution, inches. Readings
/// past this are sensor error, not weather.
pub const IMPOSSIBLY_CRAZY_STORM_INCHES_PER_HOUR: f64 = 3.0;

// ---------------------------------------------------------------------------
// Dispositions
// ---------------------------------------------------------------------------

/// How one station's reading was treated by the fold.
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    /// Strictly newer, inside the window. `contribution_inches` is the
    /// intensity-weighted rainfall delta before clamping.
    Fresh { contribution_inches: f64 },

    /// Observation time not newer than the station's cursor. Contributes 0.
    Duplicate,

    /// Elapsed time since the cursor was negative or beyond
    /// [`OVERLY_LONG_WEATHER_DELAY_HOURS`]. Contributes 0; the cursor still
    /// advances to the new observation time.
    OutOfWindow,
}

/// One station's disposition, the fold's per-station evidence.
#[derive(Debug, Clone, PartialEq)]
pub struct StationDisposition {
    pub station: String,
    pub disposition: Disposition,
}

/// The folded sample: one rainfall figure and one temperature for the whole
/// cycle, plus the per-station evidence.
#[derive(Debug, Clone, PartialEq)]
pub struct RainfallAggregate {
    /// Mean of per-source rainfall contributions, each clamped to
    /// `[0, IMPOSSIBLY_CRAZY_STORM_INCHES_PER_HOUR]` first. Inches.
    pub rainfall_inches: f64,
    /// Mean of the successful readings' temperatures, °C.
    pub temperature_c: f64,
    pub dispositions: Vec<StationDisposition>,
}

// ---------------------------------------------------------------------------
// The fold
// ---------------------------------------------------------------------------

/// Reconcile each reading against its station's cursor and fold the lot into
/// one sample.
///
/// Every reading counts toward both means; a `Duplicate` or `OutOfWindow`
/// reading contributes 0 inches but still dilutes the rainfall average and
/// still carries its temperature. Returns `None` when `readings` is empty:
/// the mean of an empty set is undefined and must not become NaN downstream.
pub fn fold_readings(
    state: &mut ApplicationState,
    readings: &[SourceReading],
    now: DateTime<Utc>,
) -> Option<RainfallAggregate> {
    if readings.is_empty() {
        return None;
    }

    let mut dispositions = Vec::with_capacity(readings.len());
    let mut contribution_sum = 0.0;
    let mut temperature_sum = 0.0;

    for r in readings {
        let station = state.station_mut(&r.station, now);
        let prior = station.last_observation_time;
        station.last_observation_time = r.reading.observation_time;

        let disposition = if r.reading.observation_time <= prior {
            Disposition::Duplicate
        } else {
            let elapsed = r.reading.observation_time - prior;
            if elapsed < Duration::zero()
                || elapsed > Duration::hours(OVERLY_LONG_WEATHER_DELAY_HOURS)
            {
                Disposition::OutOfWindow
            } else {
                let hours = elapsed.num_milliseconds() as f64 / 3_600_000.0;
                Disposition::Fresh {
                    contribution_inches: hours * r.reading.precipitation_inches_last_hour,
                }
            }
        };

        let contribution = match &disposition {
            Disposition::Fresh {
                contribution_inches,
            } => *contribution_inches,
            Disposition::Duplicate | Disposition::OutOfWindow => 0.0,
        };
        contribution_sum += contribution
            .max(0.0)
            .min(IMPOSSIBLY_CRAZY_STORM_INCHES_PER_HOUR);
        temperature_sum += r.reading.temperature_c;

        dispositions.push(StationDisposition {
            station: r.station.clone(),
            disposition,
        });
    }

    let n = readings.len() as f64;
    Some(RainfallAggregate {
        rainfall_inches: contribution_sum / n,
        temperature_c: temperature_sum / n,
        dispositions,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
