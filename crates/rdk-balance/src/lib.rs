//! rdk-balance
//!
//! Puddle water-balance model.
//!
//! Architectural decisions:
//! - Pure computation over `(PuddleState, PuddleConfig, now)`; no I/O, no clock
//! - Drain volume is credited only while the hysteresis flag was set
//! - A constant evaporation term is removed every cycle
//! - Elapsed time beyond the overly-long bound skips the volume update but
//!   still advances the observation time and still runs the flag transition
//! - The drain flag is a Schmitt trigger: it latches on above the
//!   sixteenth-inch threshold and stays on until the puddle is empty
//!
//! Deterministic. The caller supplies `now`.

pub mod units;

use chrono::{DateTime, Duration, Utc};
use rdk_schemas::{PuddleConfig, PuddleState};
use serde::Serialize;

/// Elapsed drain-report gaps beyond this many hours are anomalous: something
/// upstream stalled, and crediting the full gap as drain time would empty the
/// modeled puddle while the real one still holds water.
pub const OVERLY_LONG_DRAIN_DELAY_HOURS: i64 = 3;

/// Water removed from every puddle each cycle regardless of the drain flag.
/// Roughly five gallons per day at the production reporting cadence.
pub const EVAPORATION_GALLONS_PER_CYCLE: f64 = 0.1;

/// Below this ambient temperature the drain is never commanded on; pumping
/// near freezing risks ice in the line.
pub const MIN_DRAIN_TEMPERATURE_C: f64 = 4.0;

// ---------------------------------------------------------------------------
// Cycle report
// ---------------------------------------------------------------------------

/// Volume outcome of one balance cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum BalanceOutcome {
    /// Drain/evaporation applied. `gallons_drained` is the total removed
    /// (possibly negative under clock skew, see [`advance`]).
    Applied { gallons_drained: f64 },

    /// Elapsed time exceeded [`OVERLY_LONG_DRAIN_DELAY_HOURS`]; the volume
    /// was left untouched. Carries the offending gap for reporting.
    AnomalousDelay {
        #[serde(serialize_with = "serialize_minutes")]
        elapsed: Duration,
    },
}

fn serialize_minutes<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_i64(d.num_minutes())
}

impl BalanceOutcome {
    pub fn is_anomalous(&self) -> bool {
        matches!(self, BalanceOutcome::AnomalousDelay { .. })
    }
}

/// Result of advancing one puddle through one balance cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceUpdate {
    pub outcome: BalanceOutcome,
    /// The hysteresis flag after the transition: whether the physical drain
    /// should be running until the next cycle.
    pub draining: bool,
    pub estimated_gallons_remaining: f64,
}

// ---------------------------------------------------------------------------
// The model
// ---------------------------------------------------------------------------

/// Gallons at which the drain flag latches on for this puddle's area.
pub fn drain_threshold_gallons(config: &PuddleConfig) -> f64 {
    units::sixteenth_inch_gallons(config.area_square_feet)
}

/// Advance one puddle through one balance cycle.
///
/// Order of operations is load-bearing:
/// 1. volume update (skipped entirely on an overly long gap),
/// 2. observation time advances to `now` unconditionally,
/// 3. flag transition, evaluated with the *pre-cycle* flag and the
///    *post-update* volume: `temperature > 4 °C && ((was_draining &&
///    remaining > 0) || remaining > threshold)`.
///
/// Negative `elapsed` (caller clock behind the stored observation time) is
/// deliberately not guarded: it yields a negative `gallons_drained`, which
/// increases the volume. Pending a decision on clock-skew handling this
/// behavior is pinned by tests rather than corrected.
pub fn advance(state: &mut PuddleState, config: &PuddleConfig, now: DateTime<Utc>) -> BalanceUpdate {
    let elapsed = now - state.last_drain_observation_time;

    let outcome = if elapsed > Duration::hours(OVERLY_LONG_DRAIN_DELAY_HOURS) {
        BalanceOutcome::AnomalousDelay { elapsed }
    } else {
        let minutes = elapsed.num_milliseconds() as f64 / 60_000.0;
        let mut gallons_drained = if state.drained_at_last_observation_time {
            minutes * config.drain_rate_gallons_per_minute
        } else {
            0.0
        };
        gallons_drained += EVAPORATION_GALLONS_PER_CYCLE;

        state.estimated_gallons_remaining =
            (state.estimated_gallons_remaining - gallons_drained).max(0.0);

        BalanceOutcome::Applied { gallons_drained }
    };

    state.last_drain_observation_time = now;

    let threshold = drain_threshold_gallons(config);
    let was_draining = state.drained_at_last_observation_time;
    state.drained_at_last_observation_time = state.temperature_c > MIN_DRAIN_TEMPERATURE_C
        && ((was_draining && state.estimated_gallons_remaining > 0.0)
            || state.estimated_gallons_remaining > threshold);

    BalanceUpdate {
        outcome,
        draining: state.drained_at_last_observation_time,
        estimated_gallons_remaining: state.estimated_gallons_remaining,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .expect("test timestamp")
            .with_timezone(&Utc)
    }

    fn config() -> PuddleConfig {
        PuddleConfig {
            name: "north".to_string(),
            area_square_feet: 100.0,
            drain_rate_gallons_per_minute: 5.0,
        }
    }

    fn puddle(remaining: f64, temperature_c: f64, draining: bool, at: DateTime<Utc>) -> PuddleState {
        PuddleState {
            name: "north".to_string(),
            estimated_gallons_remaining: remaining,
            temperature_c,
            last_drain_observation_time: at,
            drained_at_last_observation_time: draining,
        }
    }

    // --- volume update ---

    #[test]
    fn draining_puddle_loses_rate_times_minutes_plus_evaporation() {
        let t0 = ts("2021-03-01T08:00:00Z");
        let mut p = puddle(10.0, 10.0, true, t0);

        let update = advance(&mut p, &config(), t0 + Duration::minutes(1));

        // 1 min * 5 gal/min + 0.1 evaporation = 5.1
        match update.outcome {
            BalanceOutcome::Applied { gallons_drained } => {
                assert!((gallons_drained - 5.1).abs() < 1e-9, "got {gallons_drained}")
            }
            other => panic!("expected Applied, got {other:?}"),
        }
        assert!((p.estimated_gallons_remaining - 4.9).abs() < 1e-9);
        assert!(update.draining, "was draining and remaining > 0");
    }

    #[test]
    fn idle_puddle_loses_only_evaporation() {
        let t0 = ts("2021-03-01T08:00:00Z");
        let mut p = puddle(2.0, 10.0, false, t0);

        advance(&mut p, &config(), t0 + Duration::minutes(30));
        assert!((p.estimated_gallons_remaining - 1.9).abs() < 1e-9);
    }

    #[test]
    fn remaining_clamps_at_zero() {
        let t0 = ts("2021-03-01T08:00:00Z");
        let mut p = puddle(0.5, 10.0, true, t0);

        let update = advance(&mut p, &config(), t0 + Duration::minutes(10));
        assert_eq!(p.estimated_gallons_remaining, 0.0);
        assert_eq!(update.estimated_gallons_remaining, 0.0);
        assert!(!update.draining, "empty puddle must stop draining");
    }

    #[test]
    fn fractional_minutes_are_credited_at_millisecond_precision() {
        let t0 = ts("2021-03-01T08:00:00Z");
        let mut p = puddle(100.0, 10.0, true, t0);

        advance(&mut p, &config(), t0 + Duration::milliseconds(90_000));

        // 1.5 min * 5 gal/min + 0.1 = 7.6
        assert!((p.estimated_gallons_remaining - 92.4).abs() < 1e-9);
    }

    // --- clock skew (pinned, not endorsed) ---

    #[test]
    fn negative_elapsed_increases_volume_for_a_draining_puddle() {
        let t0 = ts("2021-03-01T08:00:00Z");
        let mut p = puddle(10.0, 10.0, true, t0);

        // Caller clock one minute behind the stored observation time.
        let update = advance(&mut p, &config(), t0 - Duration::minutes(1));

        // -1 min * 5 gal/min + 0.1 = -4.9 drained, i.e. +4.9 gallons.
        match update.outcome {
            BalanceOutcome::Applied { gallons_drained } => {
                assert!((gallons_drained + 4.9).abs() < 1e-9, "got {gallons_drained}")
            }
            other => panic!("expected Applied, got {other:?}"),
        }
        assert!((p.estimated_gallons_remaining - 14.9).abs() < 1e-9);
        assert_eq!(p.last_drain_observation_time, t0 - Duration::minutes(1));
    }

    // --- observation time ---

    #[test]
    fn observation_time_advances_to_now_on_every_cycle() {
        let t0 = ts("2021-03-01T08:00:00Z");
        let t1 = t0 + Duration::minutes(7);
        let mut p = puddle(1.0, 10.0, false, t0);

        advance(&mut p, &config(), t1);
        assert_eq!(p.last_drain_observation_time, t1);
    }

    // --- threshold ---

    #[test]
    fn flag_latches_on_just_above_threshold_and_not_at_it() {
        let t0 = ts("2021-03-01T08:00:00Z");
        let threshold = drain_threshold_gallons(&config());

        // Slightly below after evaporation: stays off.
        let mut below = puddle(threshold + 0.05, 10.0, false, t0);
        let update = advance(&mut below, &config(), t0 + Duration::minutes(1));
        assert!(!update.draining);

        // Comfortably above after evaporation: latches on.
        let mut above = puddle(threshold + 1.0, 10.0, false, t0);
        let update = advance(&mut above, &config(), t0 + Duration::minutes(1));
        assert!(update.draining);
    }

    // --- report wire shape ---

    #[test]
    fn anomalous_delay_reports_elapsed_as_whole_minutes() {
        let update = BalanceUpdate {
            outcome: BalanceOutcome::AnomalousDelay {
                elapsed: Duration::hours(3) + Duration::minutes(1) + Duration::seconds(30),
            },
            draining: false,
            estimated_gallons_remaining: 12.0,
        };
        let v = serde_json::to_value(&update).expect("serialize");

        // Sub-minute precision is dropped from the report.
        assert_eq!(v["outcome"]["AnomalousDelay"]["elapsed"], 181);
        assert_eq!(v["draining"], false);
        assert_eq!(v["estimated_gallons_remaining"], 12.0);
    }
}
