//! Scenario: Drain Hysteresis Schmitt Trigger
//!
//! # Invariants under test
//!
//! 1. The flag latches on when remaining volume exceeds the sixteenth-inch
//!    threshold and the puddle is warmer than 4 °C.
//! 2. Once on, the flag stays on while remaining > 0, even after the volume
//!    drops below the threshold (no on/off oscillation near the boundary).
//! 3. The flag drops when the puddle runs empty.
//! 4. The flag never turns on at or below 4 °C, regardless of volume.
//! 5. A cold snap mid-drain turns the flag off even with water remaining.
//! 6. `estimatedGallonsRemaining` never goes negative across a full
//!    fill-and-drain run.
//!
//! All tests are pure in-process; no store, no clock, no network.

use chrono::{DateTime, Duration, Utc};
use rdk_balance::{advance, drain_threshold_gallons};
use rdk_schemas::{PuddleConfig, PuddleState};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

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

fn puddle_at(remaining: f64, temperature_c: f64, draining: bool, at: DateTime<Utc>) -> PuddleState {
    PuddleState {
        name: "north".to_string(),
        estimated_gallons_remaining: remaining,
        temperature_c,
        last_drain_observation_time: at,
        drained_at_last_observation_time: draining,
    }
}

// ---------------------------------------------------------------------------
// 1. Latch on above threshold when warm
// ---------------------------------------------------------------------------

#[test]
fn flag_latches_on_above_threshold_when_warm() {
    let t0 = ts("2021-03-01T08:00:00Z");
    // Threshold for 100 ft² is ≈3.896 gal; 62 gal (an inch of rain) is far past it.
    let mut p = puddle_at(62.34, 10.0, false, t0);

    let update = advance(&mut p, &config(), t0 + Duration::minutes(1));
    assert!(
        update.draining,
        "remaining {} > threshold {} and temp > 4 °C must start the drain",
        update.estimated_gallons_remaining,
        drain_threshold_gallons(&config())
    );
}

// ---------------------------------------------------------------------------
// 2. Stays on below threshold while water remains
// ---------------------------------------------------------------------------

#[test]
fn flag_stays_on_below_threshold_while_water_remains() {
    let t0 = ts("2021-03-01T08:00:00Z");
    let threshold = drain_threshold_gallons(&config());

    // 30 s at 5 gal/min removes 2.6 gal incl. evaporation, leaving a
    // sub-threshold puddle; the trigger must hold.
    let mut p = puddle_at(threshold + 2.0, 10.0, true, t0);
    let update = advance(&mut p, &config(), t0 + Duration::seconds(30));

    assert!(
        update.estimated_gallons_remaining < threshold,
        "precondition: remaining {} must have dropped below threshold {threshold}",
        update.estimated_gallons_remaining
    );
    assert!(update.estimated_gallons_remaining > 0.0);
    assert!(
        update.draining,
        "Schmitt trigger must hold on below the threshold while remaining > 0"
    );
}

// ---------------------------------------------------------------------------
// 3. Drops at empty
// ---------------------------------------------------------------------------

#[test]
fn flag_drops_when_puddle_runs_empty() {
    let t0 = ts("2021-03-01T08:00:00Z");
    let mut p = puddle_at(1.0, 10.0, true, t0);

    // 1 gal at 5 gal/min is gone well before 5 minutes.
    let update = advance(&mut p, &config(), t0 + Duration::minutes(5));
    assert_eq!(update.estimated_gallons_remaining, 0.0);
    assert!(!update.draining, "empty puddle must stop draining");
}

// ---------------------------------------------------------------------------
// 4. Never on at or below 4 °C
// ---------------------------------------------------------------------------

#[test]
fn flag_never_turns_on_when_cold() {
    let t0 = ts("2021-03-01T08:00:00Z");

    for temp in [-10.0, 0.0, 3.9, 4.0] {
        let mut p = puddle_at(500.0, temp, false, t0);
        let update = advance(&mut p, &config(), t0 + Duration::minutes(1));
        assert!(
            !update.draining,
            "drain must stay off at {temp} °C regardless of volume"
        );
    }
}

// ---------------------------------------------------------------------------
// 5. Cold snap mid-drain
// ---------------------------------------------------------------------------

#[test]
fn cold_snap_turns_flag_off_with_water_remaining() {
    let t0 = ts("2021-03-01T08:00:00Z");
    let mut p = puddle_at(50.0, 2.0, true, t0);

    let update = advance(&mut p, &config(), t0 + Duration::minutes(1));
    assert!(update.estimated_gallons_remaining > 0.0);
    assert!(
        !update.draining,
        "a draining puddle that turns cold must stop"
    );
}

// ---------------------------------------------------------------------------
// 6. Volume never negative across a full drain-down
// ---------------------------------------------------------------------------

#[test]
fn volume_never_negative_across_full_drain_down() {
    let t0 = ts("2021-03-01T08:00:00Z");
    let mut p = puddle_at(20.0, 10.0, false, t0);
    p.drained_at_last_observation_time = true;

    let mut now = t0;
    for _ in 0..30 {
        now += Duration::minutes(1);
        let update = advance(&mut p, &config(), now);
        assert!(
            update.estimated_gallons_remaining >= 0.0,
            "remaining must never be negative, got {}",
            update.estimated_gallons_remaining
        );
    }
    assert_eq!(p.estimated_gallons_remaining, 0.0);
    assert!(!p.drained_at_last_observation_time);
}
