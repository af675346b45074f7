//! The balance engine: cycle operations over store, model, and sources.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;

use rdk_balance::{advance, units, BalanceOutcome};
use rdk_schemas::{
    ApplicationState, DrainDeviceReport, DrainDeviceStatus, PuddleConfig, StateSeed,
};
use rdk_store::StateStore;
use rdk_telemetry::{EventSink, TelemetryEvent};
use rdk_weather::aggregate::fold_readings;
use rdk_weather::{collect_observations, SourceReading, WeatherSource};

use crate::CycleError;

/// Per-puddle outcome of a drain-report cycle, handed back to whatever
/// triggered it (the drain device's relay, the CLI).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrainDecision {
    pub puddle: String,
    /// Whether the physical drain should run until the next cycle; the
    /// hysteresis flag after this cycle's transition.
    pub activate: bool,
    pub estimated_gallons_remaining: f64,
}

/// The reconciliation orchestrator.
///
/// Owns no state beyond the configured puddle/station lists and the latest
/// drain-device status; the system of record is behind [`StateStore`]. Safe
/// to share (`Arc<BalanceEngine>`) across timers and request handlers;
/// concurrent cycles race on the store's version token, not on this struct.
pub struct BalanceEngine {
    store: Arc<dyn StateStore>,
    source: Arc<dyn WeatherSource>,
    sink: Arc<dyn EventSink>,
    puddles: Vec<PuddleConfig>,
    stations: Vec<String>,
    device_status: RwLock<Option<DrainDeviceStatus>>,
}

impl BalanceEngine {
    pub fn new(
        store: Arc<dyn StateStore>,
        source: Arc<dyn WeatherSource>,
        sink: Arc<dyn EventSink>,
        puddles: Vec<PuddleConfig>,
        stations: Vec<String>,
    ) -> Self {
        Self {
            store,
            source,
            sink,
            puddles,
            stations,
            device_status: RwLock::new(None),
        }
    }

    pub fn puddle_configs(&self) -> &[PuddleConfig] {
        &self.puddles
    }

    fn seed(&self) -> StateSeed {
        StateSeed::new(
            self.puddles.iter().map(|p| p.name.clone()).collect(),
            self.stations.clone(),
        )
    }

    // -----------------------------------------------------------------------
    // Drain-report cycle
    // -----------------------------------------------------------------------

    /// Advance every configured puddle through one balance cycle and return
    /// the per-puddle activation decisions.
    pub async fn run_drain_report_cycle(&self) -> Result<Vec<DrainDecision>, CycleError> {
        self.run_drain_report_cycle_at(Utc::now()).await
    }

    /// Deterministic variant for tests and replay.
    pub async fn run_drain_report_cycle_at(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<DrainDecision>, CycleError> {
        let (mut state, token) = self.store.load().await?;

        let mut decisions = Vec::with_capacity(self.puddles.len());
        for config in &self.puddles {
            let puddle = state.puddle_mut(&config.name, now);
            let update = advance(puddle, config, now);

            match &update.outcome {
                BalanceOutcome::AnomalousDelay { elapsed } => {
                    self.sink.exception(&format!(
                        "unexpected long delay for drain {} of {} minutes",
                        config.name,
                        elapsed.num_minutes()
                    ));
                }
                BalanceOutcome::Applied { gallons_drained } => {
                    self.sink.event(
                        TelemetryEvent::new("Drain")
                            .property("puddle", config.name.as_str())
                            .metric("gallons", *gallons_drained)
                            .metric("remaining", update.estimated_gallons_remaining),
                    );
                }
            }

            decisions.push(DrainDecision {
                puddle: config.name.clone(),
                activate: update.draining,
                estimated_gallons_remaining: update.estimated_gallons_remaining,
            });
        }

        self.store.save(&state, token.as_ref()).await?;
        Ok(decisions)
    }

    // -----------------------------------------------------------------------
    // Weather-poll cycle
    // -----------------------------------------------------------------------

    /// Fetch all stations, fold their readings into one rainfall/temperature
    /// sample, and apply it to every configured puddle.
    ///
    /// Fetches run before the state load so slow stations don't stretch the
    /// load→save window and invite conflicts.
    pub async fn run_weather_poll_cycle(&self) -> Result<(), CycleError> {
        self.run_weather_poll_cycle_at(Utc::now()).await
    }

    /// Deterministic variant for tests and replay.
    pub async fn run_weather_poll_cycle_at(&self, now: DateTime<Utc>) -> Result<(), CycleError> {
        let observations = collect_observations(self.source.as_ref(), &self.stations).await;

        let mut readings = Vec::new();
        for obs in observations {
            match obs.outcome {
                Ok(reading) => {
                    self.sink.event(
                        TelemetryEvent::new("WeatherStationUpdate")
                            .property("station", obs.station.as_str())
                            .property("observation_time", reading.observation_time.to_rfc3339())
                            .metric("precip_1hr_in", reading.precipitation_inches_last_hour)
                            .metric("temp_c", reading.temperature_c),
                    );
                    readings.push(SourceReading {
                        station: obs.station,
                        reading,
                    });
                }
                Err(e) => {
                    self.sink
                        .exception(&format!("station {} fetch failed: {e}", obs.station));
                }
            }
        }

        if readings.is_empty() {
            self.sink
                .exception("all weather sources unavailable; rainfall update skipped");
            return Err(CycleError::AllSourcesUnavailable);
        }

        let (mut state, token) = self.store.load().await?;

        let Some(aggregate) = fold_readings(&mut state, &readings, now) else {
            // Unreachable past the emptiness check above; kept as a guard so
            // a refactor can never reintroduce the NaN mean.
            return Err(CycleError::AllSourcesUnavailable);
        };

        self.sink.event(
            TelemetryEvent::new("RainfallUpdate")
                .metric("rainfall", aggregate.rainfall_inches)
                .metric("temperature", aggregate.temperature_c),
        );

        for config in &self.puddles {
            let gallons_added =
                units::rainfall_gallons(config.area_square_feet, aggregate.rainfall_inches);
            self.sink.event(
                TelemetryEvent::new("Rain")
                    .property("puddle", config.name.as_str())
                    .metric("gallons", gallons_added),
            );

            let puddle = state.puddle_mut(&config.name, now);
            puddle.estimated_gallons_remaining += gallons_added;
            puddle.temperature_c = aggregate.temperature_c;
        }

        self.store.save(&state, token.as_ref()).await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Manual override / snapshot / reset
    // -----------------------------------------------------------------------

    /// Set every puddle's estimated volume to `gallons`. Calibration hook.
    pub async fn set_water(&self, gallons: f64) -> Result<(), CycleError> {
        let (mut state, token) = self.store.load().await?;
        for puddle in &mut state.puddles {
            puddle.estimated_gallons_remaining = gallons;
        }
        self.store.save(&state, token.as_ref()).await?;
        Ok(())
    }

    /// Read-only snapshot of the current document. No write.
    pub async fn current_state(&self) -> Result<ApplicationState, CycleError> {
        let (state, _) = self.store.load().await?;
        Ok(state)
    }

    /// Replace the document with a freshly initialized one. Conflict-safe:
    /// a concurrent cycle's save makes this fail rather than resurrect
    /// pre-reset state.
    pub async fn reset(&self) -> Result<(), CycleError> {
        self.reset_at(Utc::now()).await
    }

    pub async fn reset_at(&self, now: DateTime<Utc>) -> Result<(), CycleError> {
        let (_, token) = self.store.load().await?;
        let fresh = ApplicationState::initial(&self.seed(), now);
        self.store.save(&fresh, token.as_ref()).await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Drain-device status
    // -----------------------------------------------------------------------

    /// Resolve a raw device check-in against wall-clock time and retain it
    /// as the latest known device status. In-memory only; never persisted.
    pub fn record_device_report(&self, report: &DrainDeviceReport) -> DrainDeviceStatus {
        self.record_device_report_at(report, Utc::now())
    }

    pub fn record_device_report_at(
        &self,
        report: &DrainDeviceReport,
        now: DateTime<Utc>,
    ) -> DrainDeviceStatus {
        let status = report.resolve(now);
        *self
            .device_status
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(status.clone());
        status
    }

    pub fn latest_device_status(&self) -> Option<DrainDeviceStatus> {
        self.device_status
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
