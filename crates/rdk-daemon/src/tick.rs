//! Background cycle timers.
//!
//! Each timer owns one cycle kind and runs it forever; the first tick fires
//! immediately, so a freshly booted daemon reconciles without waiting out
//! the full interval. A conflict means another instance won the save; the
//! cycle is dropped entirely and the timer waits for its next tick; there is
//! no retry inside an interval.

use std::sync::Arc;
use std::time::Duration;

use rdk_engine::BalanceEngine;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

pub fn spawn_drain_report_tick(engine: Arc<BalanceEngine>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match engine.run_drain_report_cycle().await {
                Ok(decisions) => {
                    let active = decisions.iter().filter(|d| d.activate).count();
                    info!(
                        puddles = decisions.len(),
                        active, "drain-report cycle applied"
                    );
                }
                Err(e) if e.is_conflict() => {
                    warn!("drain-report cycle dropped: {e}");
                }
                Err(e) => {
                    error!("drain-report cycle failed: {e}");
                }
            }
        }
    })
}

pub fn spawn_weather_poll_tick(engine: Arc<BalanceEngine>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match engine.run_weather_poll_cycle().await {
                Ok(()) => info!("weather-poll cycle applied"),
                Err(e) if e.is_conflict() => {
                    warn!("weather-poll cycle dropped: {e}");
                }
                Err(e) => {
                    error!("weather-poll cycle failed: {e}");
                }
            }
        }
    })
}
