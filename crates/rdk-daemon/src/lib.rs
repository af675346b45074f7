//! rdk-daemon library target.
//!
//! Exposes the bootstrap and cycle-timer plumbing for integration tests.
//! The binary `main.rs` depends on this library target.

pub mod bootstrap;
pub mod tick;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use rdk_config::EngineConfig;
use rdk_engine::BalanceEngine;
use rdk_telemetry::TracingSink;
use tracing::{info, warn};

use bootstrap::StoreKind;

/// Full daemon lifecycle: config → store → engine → cycle timers → ctrl-c.
pub async fn run() -> anyhow::Result<()> {
    let paths = bootstrap::config_paths_from_env()?;
    let path_refs: Vec<&str> = paths.iter().map(String::as_str).collect();
    let loaded = rdk_config::load_layered_yaml(&path_refs)?;
    let config = EngineConfig::from_loaded(&loaded)?;
    info!(
        config_hash = %loaded.config_hash,
        state_key = %config.engine.state_key,
        puddles = config.roof.puddles.len(),
        stations = config.weather.stations.len(),
        "configuration loaded"
    );

    let (store, kind) =
        bootstrap::build_store(&config.engine.state_key, config.state_seed()).await?;
    if kind == StoreKind::Memory {
        warn!("RDK_DATABASE_URL not set; state lives in process memory and dies with it");
    }

    let source = bootstrap::build_weather_source(&config.weather)?;
    let engine = Arc::new(BalanceEngine::new(
        store,
        source,
        Arc::new(TracingSink),
        config.roof.puddles.clone(),
        config.weather.stations.clone(),
    ));

    let drain = tick::spawn_drain_report_tick(
        Arc::clone(&engine),
        Duration::from_secs(config.schedule.drain_report_minutes * 60),
    );
    let weather = tick::spawn_weather_poll_tick(
        engine,
        Duration::from_secs(config.schedule.weather_poll_minutes * 60),
    );

    info!(
        drain_report_minutes = config.schedule.drain_report_minutes,
        weather_poll_minutes = config.schedule.weather_poll_minutes,
        "rdk-daemon running; ctrl-c to stop"
    );
    tokio::signal::ctrl_c()
        .await
        .context("ctrl-c handler failed")?;

    info!("shutdown signal received; stopping cycle timers");
    drain.abort();
    weather.abort();
    Ok(())
}
