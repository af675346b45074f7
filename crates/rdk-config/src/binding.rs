//! Typed binding from the merged config document to [`EngineConfig`].
//!
//! YAML keys are snake_case and bind 1:1 onto these structs. Every section
//! is optional with serviceable defaults so a partial overlay file stands on
//! its own in tests and dev runs.

use anyhow::{bail, Context, Result};
use rdk_schemas::{PuddleConfig, StateSeed};
use serde::Deserialize;
use std::time::Duration;

use crate::LoadedConfig;

/// Fallback env var name for the weather API key when the config does not
/// name one.
pub const DEFAULT_WEATHER_API_KEY_ENV: &str = "RDK_WEATHER_API_KEY";

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub roof: RoofSection,
    #[serde(default)]
    pub weather: WeatherSection,
    #[serde(default)]
    pub schedule: ScheduleSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineSection {
    /// Deployment/environment name; keys the persisted state document.
    #[serde(default = "default_state_key")]
    pub state_key: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoofSection {
    #[serde(default)]
    pub puddles: Vec<PuddleConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherSection {
    #[serde(default)]
    pub base_url: String,
    /// Name of the environment variable holding the API key. The key itself
    /// never appears in config files.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default)]
    pub stations: Vec<String>,
    #[serde(default = "default_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleSection {
    #[serde(default = "default_cycle_minutes")]
    pub drain_report_minutes: u64,
    #[serde(default = "default_cycle_minutes")]
    pub weather_poll_minutes: u64,
}

fn default_state_key() -> String {
    "development".to_string()
}

fn default_api_key_env() -> String {
    DEFAULT_WEATHER_API_KEY_ENV.to_string()
}

fn default_timeout_seconds() -> u64 {
    10
}

fn default_cycle_minutes() -> u64 {
    60
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            state_key: default_state_key(),
        }
    }
}

impl Default for WeatherSection {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key_env: default_api_key_env(),
            stations: Vec::new(),
            request_timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl Default for ScheduleSection {
    fn default() -> Self {
        Self {
            drain_report_minutes: default_cycle_minutes(),
            weather_poll_minutes: default_cycle_minutes(),
        }
    }
}

impl EngineConfig {
    /// Bind the merged document. Unknown keys are ignored; missing sections
    /// fall back to defaults.
    pub fn from_loaded(loaded: &LoadedConfig) -> Result<Self> {
        serde_json::from_value(loaded.config_json.clone())
            .context("config does not bind to the engine shape")
    }

    /// Name lists driving initial-state creation in the store.
    pub fn state_seed(&self) -> StateSeed {
        StateSeed::new(
            self.roof.puddles.iter().map(|p| p.name.clone()).collect(),
            self.weather.stations.clone(),
        )
    }
}

impl WeatherSection {
    /// Resolve the API key from the environment variable this section names.
    ///
    /// Errors carry the variable NAME only; the value must never reach a
    /// log line or an error message.
    pub fn resolve_api_key(&self) -> Result<String> {
        match std::env::var(&self.api_key_env) {
            Ok(v) if !v.trim().is_empty() => Ok(v),
            _ => bail!(
                "WEATHER_KEY_MISSING: required env var '{}' is not set or empty",
                self.api_key_env
            ),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
