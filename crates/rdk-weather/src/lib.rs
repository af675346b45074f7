//! rdk-weather
//!
//! Weather source boundary and per-source observation reconciliation.
//!
//! This crate owns the source abstraction ([`WeatherSource`]), the HTTP
//! implementation, and the pure fold that turns per-station readings into
//! one rainfall/temperature sample ([`aggregate::fold_readings`]). It does
//! **not** touch the store; callers (the orchestrator) load state, run the
//! fold, and persist.

pub mod aggregate;

use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// The most recent conditions reported by one weather station.
#[derive(Debug, Clone, PartialEq)]
pub struct StationReading {
    /// Accumulated precipitation over the trailing hour, inches.
    pub precipitation_inches_last_hour: f64,
    pub temperature_c: f64,
    /// When the station took the observation, not when we fetched it.
    pub observation_time: DateTime<Utc>,
}

/// One station's reading paired with the station it came from, ready for
/// [`aggregate::fold_readings`].
#[derive(Debug, Clone, PartialEq)]
pub struct SourceReading {
    pub station: String,
    pub reading: StationReading,
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors a [`WeatherSource`] implementation may return.
#[derive(Debug)]
pub enum SourceError {
    /// Network or transport failure, including client-side timeouts.
    Transport(String),
    /// The upstream API answered with a non-success status.
    Api { status: u16, message: String },
    /// A response payload could not be decoded.
    Decode(String),
    /// A required configuration value (e.g. API key) is missing or invalid.
    Config(String),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Transport(msg) => write!(f, "transport error: {msg}"),
            SourceError::Api { status, message } => {
                write!(f, "weather api error status={status}: {message}")
            }
            SourceError::Decode(msg) => write!(f, "decode error: {msg}"),
            SourceError::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl std::error::Error for SourceError {}

// ---------------------------------------------------------------------------
// Source trait
// ---------------------------------------------------------------------------

/// Upstream weather provider contract.
///
/// Object-safe so callers can hold an `Arc<dyn WeatherSource>` without
/// knowing the concrete type; `Send + Sync` so per-station fetches can fan
/// out across tasks.
#[async_trait::async_trait]
pub trait WeatherSource: fmt::Debug + Send + Sync {
    /// Human-readable name identifying this source (e.g. `"http"`).
    fn source_name(&self) -> &'static str;

    /// Fetch the current conditions for one station.
    async fn fetch_current(&self, station: &str) -> Result<StationReading, SourceError>;
}

/// Outcome of one station's fetch within a poll cycle. Failures stay per
/// station; one station's error never aborts the cycle.
#[derive(Debug)]
pub struct StationObservation {
    pub station: String,
    pub outcome: Result<StationReading, SourceError>,
}

/// Fetch all stations in parallel. Results arrive as an unordered set as far
/// as callers are concerned; each element carries its own success or error.
pub async fn collect_observations(
    source: &dyn WeatherSource,
    stations: &[String],
) -> Vec<StationObservation> {
    let fetches = stations.iter().map(|station| async move {
        StationObservation {
            station: station.clone(),
            outcome: source.fetch_current(station).await,
        }
    });
    futures_util::future::join_all(fetches).await
}

// ---------------------------------------------------------------------------
// HTTP source
// ---------------------------------------------------------------------------

/// HTTP-backed weather source.
///
/// One GET per station: `{base_url}/current?station={id}&apikey={key}`.
/// The API key is resolved by the caller (from the environment, per the
/// config layer's indirection rule) and passed in; do not log it.
#[derive(Debug, Clone)]
pub struct HttpWeatherSource {
    api_key: String,
    http: reqwest::Client,
    base_url: String,
}

impl HttpWeatherSource {
    /// `timeout` bounds every station fetch; a fetch that exceeds it fails
    /// like any other transport error.
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Config(format!("http client build failed: {e}")))?;
        Ok(Self {
            api_key,
            http,
            base_url,
        })
    }

    fn build_current_url(&self) -> String {
        format!("{}/current", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait::async_trait]
impl WeatherSource for HttpWeatherSource {
    fn source_name(&self) -> &'static str {
        "http"
    }

    async fn fetch_current(&self, station: &str) -> Result<StationReading, SourceError> {
        let resp = self
            .http
            .get(self.build_current_url())
            .query(&[("station", station), ("apikey", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(SourceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: CurrentConditionsDto = resp
            .json()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))?;

        // Stations report RFC 3339; some upstream relays still emit RFC 2822.
        let observation_time = DateTime::parse_from_rfc3339(&body.observation_timestamp)
            .or_else(|_| DateTime::parse_from_rfc2822(&body.observation_timestamp))
            .map_err(|_| {
                SourceError::Decode(format!(
                    "observation timestamp parse failed: {}",
                    body.observation_timestamp
                ))
            })?
            .with_timezone(&Utc);

        Ok(StationReading {
            precipitation_inches_last_hour: body.precipitation_last_hour,
            temperature_c: body.temperature_celsius,
            observation_time,
        })
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
struct CurrentConditionsDto {
    precipitation_last_hour: f64,
    temperature_celsius: f64,
    observation_timestamp: String,
}

/// Stand-in source for deployments without a weather section. Every fetch
/// fails with a `Config` error, so a weather-poll cycle over it reports all
/// sources unavailable and leaves state untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredSource;

#[async_trait::async_trait]
impl WeatherSource for UnconfiguredSource {
    fn source_name(&self) -> &'static str {
        "unconfigured"
    }

    async fn fetch_current(&self, _station: &str) -> Result<StationReading, SourceError> {
        Err(SourceError::Config(
            "weather source not configured".to_string(),
        ))
    }
}

// ---------------------------------------------------------------------------
// Tests (mock HTTP server, no live network)
// ---------------------------------------------------------------------------
