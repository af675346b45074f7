//! Scripted weather source.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use rdk_weather::{SourceError, StationReading, WeatherSource};

/// A [`WeatherSource`] that answers each fetch from a per-station queue.
///
/// Successive polls of the same station pop successive entries, so a
/// scenario can script "station went quiet on the second poll" without any
/// network. An exhausted queue answers with a `Config` error naming the
/// station, which fails the scenario loudly instead of silently looping the
/// last reading.
#[derive(Debug)]
pub struct ScriptedWeatherSource {
    scripts: Mutex<HashMap<String, VecDeque<Result<StationReading, String>>>>,
}

impl ScriptedWeatherSource {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
        }
    }

    /// Queue a successful reading for `station`'s next unanswered fetch.
    pub fn enqueue_reading(&self, station: &str, reading: StationReading) {
        self.scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(station.to_string())
            .or_default()
            .push_back(Ok(reading));
    }

    /// Queue a transport failure for `station`'s next unanswered fetch.
    pub fn enqueue_failure(&self, station: &str, message: &str) {
        self.scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(station.to_string())
            .or_default()
            .push_back(Err(message.to_string()));
    }
}

impl Default for ScriptedWeatherSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl WeatherSource for ScriptedWeatherSource {
    fn source_name(&self) -> &'static str {
        "scripted"
    }

    async fn fetch_current(&self, station: &str) -> Result<StationReading, SourceError> {
        let next = self
            .scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(station)
            .and_then(VecDeque::pop_front);

        match next {
            Some(Ok(reading)) => Ok(reading),
            Some(Err(message)) => Err(SourceError::Transport(message)),
            None => Err(SourceError::Config(format!(
                "script exhausted for station {station}"
            ))),
        }
    }
}
