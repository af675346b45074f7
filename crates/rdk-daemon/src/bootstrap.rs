//! Startup wiring: config-path discovery, store selection, source assembly.
//!
//! Everything here reads the environment exactly once at boot; nothing
//! re-reads env vars mid-run.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use rdk_config::WeatherSection;
use rdk_schemas::StateSeed;
use rdk_store::{MemoryStateStore, PgStateStore, StateStore, ENV_DB_URL};
use rdk_weather::{HttpWeatherSource, WeatherSource};

/// Colon-separated list of layered YAML config paths, earliest first.
pub const ENV_CONFIG_PATHS: &str = "RDK_CONFIG";

/// Which backend `build_store` selected, for the boot log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Postgres,
    Memory,
}

pub fn config_paths_from_env() -> Result<Vec<String>> {
    let raw = std::env::var(ENV_CONFIG_PATHS)
        .with_context(|| format!("missing env var {ENV_CONFIG_PATHS} (colon-separated config paths)"))?;
    let paths = split_config_paths(&raw);
    if paths.is_empty() {
        bail!("{ENV_CONFIG_PATHS} is set but names no config files");
    }
    Ok(paths)
}

/// Split the colon-separated path list. Blank segments (doubled or trailing
/// colons) are dropped rather than treated as a file named "".
pub fn split_config_paths(raw: &str) -> Vec<String> {
    raw.split(':')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Postgres when `RDK_DATABASE_URL` is set, memory otherwise. The caller
/// decides how loudly to warn about the memory fallback.
pub async fn build_store(
    state_key: &str,
    seed: StateSeed,
) -> Result<(Arc<dyn StateStore>, StoreKind)> {
    if std::env::var(ENV_DB_URL).is_ok() {
        let pool = rdk_store::connect_from_env().await?;
        let store = PgStateStore::new(pool, state_key, seed);
        Ok((Arc::new(store), StoreKind::Postgres))
    } else {
        let store = MemoryStateStore::new(state_key, seed);
        Ok((Arc::new(store), StoreKind::Memory))
    }
}

/// HTTP weather source from the config section. Resolves the API key from
/// the env var the section names; the key itself stays out of logs and
/// error messages.
pub fn build_weather_source(weather: &WeatherSection) -> Result<Arc<dyn WeatherSource>> {
    if weather.base_url.trim().is_empty() {
        bail!("weather.base_url is not configured");
    }
    let api_key = weather.resolve_api_key()?;
    let source = HttpWeatherSource::new(api_key, weather.base_url.clone(), weather.request_timeout())
        .context("weather source construction failed")?;
    Ok(Arc::new(source))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_drops_blank_segments() {
        assert_eq!(
            split_config_paths("base.yaml:overlay.yaml"),
            vec!["base.yaml", "overlay.yaml"]
        );
        assert_eq!(split_config_paths("only.yaml"), vec!["only.yaml"]);
        assert_eq!(
            split_config_paths("a.yaml::b.yaml:"),
            vec!["a.yaml", "b.yaml"]
        );
        assert!(split_config_paths("").is_empty());
        assert!(split_config_paths(" : : ").is_empty());
    }

    #[test]
    fn missing_base_url_is_rejected_before_key_resolution() {
        let section = WeatherSection::default();
        let err = build_weather_source(&section).expect_err("no base url");
        assert!(err.to_string().contains("base_url"), "got: {err}");
    }
}
