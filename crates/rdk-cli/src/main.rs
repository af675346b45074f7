//! Operational CLI (`rdk`) for the roof-drain reconciliation engine.
//!
//! Every command is one shot: load config, do the thing, print `key=value`
//! lines (plus a JSON document where there is one) and exit. State-touching
//! commands require the durable store; there is no in-memory fallback here
//! because a fresh process would just throw the state away.

use std::io::Read;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use rdk_config::EngineConfig;
use rdk_engine::BalanceEngine;
use rdk_schemas::DrainDeviceReport;
use rdk_store::{PgStateStore, ENV_DB_URL};
use rdk_telemetry::TracingSink;
use rdk_weather::{HttpWeatherSource, UnconfiguredSource, WeatherSource};

#[derive(Parser)]
#[command(name = "rdk")]
#[command(about = "RoofDrain Keeper CLI", long_about = None)]
struct Cli {
    /// Layered config paths in merge order (base first); repeatable.
    #[arg(long = "config", global = true)]
    config_paths: Vec<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// State document commands
    State {
        #[command(subcommand)]
        cmd: StateCmd,
    },

    /// Manual water-level calibration
    Water {
        #[command(subcommand)]
        cmd: WaterCmd,
    },

    /// Run one reconciliation cycle and exit
    Cycle {
        #[command(subcommand)]
        cmd: CycleCmd,
    },

    /// Drain-device check-in utilities
    Device {
        #[command(subcommand)]
        cmd: DeviceCmd,
    },

    /// Configuration utilities
    Config {
        #[command(subcommand)]
        cmd: ConfigCmd,
    },

    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },
}

#[derive(Subcommand)]
enum StateCmd {
    /// Print the current state document
    Show,

    /// Replace the document with a freshly seeded one
    Reset,
}

#[derive(Subcommand)]
enum WaterCmd {
    /// Set every puddle's estimated volume to the given gallons
    Set {
        #[arg(long)]
        gallons: f64,
    },
}

#[derive(Subcommand)]
enum CycleCmd {
    /// One drain-report cycle; prints the per-puddle decisions
    Drain,

    /// One weather-poll cycle against the configured stations
    Weather,
}

#[derive(Subcommand)]
enum DeviceCmd {
    /// Resolve one raw device check-in (JSON) against wall-clock time
    Ingest {
        /// Read the report from this file instead of stdin
        #[arg(long)]
        file: Option<String>,
    },
}

#[derive(Subcommand)]
enum ConfigCmd {
    /// Compute the layered config hash + print canonical JSON
    Hash,
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Apply SQL migrations
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Local development reads .env.local; a missing file is not an error.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::State { cmd } => match cmd {
            StateCmd::Show => {
                let (config, engine) = build_engine(&cli.config_paths, SourceMode::None).await?;
                let state = engine.current_state().await?;
                println!("state_key={}", config.engine.state_key);
                println!("{}", serde_json::to_string_pretty(&state)?);
            }
            StateCmd::Reset => {
                let (config, engine) = build_engine(&cli.config_paths, SourceMode::None).await?;
                engine.reset().await?;
                println!("state_reset=true state_key={}", config.engine.state_key);
            }
        },

        Commands::Water { cmd } => match cmd {
            WaterCmd::Set { gallons } => {
                let (_, engine) = build_engine(&cli.config_paths, SourceMode::None).await?;
                engine.set_water(gallons).await?;
                println!("water_set=true gallons={gallons}");
            }
        },

        Commands::Cycle { cmd } => match cmd {
            CycleCmd::Drain => {
                let (_, engine) = build_engine(&cli.config_paths, SourceMode::None).await?;
                let decisions = engine.run_drain_report_cycle().await?;
                println!("cycle=drain applied=true puddles={}", decisions.len());
                println!("{}", serde_json::to_string_pretty(&decisions)?);
            }
            CycleCmd::Weather => {
                let (_, engine) = build_engine(&cli.config_paths, SourceMode::Http).await?;
                engine.run_weather_poll_cycle().await?;
                println!("cycle=weather applied=true");
            }
        },

        Commands::Device { cmd } => match cmd {
            DeviceCmd::Ingest { file } => {
                let raw = match file {
                    Some(path) => std::fs::read_to_string(&path)
                        .with_context(|| format!("read device report: {path}"))?,
                    None => {
                        let mut buf = String::new();
                        std::io::stdin()
                            .read_to_string(&mut buf)
                            .context("read device report from stdin")?;
                        buf
                    }
                };
                let report: DrainDeviceReport =
                    serde_json::from_str(&raw).context("device report decode failed")?;
                let status = report.resolve(Utc::now());
                println!("{}", serde_json::to_string_pretty(&status)?);
            }
        },

        Commands::Config { cmd } => match cmd {
            ConfigCmd::Hash => {
                let path_refs = require_config_paths(&cli.config_paths)?;
                let loaded = rdk_config::load_layered_yaml(&path_refs)?;
                println!("config_hash={}", loaded.config_hash);
                println!("{}", loaded.canonical_json);
            }
        },

        Commands::Db { cmd } => {
            let pool = rdk_store::connect_from_env().await?;
            match cmd {
                DbCmd::Status => {
                    let s = rdk_store::status(&pool).await?;
                    println!("db_ok={} has_state_table={}", s.ok, s.has_state_table);
                }
                DbCmd::Migrate => {
                    rdk_store::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    // Quiet by default so stdout stays parseable; RUST_LOG opts in.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Which weather source the command gets. Only `cycle weather` fetches, so
/// only it pays the cost of a configured base URL and API key.
enum SourceMode {
    Http,
    None,
}

fn require_config_paths(paths: &[String]) -> Result<Vec<&str>> {
    if paths.is_empty() {
        bail!("at least one --config path is required for this command");
    }
    Ok(paths.iter().map(String::as_str).collect())
}

async fn build_engine(
    config_paths: &[String],
    source_mode: SourceMode,
) -> Result<(EngineConfig, BalanceEngine)> {
    let path_refs = require_config_paths(config_paths)?;
    let loaded = rdk_config::load_layered_yaml(&path_refs)?;
    let config = EngineConfig::from_loaded(&loaded)?;

    if std::env::var(ENV_DB_URL).is_err() {
        bail!("{ENV_DB_URL} is not set; this command needs the durable state store");
    }
    let pool = rdk_store::connect_from_env().await?;
    let store = PgStateStore::new(pool, config.engine.state_key.clone(), config.state_seed());

    let source: Arc<dyn WeatherSource> = match source_mode {
        SourceMode::Http => {
            if config.weather.base_url.trim().is_empty() {
                bail!("weather.base_url is not configured");
            }
            let api_key = config.weather.resolve_api_key()?;
            Arc::new(HttpWeatherSource::new(
                api_key,
                config.weather.base_url.clone(),
                config.weather.request_timeout(),
            )?)
        }
        SourceMode::None => Arc::new(UnconfiguredSource),
    };

    let engine = BalanceEngine::new(
        Arc::new(store),
        source,
        Arc::new(TracingSink),
        config.roof.puddles.clone(),
        config.weather.stations.clone(),
    );
    Ok((config, engine))
}
