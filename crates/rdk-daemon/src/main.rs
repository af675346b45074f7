//! rdk-daemon entry point.
//!
//! This file is intentionally thin: it loads the dev env file, sets up
//! tracing, and hands off to the library's `run`. All wiring lives in
//! `bootstrap.rs`; the cycle timers live in `tick.rs`.

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Local development reads .env.local; deployed processes get their env
    // from the service manager, so a missing file is not an error.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    rdk_daemon::run().await
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
