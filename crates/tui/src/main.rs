mod app;

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};

use tally_core::config::{self, AppConfig};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let written = config::ensure_default_config()?;
    let config = AppConfig::load()?;
    init_logging(&config)?;
    if let Some(path) = written {
        tracing::info!(path = %path.display(), "Default configuration written");
    }
    tracing::info!(
        reset_delay_ms = config.reset_delay_ms,
        history_display = config.history_display,
        "Starting tally"
    );

    let mut app = app::TallyApp::new(config);
    app.run().await
}

fn init_logging(config: &AppConfig) -> Result<()> {
    let log_dir = if config.log_dir.is_absolute() {
        config.log_dir.clone()
    } else {
        std::env::current_dir()?.join(&config.log_dir)
    };
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create {}", log_dir.display()))?;
    let log_path = log_dir.join("tally.log");
    // Opened once up front; the alternate screen owns stdout.
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(std::sync::Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}
