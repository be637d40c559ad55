mod app;
mod big_digits;

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    sync::Mutex,
};

use billar_core::{
    api,
    config::{self, AppConfig},
    TableSettings,
};
use tracing::{info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    config::ensure_default_config()?;
    let config = AppConfig::load()?;
    let mut settings = TableSettings::load(config.preferences_store());
    let sync = api::connect(&config.api)?;
    if let Some(remote) = sync.fetch_table_config(&settings.table_id()).await {
        if let Err(err) = settings.save_table_config(&remote) {
            warn!("failed to persist remote table config: {err:#}");
        }
    }
    info!(
        table_id = %settings.table_id(),
        remote = sync.is_enabled(),
        "starting table terminal"
    );

    let mut app = app::BillarApp::new(settings, sync, config.tick_period());
    app.run().await
}

fn init_logging() -> Result<()> {
    let log_dir = std::env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("billar.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // File only: stdout belongs to the alternate screen.
    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}
