use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use toolshare_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) -> Result<()> {
    use toolshare_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    match config.logging.format {
        Compact => builder.compact().try_init(),
        Pretty => builder.pretty().try_init(),
        Json => builder.json().try_init(),
    }
    .map_err(|error| anyhow!(error))
}

fn setup_logging() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default()).context("configuration did not load")?;
    init_logging(&config).context("failed to install the log subscriber")
}

fn main() -> ExitCode {
    // stdout carries the command's JSON; logs and this notice go to stderr.
    if let Err(error) = setup_logging() {
        eprintln!("logging disabled: {error:#}");
    }

    toolshare_cli::run()
}
