//! Logging configuration using tracing

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::settings::LoggingSettings;

/// Pick the filter: `--verbose`, then `RUST_LOG`, then the config file, then "info"
fn build_filter(verbose: bool, configured: Option<&str>) -> anyhow::Result<EnvFilter> {
    if verbose {
        return Ok(EnvFilter::new("debug"));
    }
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    match configured {
        Some(level) => Ok(EnvFilter::try_new(level)?),
        None => Ok(EnvFilter::new("info")),
    }
}

/// Initialize the logging system. Logs go to stderr so the server owns stdout.
pub fn init(verbose: bool, json: bool, settings: &LoggingSettings) -> anyhow::Result<()> {
    let filter = build_filter(verbose, settings.level.as_deref())?;

    if json || settings.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()?;
    }

    Ok(())
}
