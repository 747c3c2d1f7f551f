use std::{env, fs::File, path::PathBuf};

use color_eyre::{Result, eyre::Context};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::Config;

/// Environment variable that overrides the configured log filter, enabling logs even if disabled on the config
pub const LOG_ENV_VAR: &str = "CLOUDSCOPE_LOG";

/// Resolves the log path and filter based on the config and the [`LOG_ENV_VAR`] environment variable.
///
/// If logging is disabled, returns `None` for the filter.
pub fn resolve_path_and_filter(config: &Config) -> (PathBuf, Option<String>) {
    let env_filter = env::var(LOG_ENV_VAR).ok().filter(|f| !f.trim().is_empty());
    let logs_path = config.data_dir.join("cloudscope.log");
    let filter = (config.logs.enabled || env_filter.is_some())
        .then(move || env_filter.unwrap_or_else(|| config.logs.filter.clone()));
    (logs_path, filter)
}

/// Initializes the tracing subscriber to output logs to a file.
///
/// Stdout belongs to the TUI, so logs are never written there.
pub fn init(logs_path: &PathBuf, filter: Option<String>) -> Result<()> {
    let Some(filter) = filter else {
        return Ok(());
    };
    if let Some(parent) = logs_path.parent() {
        std::fs::create_dir_all(parent)
            .wrap_err_with(|| format!("Couldn't create the data dir: {}", parent.display()))?;
    }
    let log_file =
        File::create(logs_path).wrap_err_with(|| format!("Couldn't create the log file: {}", logs_path.display()))?;
    let env_filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::WARN.into())
        .parse(filter)
        .wrap_err("Couldn't parse the log filter")?;
    let file_subscriber = fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .with_writer(log_file)
        .with_target(true)
        .with_ansi(false)
        .with_filter(env_filter);
    tracing_subscriber::registry()
        .with(file_subscriber)
        .with(ErrorLayer::default())
        .init();
    Ok(())
}
