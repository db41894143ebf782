//! Tracing subscriber setup driven by [`LoggingConfig`].

use crate::config::LoggingConfig;
use crate::error::{AnvilError, AnvilResult};

/// Install a global `tracing` subscriber built from `config`.
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> AnvilResult<()> {
    let builder = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::from(config.level))
        .with_target(config.include_targets);

    let result = match (config.json_format, config.include_timestamps) {
        (true, true) => builder.json().try_init(),
        (true, false) => builder.json().without_time().try_init(),
        (false, true) => builder.with_ansi(config.colored).try_init(),
        (false, false) => builder.with_ansi(config.colored).without_time().try_init(),
    };

    result.map_err(|e| {
        AnvilError::config(format!("failed to install tracing subscriber: {}", e))
    })
}
