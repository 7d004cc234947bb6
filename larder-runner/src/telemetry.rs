//! Tracing subscriber setup for the `larder` binary.
//!
//! Logs go to stderr; stdout is reserved for the JSON report.

use larder_core::{ConfigError, LarderError, LarderResult};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::{LogFormat, RunnerConfig};

/// Install the global subscriber. `RUST_LOG` wins over `log_filter`.
pub fn init_tracing(config: &RunnerConfig) -> LarderResult<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_filter).map_err(|e| {
            LarderError::Config(ConfigError::InvalidValue {
                field: "log_filter".to_string(),
                value: config.log_filter.clone(),
                reason: e.to_string(),
            })
        })?,
    };

    let fmt_layer = match config.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| {
            LarderError::Config(ConfigError::Logging {
                reason: format!("Failed to init subscriber: {}", e),
            })
        })?;

    tracing::debug!(format = ?config.log_format, "Tracing initialized");
    Ok(())
}
