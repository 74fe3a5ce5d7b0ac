//! Tracing subscriber setup for hosts that do not install their own.

use liveupdate_core::{ConfigError, LiveUpdateResult};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding the filter directives.
pub const LOG_ENV_VAR: &str = "LIVEUPDATE_LOG";

/// Filter used when `LIVEUPDATE_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "liveupdate=info,warn";

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event.
    #[default]
    Json,
    /// Multi-line human-readable output.
    Pretty,
}

/// Install the global subscriber.
///
/// Call once at startup. A second call, or a call after the host installed
/// its own subscriber, fails with a config error.
pub fn init_tracing(format: LogFormat) -> LiveUpdateResult<()> {
    let env_filter =
        EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init(),
    };
    result.map_err(|e| ConfigError::InvalidValue {
        field: "tracing".to_string(),
        value: format!("{:?}", format),
        reason: format!("Failed to init subscriber: {}", e),
    })?;

    tracing::info!(format = ?format, "Tracing initialized");
    Ok(())
}
