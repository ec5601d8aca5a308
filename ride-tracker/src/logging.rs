//! Logging setup for ride tracking applications
//!
//! Libraries in this workspace only emit `tracing` events; binaries choose how
//! they are rendered by calling one of the initialisers here once at startup.

use tracing_subscriber::{fmt, EnvFilter, Registry};

use crate::error::TrackerError;

/// Logging mode for different use cases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingMode {
    /// No output
    Silent,
    /// Compact stderr output
    Development,
    /// Verbose diagnostics with source locations
    Debug,
    /// One JSON object per line
    Json,
}

impl LoggingMode {
    /// Parse a mode name as used in `RIDE_LOG_MODE`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "silent" => Some(LoggingMode::Silent),
            "development" | "dev" => Some(LoggingMode::Development),
            "debug" => Some(LoggingMode::Debug),
            "json" => Some(LoggingMode::Json),
            _ => None,
        }
    }
}

/// Initialize logging with the specified mode and default level
///
/// # Environment Variables
///
/// - `RIDE_LOG_LEVEL`: Override the filter (error, warn, info, debug, trace,
///   or any `EnvFilter` directive such as `status_poller=debug`)
/// - `RUST_LOG`: Used when `RIDE_LOG_LEVEL` is not set
pub fn init_logging_with_level(mode: LoggingMode, default_level: &str) -> Result<(), TrackerError> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    match mode {
        LoggingMode::Silent => Ok(()),
        LoggingMode::Development => {
            let filter = create_env_filter(default_level);

            Registry::default()
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_thread_ids(false)
                        .with_file(false)
                        .with_line_number(false)
                        .with_writer(std::io::stderr)
                        .compact(),
                )
                .with(filter)
                .try_init()
                .map_err(|e| TrackerError::Logging(e.to_string()))
        }
        LoggingMode::Debug => {
            let filter = create_env_filter(default_level);

            Registry::default()
                .with(
                    fmt::layer()
                        .pretty()
                        .with_thread_ids(true)
                        .with_file(true)
                        .with_line_number(true)
                        .with_writer(std::io::stderr),
                )
                .with(filter)
                .try_init()
                .map_err(|e| TrackerError::Logging(e.to_string()))
        }
        LoggingMode::Json => {
            let filter = create_env_filter(default_level);

            Registry::default()
                .with(
                    fmt::layer()
                        .json()
                        .with_current_span(false)
                        .with_writer(std::io::stderr),
                )
                .with(filter)
                .try_init()
                .map_err(|e| TrackerError::Logging(e.to_string()))
        }
    }
}

/// Initialize logging with the mode's usual level (`info` or `debug`)
pub fn init_logging(mode: LoggingMode) -> Result<(), TrackerError> {
    let default_level = match mode {
        LoggingMode::Debug => "debug",
        _ => "info",
    };
    init_logging_with_level(mode, default_level)
}

/// Initialize logging from environment variables
///
/// Reads `RIDE_LOG_MODE` (`silent`, `development`, `debug`, `json`). Defaults to
/// development output when unset or unrecognised.
pub fn init_logging_from_env() -> Result<(), TrackerError> {
    let mode = std::env::var("RIDE_LOG_MODE")
        .ok()
        .and_then(|name| LoggingMode::from_name(&name))
        .unwrap_or(LoggingMode::Development);

    init_logging(mode)
}

/// Build the filter: `RIDE_LOG_LEVEL`, then `RUST_LOG`, then `default_level`
fn create_env_filter(default_level: &str) -> EnvFilter {
    if let Ok(level) = std::env::var("RIDE_LOG_LEVEL") {
        EnvFilter::new(level)
    } else if let Ok(rust_log) = std::env::var("RUST_LOG") {
        EnvFilter::new(rust_log)
    } else {
        EnvFilter::new(default_level)
    }
}

/// Check if a global subscriber has been installed
pub fn is_initialized() -> bool {
    tracing::dispatcher::has_been_set()
}
