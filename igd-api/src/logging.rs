//! Logging bootstrap for applications built on this crate
//!
//! The library itself only emits `tracing` events; nothing is printed until
//! the application installs a subscriber, either directly or through the
//! helpers here.

use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Logging mode for different use cases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingMode {
    /// No output
    Silent,
    /// Compact stderr output
    Development,
    /// Verbose diagnostics with source locations
    Debug,
}

/// Logging configuration error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),
}

/// Initialize logging with the specified mode
///
/// # Examples
///
/// ```rust,ignore
/// igd_api::logging::init_logging(LoggingMode::Development)?;
/// ```
///
/// # Environment Variables
///
/// - `IGD_LOG_LEVEL`: Override the filter (e.g. `debug`, `igd_discovery=trace`)
/// - `RUST_LOG`: Used when `IGD_LOG_LEVEL` is not set
pub fn init_logging(mode: LoggingMode) -> Result<(), LoggingError> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    match mode {
        LoggingMode::Silent => Ok(()),
        LoggingMode::Development => {
            let filter = create_env_filter("info");

            Registry::default()
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(false)
                        .compact(),
                )
                .with(filter)
                .try_init()
                .map_err(|e| LoggingError::TracingInit(e.to_string()))
        }
        LoggingMode::Debug => {
            let filter = create_env_filter("debug");

            Registry::default()
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .pretty()
                        .with_thread_ids(true)
                        .with_file(true)
                        .with_line_number(true),
                )
                .with(filter)
                .try_init()
                .map_err(|e| LoggingError::TracingInit(e.to_string()))
        }
    }
}

/// Initialize logging from `IGD_LOG_MODE` (`silent`, `development`, `debug`).
///
/// Unset or unknown values mean silent.
pub fn init_logging_from_env() -> Result<(), LoggingError> {
    let mode = std::env::var("IGD_LOG_MODE")
        .ok()
        .and_then(|value| parse_mode(&value))
        .unwrap_or(LoggingMode::Silent);

    init_logging(mode)
}

fn parse_mode(value: &str) -> Option<LoggingMode> {
    match value.trim().to_ascii_lowercase().as_str() {
        "silent" => Some(LoggingMode::Silent),
        "development" | "dev" => Some(LoggingMode::Development),
        "debug" => Some(LoggingMode::Debug),
        _ => None,
    }
}

/// `IGD_LOG_LEVEL`, then `RUST_LOG`, then `default_level`
fn create_env_filter(default_level: &str) -> EnvFilter {
    if let Ok(level) = std::env::var("IGD_LOG_LEVEL") {
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
