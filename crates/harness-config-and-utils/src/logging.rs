//! Logging initialization for the harness binary.

use crate::CoreResult;
use observability::{default_log_path, LogConfig};

/// Initialize the logging system.
///
/// Writes compact logs to stderr and JSONL to `~/.pubsub-harness/logs/runs.jsonl`.
/// Setting `PUBSUB_HARNESS_NO_LOG_FILE` (to any value) disables the file layer.
pub fn init_logging(level: &str) -> CoreResult<()> {
    let log_path = match std::env::var_os("PUBSUB_HARNESS_NO_LOG_FILE") {
        Some(_) => None,
        None => default_log_path(),
    };

    observability::init_with_config(LogConfig {
        service_name: "pubsub-harness".into(),
        default_level: filter_directive(level),
        log_path,
        ansi: std::env::var_os("NO_COLOR").is_none(),
    })?;

    Ok(())
}

/// Normalize a user-supplied level into an `EnvFilter` directive.
fn filter_directive(level: &str) -> String {
    parse_level(level).as_str().to_ascii_lowercase()
}

/// Parse a log level string into a tracing Level.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
