//! # Observability
//!
//! Logging bootstrap for the pub/sub delivery harness.
//!
//! Harness crates only emit `tracing` events. The binary calls
//! [`init_with_config`] once at startup, which installs:
//!
//! - a compact, human-readable layer on stderr, and
//! - optionally, a JSONL layer appended to a run log file so that a run can be
//!   triaged afterwards (`jq`, `lnav`, ...).
//!
//! ```rust,ignore
//! observability::init_with_config(observability::LogConfig {
//!     service_name: "pubsub-harness".into(),
//!     default_level: "debug".into(),
//!     ..Default::default()
//! })?;
//! tracing::info!("harness started");
//! ```

mod writer;

pub use writer::RunLogWriter;

use std::io;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the emitting program, logged once at startup.
    pub service_name: String,

    /// Default log level filter (e.g., "debug", "info", "warn").
    /// Can be overridden by `RUST_LOG` environment variable.
    pub default_level: String,

    /// JSONL run log. `None` disables the file layer.
    pub log_path: Option<PathBuf>,

    /// Emit ANSI colours on stderr.
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: default_log_path(),
            ansi: true,
        }
    }
}

/// `~/.pubsub-harness/logs/runs.jsonl`, if a home directory exists.
pub fn default_log_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".pubsub-harness").join("logs").join("runs.jsonl"))
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Initialize logging with custom configuration.
///
/// Fails if the run log cannot be opened. Installing a second global
/// subscriber is a no-op.
pub fn init_with_config(config: LogConfig) -> io::Result<()> {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .with_writer(io::stderr)
        .with_ansi(config.ansi)
        .with_filter(env_filter(&config.default_level));

    let file_layer = match &config.log_path {
        Some(path) => {
            let writer = RunLogWriter::open(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true)
                    .with_writer(writer)
                    .with_filter(env_filter(&config.default_level)),
            )
        }
        None => None,
    };

    let installed = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .is_ok();

    if installed {
        tracing::info!(
            service = %config.service_name,
            log_path = ?config.log_path,
            "observability initialized"
        );
    }

    Ok(())
}
