//! Configuration, core errors, and logging bootstrap for the pub/sub harness.

mod config;
mod error;
mod logging;

pub use config::{
    Config, DEFAULT_LOG_LEVEL, DEFAULT_PROTOCOL, DEFAULT_SUBSCRIBER_APP_NAME, KNOWN_CHANNEL_NAMES,
};
pub use error::{CoreError, CoreResult};
pub use logging::init_logging;
