//! Configuration management for the harness.
//!
//! Layering, lowest to highest precedence: built-in defaults, an optional JSON
//! file, `PUBSUB_HARNESS_*` environment variables, then CLI flags (applied by
//! the binary).

use crate::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Protocol used when none is configured.
pub const DEFAULT_PROTOCOL: &str = "http";

/// App id the publisher proxies control calls to.
pub const DEFAULT_SUBSCRIBER_APP_NAME: &str = "pubsub-subscriber";

/// Channel names accepted in `relaxed_channels`.
pub const KNOWN_CHANNEL_NAMES: [&str; 5] = ["topic-a", "topic-b", "topic-c", "raw", "mqtt"];

/// Harness configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Publisher app base URL (`host:port` or full URL).
    pub publisher_url: String,
    /// Subscriber app base URL (`host:port` or full URL).
    pub subscriber_url: String,
    /// Protocols the subscriber is exercised with, one full pass each.
    pub protocols: Vec<String>,
    /// Remote app id used in control calls.
    pub subscriber_app_name: String,
    /// Messages published per channel per scenario.
    pub messages_per_topic: u32,
    /// Exclusive upper bound of the random first-message suffix.
    pub random_offset_max: u32,
    /// Publish throughput ceiling, requests per second.
    pub publish_rate_limit_rps: u32,
    /// Ledger polls before the final comparison.
    pub receive_message_retries: u32,
    /// Delay between ledger polls.
    pub poll_interval_ms: u64,
    /// Settle delay before checking the success scenario.
    pub success_settle_ms: u64,
    /// Settle delay before checking delivery under empty acknowledgements.
    pub empty_response_settle_ms: u64,
    /// Settle delay before redelivery / no-redelivery checks.
    pub redelivery_settle_ms: u64,
    /// GET probes per app before scenarios start.
    pub health_check_attempts: u32,
    /// Delay between GET probes.
    pub health_check_interval_ms: u64,
    /// Retries of the publish health check after the first attempt.
    pub publish_health_retries: u32,
    /// Delay between publish health check attempts.
    pub publish_health_interval_ms: u64,
    /// Per-request timeout.
    pub request_timeout_secs: u64,
    /// Channels whose mismatches are reported but do not fail a scenario.
    pub relaxed_channels: Vec<String>,
    /// Channel name to cloud event type. Listed channels publish their
    /// payload wrapped in a cloud event envelope.
    pub cloud_event_types: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            publisher_url: "localhost:3000".to_string(),
            subscriber_url: "localhost:3001".to_string(),
            protocols: vec![DEFAULT_PROTOCOL.to_string()],
            subscriber_app_name: DEFAULT_SUBSCRIBER_APP_NAME.to_string(),
            messages_per_topic: 100,
            random_offset_max: 99,
            publish_rate_limit_rps: 25,
            receive_message_retries: 10,
            poll_interval_ms: 5_000,
            success_settle_ms: 5_000,
            empty_response_settle_ms: 10_000,
            redelivery_settle_ms: 30_000,
            health_check_attempts: 60,
            health_check_interval_ms: 1_000,
            publish_health_retries: 10,
            publish_health_interval_ms: 5_000,
            request_timeout_secs: 30,
            relaxed_channels: Vec::new(),
            cloud_event_types: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load configuration from an optional file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> CoreResult<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        config.load_from_env();
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    fn load_from_env(&mut self) {
        if let Ok(log_level) = std::env::var("PUBSUB_HARNESS_LOG_LEVEL") {
            self.log_level = log_level;
        }
        if let Ok(url) = std::env::var("PUBSUB_HARNESS_PUBLISHER_URL") {
            self.publisher_url = url;
        }
        if let Ok(url) = std::env::var("PUBSUB_HARNESS_SUBSCRIBER_URL") {
            self.subscriber_url = url;
        }
        if let Ok(protocols) = std::env::var("PUBSUB_HARNESS_PROTOCOLS") {
            let parsed = split_list(&protocols);
            if !parsed.is_empty() {
                self.protocols = parsed;
            }
        }
    }

    /// Check value ranges that would make a run meaningless or unbounded.
    pub fn validate(&self) -> CoreResult<()> {
        if self.publish_rate_limit_rps == 0 {
            return Err(CoreError::Config(
                "publish_rate_limit_rps must be greater than zero".to_string(),
            ));
        }
        if self.receive_message_retries == 0 {
            return Err(CoreError::Config(
                "receive_message_retries must be greater than zero".to_string(),
            ));
        }
        if self.health_check_attempts == 0 {
            return Err(CoreError::Config(
                "health_check_attempts must be greater than zero".to_string(),
            ));
        }
        if self.random_offset_max == 0 {
            return Err(CoreError::Config(
                "random_offset_max must be greater than zero".to_string(),
            ));
        }
        if self.protocols.is_empty() || self.protocols.iter().any(|p| p.trim().is_empty()) {
            return Err(CoreError::Config(
                "at least one non-empty protocol is required".to_string(),
            ));
        }
        if let Some(unknown) = self
            .relaxed_channels
            .iter()
            .find(|name| !KNOWN_CHANNEL_NAMES.contains(&name.as_str()))
        {
            return Err(CoreError::Config(format!(
                "unknown relaxed channel '{unknown}', expected one of {KNOWN_CHANNEL_NAMES:?}"
            )));
        }
        for (name, event_type) in &self.cloud_event_types {
            if !KNOWN_CHANNEL_NAMES.contains(&name.as_str()) {
                return Err(CoreError::Config(format!(
                    "unknown cloud event channel '{name}', expected one of {KNOWN_CHANNEL_NAMES:?}"
                )));
            }
            if event_type.trim().is_empty() {
                return Err(CoreError::Config(format!(
                    "cloud event type for channel '{name}' must not be empty"
                )));
            }
        }
        self.publisher_url()?;
        self.subscriber_url()?;
        Ok(())
    }

    /// Publisher base URL.
    pub fn publisher_url(&self) -> CoreResult<Url> {
        parse_base_url(&self.publisher_url)
    }

    /// Subscriber base URL.
    pub fn subscriber_url(&self) -> CoreResult<Url> {
        parse_base_url(&self.subscriber_url)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn success_settle(&self) -> Duration {
        Duration::from_millis(self.success_settle_ms)
    }

    pub fn empty_response_settle(&self) -> Duration {
        Duration::from_millis(self.empty_response_settle_ms)
    }

    pub fn redelivery_settle(&self) -> Duration {
        Duration::from_millis(self.redelivery_settle_ms)
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_millis(self.health_check_interval_ms)
    }

    pub fn publish_health_interval(&self) -> Duration {
        Duration::from_millis(self.publish_health_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Parse `host:port` or a full URL. External app addresses usually come
/// without a scheme.
fn parse_base_url(raw: &str) -> CoreResult<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Config("base URL must not be empty".to_string()));
    }
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };
    Ok(Url::parse(&with_scheme)?)
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
