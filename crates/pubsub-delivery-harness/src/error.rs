//! Harness error types.
//!
//! Errors raised during preflight end the run. Anything raised inside a
//! scenario, control call failures included, fails only that scenario.

use crate::delivery_set::ChannelMismatch;
use thiserror::Error;

/// Harness error type.
#[derive(Error, Debug)]
pub enum HarnessError {
    /// HTTP client construction error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Request never produced a response (connect, timeout, body read).
    #[error("Transport error calling {url}: {message}")]
    Transport { url: String, message: String },

    /// Publish endpoint answered with something other than 204.
    #[error("Publish to topic '{topic}' failed with status {status}")]
    PublishStatus { topic: String, status: u16 },

    /// A subscriber control call failed. Fails the scenario in setup.
    #[error("Control call '{method}' failed: {reason}")]
    FatalSetup { method: String, reason: String },

    /// Health probing exhausted its budget.
    #[error("{url} unreachable after {attempts} attempts: {last_error}")]
    Unreachable {
        url: String,
        attempts: u32,
        last_error: String,
    },

    /// Sorted expected and observed identifiers differ.
    #[error("Delivery mismatch on {} channel(s): {}", .mismatches.len(), summarize(.mismatches))]
    ExpectationMismatch { mismatches: Vec<ChannelMismatch> },

    /// A deliberately malformed request did not fail the expected way.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Ledger snapshot could not be decoded.
    #[error("Ledger error: {0}")]
    Ledger(String),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration or bootstrap error
    #[error(transparent)]
    Core(#[from] harness_config_and_utils::CoreError),
}

impl HarnessError {
    pub(crate) fn transport(url: &str, err: impl std::fmt::Display) -> Self {
        HarnessError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}

fn summarize(mismatches: &[ChannelMismatch]) -> String {
    mismatches
        .iter()
        .map(|m| {
            format!(
                "{} (expected {}, observed {})",
                m.channel, m.expected_count, m.observed_count
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias using HarnessError.
pub type HarnessResult<T> = Result<T, HarnessError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::Channel;

    #[test]
    fn setup_display_names_method() {
        let err = HarnessError::FatalSetup {
            method: "initialize".to_string(),
            reason: "expected status 200, got 500".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Control call 'initialize' failed: expected status 200, got 500"
        );
    }

    #[test]
    fn mismatch_display_lists_channels() {
        let err = HarnessError::ExpectationMismatch {
            mismatches: vec![ChannelMismatch {
                channel: Channel::Raw,
                expected_count: 3,
                observed_count: 2,
                missing: vec!["message-http-001".to_string()],
                unexpected: vec![],
            }],
        };
        assert_eq!(
            err.to_string(),
            "Delivery mismatch on 1 channel(s): raw (expected 3, observed 2)"
        );
    }

    #[test]
    fn publish_status_display() {
        let err = HarnessError::PublishStatus {
            topic: "pubsub-b-topic-http".to_string(),
            status: 404,
        };
        assert_eq!(
            err.to_string(),
            "Publish to topic 'pubsub-b-topic-http' failed with status 404"
        );
    }
}
