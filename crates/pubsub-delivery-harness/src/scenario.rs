//! Scenario catalogue.
//!
//! Each scenario kind carries its own typed configuration; the orchestrator
//! dispatches on [`ScenarioKind`] with a single exhaustive match.

use crate::controller::SubscriberMode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a scenario expects to observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedOutcome {
    /// Every accepted identifier is delivered exactly once.
    FullEcho,
    /// The publish call itself is rejected as not found.
    PublishRejected,
    /// Delivered once despite an empty acknowledgement, then never redelivered.
    DeliveredOnceNoRedelivery,
    /// Redelivered after a negative acknowledgement until success.
    RedeliveredUntilAcknowledged,
}

/// Failure mode a scenario injects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScenarioKind {
    Success,
    NoTopic,
    EmptyResponse,
    Error,
    Retry,
    InvalidStatus,
}

impl ScenarioKind {
    /// Execution order used for a full run.
    pub const ALL: [ScenarioKind; 6] = [
        ScenarioKind::Success,
        ScenarioKind::EmptyResponse,
        ScenarioKind::NoTopic,
        ScenarioKind::Error,
        ScenarioKind::Retry,
        ScenarioKind::InvalidStatus,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            ScenarioKind::Success => "success",
            ScenarioKind::NoTopic => "no-topic",
            ScenarioKind::EmptyResponse => "empty-response",
            ScenarioKind::Error => "error",
            ScenarioKind::Retry => "retry",
            ScenarioKind::InvalidStatus => "invalid-status",
        }
    }

    pub fn from_slug(slug: &str) -> Option<ScenarioKind> {
        ScenarioKind::ALL.into_iter().find(|kind| kind.slug() == slug)
    }

    pub fn config(self) -> ScenarioConfig {
        let (name, mode, outcome) = match self {
            ScenarioKind::Success => (
                "publish and subscribe message successfully",
                SubscriberMode::Success,
                ExpectedOutcome::FullEcho,
            ),
            ScenarioKind::NoTopic => (
                "publish with no topic",
                SubscriberMode::Success,
                ExpectedOutcome::PublishRejected,
            ),
            ScenarioKind::EmptyResponse => (
                "publish with subscriber returning empty json test delivery of message once",
                SubscriberMode::EmptyJson,
                ExpectedOutcome::DeliveredOnceNoRedelivery,
            ),
            ScenarioKind::Error => (
                "publish with subscriber error test redelivery of messages",
                SubscriberMode::Error,
                ExpectedOutcome::RedeliveredUntilAcknowledged,
            ),
            ScenarioKind::Retry => (
                "publish with subscriber retry test redelivery of messages",
                SubscriberMode::Retry,
                ExpectedOutcome::RedeliveredUntilAcknowledged,
            ),
            ScenarioKind::InvalidStatus => (
                "publish with subscriber invalid status test redelivery of messages",
                SubscriberMode::InvalidStatus,
                ExpectedOutcome::RedeliveredUntilAcknowledged,
            ),
        };
        ScenarioConfig {
            kind: self,
            name,
            subscriber_mode: mode,
            expected_outcome: outcome,
        }
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Typed configuration of one scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScenarioConfig {
    pub kind: ScenarioKind,
    pub name: &'static str,
    /// Mode the subscriber is put in before publishing.
    pub subscriber_mode: SubscriberMode,
    pub expected_outcome: ExpectedOutcome,
}

impl ScenarioConfig {
    /// `<name>_<protocol>`, the label a scenario is reported under.
    pub fn label(&self, protocol: &str) -> String {
        format!("{}_{}", self.name, protocol)
    }
}

/// Where a scenario currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioPhase {
    Idle,
    Setup,
    Publishing,
    Converging,
    Asserting,
    Done,
}

impl fmt::Display for ScenarioPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScenarioPhase::Idle => "idle",
            ScenarioPhase::Setup => "setup",
            ScenarioPhase::Publishing => "publishing",
            ScenarioPhase::Converging => "converging",
            ScenarioPhase::Asserting => "asserting",
            ScenarioPhase::Done => "done",
        };
        f.write_str(name)
    }
}
