//! Remote behavior controller.
//!
//! Control calls go to the publisher app, which proxies them to the
//! subscriber. Mode switches and ledger resets must answer 200; anything else
//! means the scenario cannot establish its baseline and fails in setup.

use crate::delivery_set::DeliverySet;
use crate::transport::HarnessTransport;
use crate::{HarnessError, HarnessResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Path of the publisher app's control proxy.
pub const CONTROL_PATH: &str = "/tests/callSubscriberMethod";

/// How the subscriber acknowledges deliveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubscriberMode {
    Success,
    Error,
    Retry,
    InvalidStatus,
    EmptyJson,
}

impl SubscriberMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SubscriberMode::Success => "success",
            SubscriberMode::Error => "error",
            SubscriberMode::Retry => "retry",
            SubscriberMode::InvalidStatus => "invalid-status",
            SubscriberMode::EmptyJson => "empty-json",
        }
    }
}

impl fmt::Display for SubscriberMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A method invocable on the subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// `set-respond-<mode>`
    SetRespond(SubscriberMode),
    /// Clear the delivery ledger.
    Initialize,
    /// Read the delivery ledger.
    GetMessages,
}

impl ControlCommand {
    pub fn method(self) -> String {
        match self {
            ControlCommand::SetRespond(mode) => format!("set-respond-{mode}"),
            ControlCommand::Initialize => "initialize".to_string(),
            ControlCommand::GetMessages => "getMessages".to_string(),
        }
    }
}

/// Body of a control call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallSubscriberMethodRequest {
    pub remote_app: String,
    pub protocol: String,
    pub method: String,
}

/// Issues control calls through the publisher app.
pub struct RemoteController {
    transport: Arc<dyn HarnessTransport>,
    url: String,
    remote_app: String,
}

impl RemoteController {
    pub fn new(
        transport: Arc<dyn HarnessTransport>,
        publisher_base: &str,
        remote_app: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            url: format!("{}{}", publisher_base.trim_end_matches('/'), CONTROL_PATH),
            remote_app: remote_app.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn request(&self, command: ControlCommand, protocol: &str) -> CallSubscriberMethodRequest {
        CallSubscriberMethodRequest {
            remote_app: self.remote_app.clone(),
            protocol: protocol.to_string(),
            method: command.method(),
        }
    }

    /// Send a mode switch or reset. Any failure is [`HarnessError::FatalSetup`].
    pub async fn send(&self, command: ControlCommand, protocol: &str) -> HarnessResult<()> {
        let request = self.request(command, protocol);
        let body = serde_json::to_value(&request)?;

        debug!(url = %self.url, method = %request.method, protocol = %protocol, "Control call");

        let reply = self
            .transport
            .post_json(&self.url, &body)
            .await
            .map_err(|e| HarnessError::FatalSetup {
                method: request.method.clone(),
                reason: e.to_string(),
            })?;

        if reply.status != 200 {
            return Err(HarnessError::FatalSetup {
                method: request.method,
                reason: format!("expected status 200, got {}", reply.status),
            });
        }

        Ok(())
    }

    /// Switch how the subscriber acknowledges deliveries.
    pub async fn set_mode(&self, mode: SubscriberMode, protocol: &str) -> HarnessResult<()> {
        info!(mode = %mode, protocol = %protocol, "Setting subscriber response mode");
        self.send(ControlCommand::SetRespond(mode), protocol).await
    }

    /// Clear the subscriber's ledger.
    pub async fn initialize(&self, protocol: &str) -> HarnessResult<()> {
        info!(protocol = %protocol, "Initializing subscriber ledger");
        self.send(ControlCommand::Initialize, protocol).await
    }

    /// Read a ledger snapshot. Failures here are not fatal; the poller retries.
    pub async fn fetch_ledger(&self, protocol: &str) -> HarnessResult<DeliverySet> {
        let request = self.request(ControlCommand::GetMessages, protocol);
        let body = serde_json::to_value(&request)?;

        let reply = self.transport.post_json(&self.url, &body).await?;
        if !reply.is_success() {
            return Err(HarnessError::Ledger(format!(
                "getMessages answered with status {}",
                reply.status
            )));
        }

        DeliverySet::from_ledger_json(&reply.body)
    }
}
