//! Rate-limited publish driver.
//!
//! Sends one publish command per message to the publisher app. Only `204 No
//! Content` counts as accepted. The first failure aborts the rest of the batch
//! and is returned next to the identifiers accepted so far. Publishes are
//! never retried here: redelivery by the broker is what the harness measures.

use crate::channels::{ChannelSpec, CONTENT_TYPE_JSON};
use crate::clock::Clock;
use crate::ids::sequential_ids;
use crate::rate_limiter::RateLimiter;
use crate::transport::{HarnessTransport, HttpReply};
use crate::{HarnessError, HarnessResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Path of the publisher app's publish endpoint.
pub const PUBLISH_PATH: &str = "/tests/publish";

/// Cloud event envelope used when a channel carries a cloud event type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudEventEnvelope {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(rename = "datacontenttype")]
    pub data_content_type: String,
    pub data: String,
}

/// Message body: the bare identifier or a cloud event wrapping it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Raw(String),
    CloudEvent(CloudEventEnvelope),
}

impl Payload {
    pub fn for_message(message_id: &str, cloud_event_type: Option<&str>) -> Self {
        match cloud_event_type {
            Some(event_type) => Payload::CloudEvent(CloudEventEnvelope {
                id: message_id.to_string(),
                event_type: event_type.to_string(),
                data_content_type: "text/plain".to_string(),
                data: message_id.to_string(),
            }),
            None => Payload::Raw(message_id.to_string()),
        }
    }
}

/// Command body understood by the publisher app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishCommand {
    #[serde(rename = "contentType")]
    pub content_type: String,
    pub topic: String,
    pub data: Payload,
    pub protocol: String,
    pub metadata: BTreeMap<String, String>,
    #[serde(rename = "pubsubname")]
    pub pubsub_name: String,
}

impl PublishCommand {
    /// Command for one message on `spec`'s channel.
    pub fn for_channel(spec: &ChannelSpec, protocol: &str, message_id: &str) -> Self {
        Self {
            content_type: spec.content_type().to_string(),
            topic: spec.channel.wire_topic(protocol),
            data: Payload::for_message(message_id, spec.cloud_event_type.as_deref()),
            protocol: protocol.to_string(),
            metadata: spec.channel.metadata(),
            pubsub_name: spec.channel.pubsub_name().to_string(),
        }
    }

    /// Command with everything but protocol and data left empty; the
    /// publisher must reject it as topic-less.
    pub fn without_topic(protocol: &str) -> Self {
        Self {
            content_type: String::new(),
            topic: String::new(),
            data: Payload::Raw("unsuccessful message".to_string()),
            protocol: protocol.to_string(),
            metadata: BTreeMap::new(),
            pubsub_name: String::new(),
        }
    }

    /// Health check message.
    pub fn health_check(protocol: &str) -> Self {
        Self {
            content_type: CONTENT_TYPE_JSON.to_string(),
            topic: format!("pubsub-healthcheck-topic-{protocol}"),
            data: Payload::Raw("health check".to_string()),
            protocol: protocol.to_string(),
            metadata: BTreeMap::new(),
            pubsub_name: String::new(),
        }
    }
}

/// Identifiers accepted by the publisher, plus the error that ended the batch early.
#[derive(Debug)]
pub struct PublishOutcome {
    pub accepted: Vec<String>,
    pub error: Option<HarnessError>,
}

impl PublishOutcome {
    pub fn into_result(self) -> HarnessResult<Vec<String>> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.accepted),
        }
    }
}

/// Publishes batches to one publisher app.
pub struct PublishDriver {
    transport: Arc<dyn HarnessTransport>,
    clock: Arc<dyn Clock>,
    url: String,
    rate_limit_rps: u32,
}

impl PublishDriver {
    pub fn new(
        transport: Arc<dyn HarnessTransport>,
        clock: Arc<dyn Clock>,
        publisher_base: &str,
        rate_limit_rps: u32,
    ) -> Self {
        Self {
            transport,
            clock,
            url: format!("{}{}", publisher_base.trim_end_matches('/'), PUBLISH_PATH),
            rate_limit_rps,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// POST a single command and return the raw reply.
    pub async fn post(&self, command: &PublishCommand) -> HarnessResult<HttpReply> {
        let body = serde_json::to_value(command)?;
        self.transport.post_json(&self.url, &body).await
    }

    /// Publish `count` messages on `spec`'s channel, identifiers starting at `offset`.
    pub async fn publish_batch(
        &self,
        spec: &ChannelSpec,
        protocol: &str,
        offset: u32,
        count: u32,
    ) -> PublishOutcome {
        let ids = sequential_ids(protocol, offset, count);
        let mut limiter = RateLimiter::per_second(self.rate_limit_rps, self.clock.clone());
        let mut accepted = Vec::with_capacity(ids.len());

        for (position, message_id) in ids.into_iter().enumerate() {
            let command = PublishCommand::for_channel(spec, protocol, &message_id);

            if position == 0 {
                // only the first message is logged so a batch does not flood the log
                info!(
                    url = %self.url,
                    body = %serde_json::to_string(&command).unwrap_or_default(),
                    "Sending first message of batch, later messages on this topic are not logged"
                );
            }

            limiter.acquire().await;

            let reply = match self.post(&command).await {
                Ok(reply) => reply,
                Err(e) => {
                    warn!(
                        topic = %command.topic,
                        message_id = %message_id,
                        accepted = accepted.len(),
                        error = %e,
                        "Publish failed, aborting batch"
                    );
                    return PublishOutcome {
                        accepted,
                        error: Some(e),
                    };
                }
            };

            if reply.status != 204 {
                warn!(
                    topic = %command.topic,
                    message_id = %message_id,
                    status = reply.status,
                    accepted = accepted.len(),
                    "Publish not accepted, aborting batch"
                );
                return PublishOutcome {
                    accepted,
                    error: Some(HarnessError::PublishStatus {
                        topic: command.topic,
                        status: reply.status,
                    }),
                };
            }

            accepted.push(message_id);
        }

        debug!(
            channel = %spec.channel,
            protocol = %protocol,
            accepted = accepted.len(),
            "Batch published"
        );

        PublishOutcome {
            accepted,
            error: None,
        }
    }
}
