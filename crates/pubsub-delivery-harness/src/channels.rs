//! The five logical delivery channels and how each maps onto the wire.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Pubsub component backing the structured and raw channels.
pub const DEFAULT_PUBSUB_NAME: &str = "messagebus";

/// Alternate pubsub component.
pub const MQTT_PUBSUB_NAME: &str = "mqtt-pubsub";

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_CLOUD_EVENT: &str = "application/cloudevents+json";

/// A tracked channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Channel {
    TopicA,
    TopicB,
    TopicC,
    Raw,
    Mqtt,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Channel::TopicA,
        Channel::TopicB,
        Channel::TopicC,
        Channel::Raw,
        Channel::Mqtt,
    ];

    /// Short name used in configuration and reports.
    pub fn name(self) -> &'static str {
        match self {
            Channel::TopicA => "topic-a",
            Channel::TopicB => "topic-b",
            Channel::TopicC => "topic-c",
            Channel::Raw => "raw",
            Channel::Mqtt => "mqtt",
        }
    }

    pub fn from_name(name: &str) -> Option<Channel> {
        Channel::ALL.into_iter().find(|c| c.name() == name)
    }

    /// Topic before the protocol suffix.
    pub fn base_topic(self) -> &'static str {
        match self {
            Channel::TopicA => "pubsub-a-topic",
            Channel::TopicB => "pubsub-b-topic",
            Channel::TopicC => "pubsub-c-topic",
            Channel::Raw => "pubsub-raw-topic",
            Channel::Mqtt => "some-string/test",
        }
    }

    /// Topic as sent to the publisher, e.g. `pubsub-a-topic-http`.
    pub fn wire_topic(self, protocol: &str) -> String {
        format!("{}-{}", self.base_topic(), protocol)
    }

    pub fn pubsub_name(self) -> &'static str {
        match self {
            Channel::Mqtt => MQTT_PUBSUB_NAME,
            _ => DEFAULT_PUBSUB_NAME,
        }
    }

    /// Key of this channel in the subscriber's `getMessages` reply.
    pub fn ledger_key(self) -> &'static str {
        match self {
            Channel::Mqtt => "pubsub-mqtt-topic",
            other => other.base_topic(),
        }
    }

    /// Publish metadata. Only the raw channel asks for an unwrapped payload.
    pub fn metadata(self) -> BTreeMap<String, String> {
        let mut metadata = BTreeMap::new();
        if self == Channel::Raw {
            metadata.insert("rawPayload".to_string(), "true".to_string());
        }
        metadata
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How strictly a channel's delivery is judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryExpectation {
    /// Mismatches fail the scenario.
    Strict,
    /// Mismatches are reported as warnings only.
    Relaxed,
}

/// Publish and assertion settings for one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSpec {
    pub channel: Channel,
    /// When set, payloads are wrapped in a cloud event of this type.
    pub cloud_event_type: Option<String>,
    pub expectation: DeliveryExpectation,
}

impl ChannelSpec {
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            cloud_event_type: None,
            expectation: DeliveryExpectation::Strict,
        }
    }

    pub fn content_type(&self) -> &'static str {
        if self.cloud_event_type.is_some() {
            CONTENT_TYPE_CLOUD_EVENT
        } else {
            CONTENT_TYPE_JSON
        }
    }
}

/// Channel catalogue. Every channel is strict unless named in `relaxed`, and
/// publishes bare identifiers unless `cloud_event_types` gives it an event type.
pub fn channel_specs(
    relaxed: &[String],
    cloud_event_types: &BTreeMap<String, String>,
) -> Vec<ChannelSpec> {
    Channel::ALL
        .into_iter()
        .map(|channel| {
            let mut spec = ChannelSpec::new(channel);
            if relaxed.iter().any(|name| name == channel.name()) {
                spec.expectation = DeliveryExpectation::Relaxed;
            }
            spec.cloud_event_type = cloud_event_types.get(channel.name()).cloned();
            spec
        })
        .collect()
}
