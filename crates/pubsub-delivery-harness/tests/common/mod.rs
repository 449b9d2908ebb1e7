#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use pubsub_delivery_harness::channels::Channel;
use pubsub_delivery_harness::controller::CONTROL_PATH;
use pubsub_delivery_harness::publisher::PUBLISH_PATH;
use pubsub_delivery_harness::{
    DeliverySet, HarnessError, HarnessResult, HarnessSettings, HarnessTransport, HttpReply,
    ManualClock, SubscriberMode, TestEnvironment,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub const PUBLISHER: &str = "http://publisher.test";
pub const SUBSCRIBER: &str = "http://subscriber.test";

const MODES: [SubscriberMode; 5] = [
    SubscriberMode::Success,
    SubscriberMode::Error,
    SubscriberMode::Retry,
    SubscriberMode::InvalidStatus,
    SubscriberMode::EmptyJson,
];

/// Misbehaviours the fake can be told to exhibit.
#[derive(Debug, Clone, Default)]
pub struct Faults {
    /// Every request fails before reaching an app.
    pub unreachable: bool,
    /// The broker silently drops everything published on this channel.
    pub lost_channel: Option<Channel>,
    /// Control calls with this method answer 500.
    pub failing_method: Option<String>,
    /// Messages acknowledged with an empty body come back once the
    /// subscriber is switched to success.
    pub redeliver_after_empty: bool,
    /// Negatively acknowledged messages are discarded instead of redelivered.
    pub drop_nacked: bool,
    /// Status for a publish without topic. Defaults to 404.
    pub topicless_status: Option<u16>,
    /// Publishes on this channel answer with the given status.
    pub rejected_channel: Option<(Channel, u16)>,
}

/// One subscriber instance, keyed by protocol.
#[derive(Debug)]
struct Subscriber {
    mode: SubscriberMode,
    ledger: DeliverySet,
    /// Delivered but negatively acknowledged, waiting for redelivery.
    pending: Vec<(Channel, String)>,
    /// Acknowledged with an empty body.
    empty_acked: Vec<(Channel, String)>,
}

impl Default for Subscriber {
    fn default() -> Self {
        Self {
            mode: SubscriberMode::Success,
            ledger: DeliverySet::empty(),
            pending: Vec::new(),
            empty_acked: Vec::new(),
        }
    }
}

impl Subscriber {
    fn record(&mut self, channel: Channel, id: String) {
        let mut ids = self.ledger.get(channel).to_vec();
        ids.push(id);
        self.ledger.insert(channel, ids);
    }
}

#[derive(Debug, Default)]
struct State {
    subscribers: HashMap<String, Subscriber>,
    control_methods: Vec<String>,
    publishes: usize,
    gets: usize,
}

/// In-memory publisher app, broker and subscriber app.
#[derive(Debug, Default)]
pub struct FakeEnvironment {
    faults: Faults,
    state: Mutex<State>,
}

impl FakeEnvironment {
    pub fn healthy() -> Arc<Self> {
        Self::with_faults(Faults::default())
    }

    pub fn with_faults(faults: Faults) -> Arc<Self> {
        Arc::new(Self {
            faults,
            state: Mutex::new(State::default()),
        })
    }

    /// Control methods received, in order.
    pub fn control_methods(&self) -> Vec<String> {
        self.state.lock().control_methods.clone()
    }

    pub fn publishes(&self) -> usize {
        self.state.lock().publishes
    }

    pub fn gets(&self) -> usize {
        self.state.lock().gets
    }

    fn publish(&self, body: &Value) -> HttpReply {
        let topic = body["topic"].as_str().unwrap_or_default();
        let protocol = body["protocol"].as_str().unwrap_or_default().to_string();

        if topic.is_empty() {
            return HttpReply::new(self.faults.topicless_status.unwrap_or(404), "missing topic");
        }
        if topic.starts_with("pubsub-healthcheck-topic") {
            return HttpReply::new(204, "");
        }

        let Some(channel) = Channel::ALL
            .into_iter()
            .find(|c| c.wire_topic(&protocol) == topic)
        else {
            return HttpReply::new(404, "unknown topic");
        };

        if let Some((rejected, status)) = self.faults.rejected_channel {
            if rejected == channel {
                return HttpReply::new(status, "rejected");
            }
        }

        let id = match &body["data"] {
            Value::String(id) => id.clone(),
            envelope => envelope["data"].as_str().unwrap_or_default().to_string(),
        };

        let mut state = self.state.lock();
        state.publishes += 1;
        if self.faults.lost_channel == Some(channel) {
            return HttpReply::new(204, "");
        }

        let subscriber = state.subscribers.entry(protocol).or_default();
        match subscriber.mode {
            SubscriberMode::Success => subscriber.record(channel, id),
            SubscriberMode::EmptyJson => {
                subscriber.record(channel, id.clone());
                subscriber.empty_acked.push((channel, id));
            }
            SubscriberMode::Error | SubscriberMode::Retry | SubscriberMode::InvalidStatus => {
                subscriber.pending.push((channel, id));
            }
        }
        HttpReply::new(204, "")
    }

    fn control(&self, body: &Value) -> HttpReply {
        let method = body["method"].as_str().unwrap_or_default().to_string();
        let protocol = body["protocol"].as_str().unwrap_or_default().to_string();

        let mut state = self.state.lock();
        state.control_methods.push(method.clone());

        if self.faults.failing_method.as_deref() == Some(method.as_str()) {
            return HttpReply::new(500, "subscriber error");
        }

        let subscriber = state.subscribers.entry(protocol).or_default();
        if method == "initialize" {
            subscriber.ledger = DeliverySet::empty();
            return HttpReply::new(200, "");
        }
        if method == "getMessages" {
            return HttpReply::new(200, subscriber.ledger.to_ledger_json().to_string());
        }

        let Some(mode) = method
            .strip_prefix("set-respond-")
            .and_then(|name| MODES.into_iter().find(|m| m.as_str() == name))
        else {
            return HttpReply::new(400, "unknown method");
        };

        subscriber.mode = mode;
        if mode == SubscriberMode::Success {
            let mut redelivered = std::mem::take(&mut subscriber.pending);
            if self.faults.drop_nacked {
                redelivered.clear();
            }
            if self.faults.redeliver_after_empty {
                redelivered.append(&mut subscriber.empty_acked);
            }
            for (channel, id) in redelivered {
                subscriber.record(channel, id);
            }
        }
        HttpReply::new(200, "")
    }

    fn unreachable(url: &str) -> HarnessError {
        HarnessError::Transport {
            url: url.to_string(),
            message: "connection refused".to_string(),
        }
    }
}

#[async_trait]
impl HarnessTransport for FakeEnvironment {
    async fn post_json(&self, url: &str, body: &Value) -> HarnessResult<HttpReply> {
        if self.faults.unreachable {
            return Err(Self::unreachable(url));
        }
        if url.ends_with(PUBLISH_PATH) {
            Ok(self.publish(body))
        } else if url.ends_with(CONTROL_PATH) {
            Ok(self.control(body))
        } else {
            Ok(HttpReply::new(404, "not found"))
        }
    }

    async fn get(&self, url: &str) -> HarnessResult<HttpReply> {
        self.state.lock().gets += 1;
        if self.faults.unreachable {
            return Err(Self::unreachable(url));
        }
        Ok(HttpReply::new(200, "ok"))
    }
}

/// Default timings with small batches.
pub fn fast_settings() -> HarnessSettings {
    let mut settings = HarnessSettings::default();
    settings.messages_per_topic = 10;
    settings
}

pub fn environment(
    fake: &Arc<FakeEnvironment>,
    clock: &Arc<ManualClock>,
    settings: HarnessSettings,
) -> TestEnvironment {
    TestEnvironment::new(
        PUBLISHER,
        SUBSCRIBER,
        fake.clone(),
        clock.clone(),
        settings,
        Some(7),
    )
}
