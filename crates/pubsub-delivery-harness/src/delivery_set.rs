//! Per-channel identifier sets and their order-independent comparison.
//!
//! The same type holds what the publisher accepted and what the subscriber's
//! ledger reports. Delivery order is not guaranteed, so comparisons always
//! sort both sides first.

use crate::channels::{Channel, ChannelSpec, DeliveryExpectation};
use crate::{HarnessError, HarnessResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifiers keyed by channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverySet {
    by_channel: BTreeMap<Channel, Vec<String>>,
}

/// Wire shape of a `getMessages` reply. Absent or `null` lists are empty.
#[derive(Debug, Deserialize)]
struct LedgerReply {
    #[serde(rename = "pubsub-a-topic", default)]
    topic_a: Option<Vec<String>>,
    #[serde(rename = "pubsub-b-topic", default)]
    topic_b: Option<Vec<String>>,
    #[serde(rename = "pubsub-c-topic", default)]
    topic_c: Option<Vec<String>>,
    #[serde(rename = "pubsub-raw-topic", default)]
    raw: Option<Vec<String>>,
    #[serde(rename = "pubsub-mqtt-topic", default)]
    mqtt: Option<Vec<String>>,
}

impl DeliverySet {
    /// A set with an empty list for every channel.
    pub fn empty() -> Self {
        let mut set = Self::default();
        for channel in Channel::ALL {
            set.by_channel.insert(channel, Vec::new());
        }
        set
    }

    /// Decode a subscriber ledger snapshot.
    pub fn from_ledger_json(body: &str) -> HarnessResult<Self> {
        let reply: LedgerReply = serde_json::from_str(body)
            .map_err(|e| HarnessError::Ledger(format!("undecodable getMessages reply: {e}")))?;

        let mut set = Self::empty();
        set.insert(Channel::TopicA, reply.topic_a.unwrap_or_default());
        set.insert(Channel::TopicB, reply.topic_b.unwrap_or_default());
        set.insert(Channel::TopicC, reply.topic_c.unwrap_or_default());
        set.insert(Channel::Raw, reply.raw.unwrap_or_default());
        set.insert(Channel::Mqtt, reply.mqtt.unwrap_or_default());
        Ok(set)
    }

    /// Encode in the ledger's wire shape.
    pub fn to_ledger_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = Channel::ALL
            .into_iter()
            .map(|channel| {
                (
                    channel.ledger_key().to_string(),
                    serde_json::Value::from(self.get(channel).to_vec()),
                )
            })
            .collect();
        serde_json::Value::Object(map)
    }

    pub fn insert(&mut self, channel: Channel, ids: Vec<String>) {
        self.by_channel.insert(channel, ids);
    }

    pub fn get(&self, channel: Channel) -> &[String] {
        self.by_channel
            .get(&channel)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn count(&self, channel: Channel) -> usize {
        self.get(channel).len()
    }

    pub fn total(&self) -> usize {
        self.by_channel.values().map(Vec::len).sum()
    }

    pub fn counts(&self) -> BTreeMap<Channel, usize> {
        Channel::ALL
            .into_iter()
            .map(|channel| (channel, self.count(channel)))
            .collect()
    }

    /// True when every channel holds as many identifiers as in `other`.
    pub fn counts_match(&self, other: &DeliverySet) -> bool {
        Channel::ALL
            .into_iter()
            .all(|channel| self.count(channel) == other.count(channel))
    }
}

/// Difference between expected and observed identifiers on one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelMismatch {
    pub channel: Channel,
    pub expected_count: usize,
    pub observed_count: usize,
    /// Expected but not observed (multiset difference).
    pub missing: Vec<String>,
    /// Observed beyond what was expected, including duplicates.
    pub unexpected: Vec<String>,
}

/// Result of comparing one snapshot against expectations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comparison {
    /// Mismatches on strict channels.
    pub failures: Vec<ChannelMismatch>,
    /// Mismatches on relaxed channels.
    pub warnings: Vec<ChannelMismatch>,
}

impl Comparison {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn into_result(self) -> HarnessResult<Vec<ChannelMismatch>> {
        if self.failures.is_empty() {
            Ok(self.warnings)
        } else {
            Err(HarnessError::ExpectationMismatch {
                mismatches: self.failures,
            })
        }
    }
}

/// Sort both sides per channel and require exact equality.
pub fn compare(
    expected: &DeliverySet,
    observed: &DeliverySet,
    specs: &[ChannelSpec],
) -> Comparison {
    let mut comparison = Comparison::default();

    for spec in specs {
        let channel = spec.channel;
        let mut want = expected.get(channel).to_vec();
        let mut got = observed.get(channel).to_vec();
        want.sort();
        got.sort();

        if want == got {
            continue;
        }

        let (missing, unexpected) = sorted_difference(&want, &got);
        let mismatch = ChannelMismatch {
            channel,
            expected_count: want.len(),
            observed_count: got.len(),
            missing,
            unexpected,
        };
        match spec.expectation {
            DeliveryExpectation::Strict => comparison.failures.push(mismatch),
            DeliveryExpectation::Relaxed => comparison.warnings.push(mismatch),
        }
    }

    comparison
}

/// Multiset difference of two sorted slices: (only in `left`, only in `right`).
fn sorted_difference(left: &[String], right: &[String]) -> (Vec<String>, Vec<String>) {
    let mut only_left = Vec::new();
    let mut only_right = Vec::new();
    let (mut i, mut j) = (0, 0);

    while i < left.len() && j < right.len() {
        match left[i].cmp(&right[j]) {
            std::cmp::Ordering::Equal => {
                i += 1;
                j += 1;
            }
            std::cmp::Ordering::Less => {
                only_left.push(left[i].clone());
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                only_right.push(right[j].clone());
                j += 1;
            }
        }
    }
    only_left.extend_from_slice(&left[i..]);
    only_right.extend_from_slice(&right[j..]);

    (only_left, only_right)
}
