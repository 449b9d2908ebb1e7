//! Per-run message identifiers.
//!
//! A batch starts at a random offset so consecutive runs against the same
//! broker do not reuse identifiers; some backends deduplicate on message id.

use rand::Rng;

/// Format the identifier for message `index` sent over `protocol`.
pub fn message_id(protocol: &str, index: u32) -> String {
    format!("message-{protocol}-{index:03}")
}

/// Pick a starting offset in `[0, offset_max)`. `offset_max` of zero yields zero.
pub fn random_offset<R: Rng + ?Sized>(rng: &mut R, offset_max: u32) -> u32 {
    if offset_max == 0 {
        return 0;
    }
    rng.gen_range(0..offset_max)
}

/// `count` sequential identifiers starting at `offset`.
pub fn sequential_ids(protocol: &str, offset: u32, count: u32) -> Vec<String> {
    (offset..offset.saturating_add(count))
        .map(|index| message_id(protocol, index))
        .collect()
}
