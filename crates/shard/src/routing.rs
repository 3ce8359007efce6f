//! Key-space routing: which logical partition owns a key, and which
//! execution unit owns that partition.

use config::SEGMENT_COUNT;
use segment_store::stable_hash;

/// The logical partition index (`0..SEGMENT_COUNT`) a key belongs to.
pub fn segment_no(key: &[u8]) -> usize {
    (stable_hash(key) % SEGMENT_COUNT as u64) as usize
}

/// The execution unit, of `units` total, that owns `key`'s partition.
pub fn shard_of(key: &[u8], units: usize) -> usize {
    segment_no(key) % units
}

/// The position within its owning unit's local partition list.
pub fn partition_index(key: &[u8], units: usize) -> usize {
    segment_no(key) / units
}
