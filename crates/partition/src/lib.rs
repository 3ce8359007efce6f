//! # Partition — pkvs storage engine
//!
//! Binds one [`memtable::Memtable`] to one [`segment_store::SegmentStore`]
//! for a single slice of the key space and implements the get/insert/delete/
//! sorted_keys/housekeeping operations one execution unit runs against it.
//!
//! ## Architecture
//!
//! ```text
//! Execution unit
//!   |
//!   v
//! ┌───────────────────────────────────────────────┐
//! │                  PARTITION                    │
//! │                                                │
//! │ get/insert/delete → Memtable (dirty tracking)  │
//! │                                                │
//! │ housekeeping() → flush dirty entries           │
//! │                 → evict clean entries by LRU   │
//! │                   until under evict_threshold  │
//! │                                                │
//! │ sorted_keys() → SegmentStore ⊕ Memtable         │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Crash safety
//!
//! There is no write-ahead log: a dirty memtable entry only becomes durable
//! once [`Partition::housekeeping`] flushes it to the segment store. A crash
//! before that point loses the entry. Segment files and value sidecars are
//! themselves written atomically (temp file + rename), so a crash mid-flush
//! never leaves a partially visible segment.
mod error;

use std::collections::BTreeSet;
use std::time::{SystemTime, UNIX_EPOCH};

pub use error::{PartitionError, Result};
use memtable::{Entry, Memtable};
use segment_store::SegmentStore;

/// Minimum interval between flushes triggered purely by time, regardless of
/// how little dirty data has accumulated.
pub const FLUSH_INTERVAL_SECS: u64 = 20;

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs()
}

/// One logical slice of the key space: a memtable fronting a segment store.
///
/// # Read path
/// [`Partition::get`] checks the memtable first (freshest data, including
/// tombstones) and falls back to the segment store, caching what it finds
/// back into the memtable.
///
/// # Write path
/// [`Partition::insert`] and [`Partition::delete`] only touch the memtable;
/// nothing reaches disk until [`Partition::housekeeping`] flushes it.
///
/// # Housekeeping
/// Two phases, always in this order: flush every dirty entry to a new
/// segment, then evict clean entries oldest-access-first until
/// `approx_mem_bytes` is back under `evict_threshold`. Dirty entries are
/// never evicted — they were just cleared by the flush phase that always
/// precedes eviction.
pub struct Partition {
    mem: Memtable,
    store: SegmentStore,
    evict_threshold: u64,
    approx_mem_bytes: u64,
    has_dirty: bool,
    last_flush_time: u64,
}

impl std::fmt::Debug for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Partition")
            .field("entries", &self.mem.len())
            .field("approx_mem_bytes", &self.approx_mem_bytes)
            .field("evict_threshold", &self.evict_threshold)
            .field("has_dirty", &self.has_dirty)
            .field("last_flush_time", &self.last_flush_time)
            .field("segment_count", &self.store.segment_count())
            .finish()
    }
}

impl Partition {
    /// Opens the partition rooted at `dir`, creating it if necessary. The
    /// memtable always starts empty — there is no WAL to replay — so any
    /// data not yet flushed at the last clean shutdown is gone by design.
    pub fn open(dir: impl Into<std::path::PathBuf>, evict_threshold: u64) -> Result<Self> {
        Ok(Self {
            mem: Memtable::new(),
            store: SegmentStore::open(dir)?,
            evict_threshold,
            approx_mem_bytes: 0,
            has_dirty: false,
            last_flush_time: now_secs(),
        })
    }

    /// Looks up `key`, checking the memtable before falling back to the
    /// segment store. A segment-store hit is cached back into the memtable
    /// as a clean entry.
    pub fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if let Some(entry) = self.mem.find(key) {
            if entry.is_tombstone() {
                return Ok(None);
            }
            let content = entry.content.clone();
            self.mem.modify(key, |e| e.last_access = now_secs());
            return Ok(Some(content));
        }

        match self.store.get(key)? {
            Some(value) => {
                self.approx_mem_bytes += (key.len() + value.len()) as u64;
                self.mem
                    .insert(Entry::value(key.to_vec(), value.clone(), false, now_secs()));
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Writes `value` for `key`, marking the entry dirty.
    pub fn insert(&mut self, key: &[u8], value: Vec<u8>) {
        self.has_dirty = true;
        if let Some(old) = self.mem.find(key) {
            self.approx_mem_bytes -= old.content.len() as u64;
        } else {
            self.approx_mem_bytes += key.len() as u64;
        }
        self.approx_mem_bytes += value.len() as u64;
        self.mem
            .replace(key, Entry::value(key.to_vec(), value, true, now_secs()));
    }

    /// Marks `key` deleted, marking the entry dirty.
    pub fn delete(&mut self, key: &[u8]) {
        self.has_dirty = true;
        if let Some(old) = self.mem.find(key) {
            self.approx_mem_bytes -= old.content.len() as u64;
            self.mem
                .replace(key, Entry::tombstone(key.to_vec(), true, now_secs()));
        } else {
            self.approx_mem_bytes += key.len() as u64;
            self.mem.insert(Entry::tombstone(key.to_vec(), true, now_secs()));
        }
    }

    /// The full set of live keys: the on-disk key set with the memtable
    /// overlaid on top (tombstones removing, values adding).
    ///
    /// Crosses a suspension point between the disk read and the memtable
    /// overlay; callers are responsible for serializing this against
    /// concurrent [`Partition::housekeeping`] calls on the same partition
    /// (the execution unit's single-threaded task queue does this).
    pub fn sorted_keys(&self) -> Result<BTreeSet<Vec<u8>>> {
        let mut keys = self.store.sorted_keys()?;
        for entry in self.mem.iter_by_key() {
            if entry.is_tombstone() {
                keys.remove(&entry.key);
            } else {
                keys.insert(entry.key.clone());
            }
        }
        Ok(keys)
    }

    /// Runs one housekeeping tick: flush then evict. No-op unless the byte
    /// budget is exceeded or the time-based trigger has elapsed.
    pub fn housekeeping(&mut self) -> Result<()> {
        let now = now_secs();
        let over_budget = self.approx_mem_bytes > self.evict_threshold;
        let stale = now.saturating_sub(self.last_flush_time) >= FLUSH_INTERVAL_SECS;
        if !over_budget && !stale {
            return Ok(());
        }

        if self.has_dirty {
            self.flush()?;
        }

        while self.approx_mem_bytes > self.evict_threshold {
            let Some(victim) = self.mem.oldest() else {
                break;
            };
            if victim.dirty {
                tracing::warn!("oldest memtable entry is dirty, stopping eviction early");
                break;
            }
            let key = victim.key.clone();
            let freed = (victim.key.len() + victim.content.len()) as u64;
            self.mem.erase(&key);
            self.approx_mem_bytes -= freed;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        let mut batch = Vec::new();
        for entry in self.mem.iter_by_key() {
            if !entry.dirty {
                continue;
            }
            let value = if entry.is_tombstone() {
                None
            } else {
                Some(entry.content.clone())
            };
            batch.push((entry.key.clone(), value));
        }
        self.store.store(&batch)?;
        for (key, _) in &batch {
            self.mem.modify(key, |e| e.dirty = false);
        }
        self.has_dirty = false;
        self.last_flush_time = now_secs();
        Ok(())
    }

    /// Approximate resident size of the memtable, in bytes.
    pub fn approx_mem_bytes(&self) -> u64 {
        self.approx_mem_bytes
    }

    /// `true` if the memtable holds any unflushed entry.
    pub fn has_dirty(&self) -> bool {
        self.has_dirty
    }
}
