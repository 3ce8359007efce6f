//! # Memtable
//!
//! An in-memory, dual-indexed mutable table fronting one partition's segment
//! store in the pkvs storage engine.
//!
//! The memtable is the first point of contact for every read and write. It
//! holds one [`Entry`] per key, sorted by key for flush ordering and by
//! `last_access` for eviction.
//!
//! ## Key properties
//! - **Key-sorted view**: [`Memtable::iter_by_key`] walks entries in
//!   ascending key order (required for deterministic segment flush).
//! - **Access-sorted view**: [`Memtable::iter_oldest`] walks entries from
//!   least- to most-recently accessed (required for eviction).
//! - **Tombstone support**: deletes are recorded as `Entry { kind:
//!   Kind::Tombstone, content: vec![], .. }`.
//! - **Dirty flag**: entries written since the last flush are `dirty`;
//!   housekeeping clears it once a segment has been written.
//!
//! ## Example
//! ```rust
//! use memtable::{Entry, Kind, Memtable};
//!
//! let mut m = Memtable::new();
//! m.insert(Entry::value(b"hello".to_vec(), b"world".to_vec(), true, 1));
//! assert_eq!(m.find(b"hello").unwrap().content, b"world");
//!
//! m.replace(b"hello", Entry::tombstone(b"hello".to_vec(), true, 2));
//! assert_eq!(m.find(b"hello").unwrap().kind, Kind::Tombstone);
//! ```

use std::collections::{BTreeMap, BTreeSet};

/// Whether a memtable entry carries a live value or marks a deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Value,
    Tombstone,
}

/// A single memtable record.
///
/// Invariants upheld by this crate: a `Tombstone` always has empty
/// `content`; the secondary (access) index is always kept consistent with
/// whatever `last_access` value a caller passes in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: Vec<u8>,
    pub kind: Kind,
    pub content: Vec<u8>,
    pub dirty: bool,
    pub last_access: u64,
}

impl Entry {
    /// Builds a live-value entry.
    pub fn value(key: Vec<u8>, content: Vec<u8>, dirty: bool, last_access: u64) -> Self {
        Self {
            key,
            kind: Kind::Value,
            content,
            dirty,
            last_access,
        }
    }

    /// Builds a tombstone entry (empty content).
    pub fn tombstone(key: Vec<u8>, dirty: bool, last_access: u64) -> Self {
        Self {
            key,
            kind: Kind::Tombstone,
            content: Vec::new(),
            dirty,
            last_access,
        }
    }

    /// `true` if this entry marks a deletion.
    pub fn is_tombstone(&self) -> bool {
        matches!(self.kind, Kind::Tombstone)
    }
}

/// An ordered, in-memory table with independent key and last-access orderings.
///
/// `find`, `insert`, `replace`, `modify` and `erase` all keep both orderings
/// consistent; callers never need to touch the access index directly.
#[derive(Debug, Default)]
pub struct Memtable {
    by_key: BTreeMap<Vec<u8>, Entry>,
    // (last_access, key) so entries with equal timestamps stay key-ordered too.
    by_access: BTreeSet<(u64, Vec<u8>)>,
}

impl Memtable {
    /// Creates a new, empty memtable.
    pub fn new() -> Self {
        Self {
            by_key: BTreeMap::new(),
            by_access: BTreeSet::new(),
        }
    }

    /// Looks up the entry for `key`, if present.
    pub fn find(&self, key: &[u8]) -> Option<&Entry> {
        self.by_key.get(key)
    }

    /// `true` if `key` has an entry (tombstone or live value).
    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.by_key.contains_key(key)
    }

    /// Inserts a brand-new entry. If `entry.key` already has an entry it is
    /// replaced, same as [`Memtable::replace`] — callers that need to
    /// distinguish "new key" from "existing key" should `find` first.
    pub fn insert(&mut self, entry: Entry) {
        self.replace_entry(entry);
    }

    /// Replaces the entry stored at `key` with `entry`, wherever it was in
    /// the access ordering, and returns the entry that was displaced (if
    /// any). `entry.key` must equal `key`.
    pub fn replace(&mut self, key: &[u8], entry: Entry) -> Option<Entry> {
        debug_assert_eq!(entry.key, key);
        self.replace_entry(entry)
    }

    fn replace_entry(&mut self, entry: Entry) -> Option<Entry> {
        let old = self.by_key.remove(&entry.key);
        if let Some(ref old) = old {
            self.by_access.remove(&(old.last_access, old.key.clone()));
        }
        self.by_access
            .insert((entry.last_access, entry.key.clone()));
        self.by_key.insert(entry.key.clone(), entry);
        old
    }

    /// Mutates the entry at `key` in place via `f`, fixing up the
    /// access-order index if `f` changed `last_access`. Returns `false` if
    /// `key` has no entry.
    pub fn modify<F: FnOnce(&mut Entry)>(&mut self, key: &[u8], f: F) -> bool {
        let Some(entry) = self.by_key.get_mut(key) else {
            return false;
        };
        let old_access = entry.last_access;
        f(entry);
        let new_access = entry.last_access;
        if old_access != new_access {
            self.by_access.remove(&(old_access, key.to_vec()));
            self.by_access.insert((new_access, key.to_vec()));
        }
        true
    }

    /// Removes the entry for `key`, returning it if present.
    pub fn erase(&mut self, key: &[u8]) -> Option<Entry> {
        let entry = self.by_key.remove(key)?;
        self.by_access
            .remove(&(entry.last_access, entry.key.clone()));
        Some(entry)
    }

    /// Iterates entries in ascending `last_access` order (oldest first).
    pub fn iter_oldest(&self) -> impl Iterator<Item = &Entry> {
        self.by_access
            .iter()
            .map(move |(_, k)| self.by_key.get(k).expect("access index out of sync"))
    }

    /// Iterates entries in ascending key order.
    pub fn iter_by_key(&self) -> impl Iterator<Item = &Entry> {
        self.by_key.values()
    }

    /// The entry with the smallest `last_access`, if any.
    pub fn oldest(&self) -> Option<&Entry> {
        let (_, k) = self.by_access.iter().next()?;
        self.by_key.get(k)
    }

    /// Number of entries (including tombstones).
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    /// `true` if the memtable holds no entries.
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}
