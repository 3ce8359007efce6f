//! # Segment store
//!
//! Immutable, append-only on-disk storage for one partition of the pkvs
//! key-value store.
//!
//! A partition's segment store is an ordered list of segment files, each
//! named by a monotonically increasing id. Segments are never modified in
//! place: a write appends a new segment, and the only thing that removes a
//! segment is [`SegmentStore::try_merge_oldest`] folding it into its
//! successor. Values live out-of-line in per-key sidecar files under
//! `values/` so that segment files stay small, fixed-record scans.
//!
//! ## On-disk layout
//!
//! ```text
//! <dir>/
//!   0, 1, 2, ...      segment files, 268-byte fixed records
//!   values/
//!     <hash>_<hash>   one file per live key, raw value bytes
//! ```
//!
//! Reads favor newest-wins: [`SegmentStore::get`] walks segments from
//! newest to oldest and stops at the first mention of the key.
//! [`SegmentStore::sorted_keys`] walks oldest to newest so later mentions
//! overwrite earlier ones, then returns every key whose final mention is a
//! live value.

mod error;
mod format;
mod hash;
mod merge;
mod reader;
mod writer;

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

pub use error::{Result, SegmentError};
pub use format::{Kind, RECORD_LEN};
pub use hash::{sidecar_name, stable_hash};
pub use writer::PendingItem;

const VALUES_DIR: &str = "values";

/// A partition's ordered collection of immutable segment files.
pub struct SegmentStore {
    dir: PathBuf,
    values_dir: PathBuf,
    /// Segment ids, ascending. The last entry is the newest segment.
    ids: Vec<u64>,
}

impl SegmentStore {
    /// Opens (creating if necessary) the segment store rooted at `dir`.
    ///
    /// Enumerates every entry in `dir` whose name parses as a non-negative
    /// integer and treats it as a segment id; everything else (including
    /// the `values` subdirectory) is reserved and skipped.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let values_dir = dir.join(VALUES_DIR);
        fs::create_dir_all(&values_dir).map_err(|e| SegmentError::io(&values_dir, e))?;

        let mut ids = Vec::new();
        let entries = fs::read_dir(&dir).map_err(|e| SegmentError::io(&dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| SegmentError::io(&dir, e))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                tracing::debug!(?entry, "skipping non-utf8 segment store entry");
                continue;
            };
            if name == VALUES_DIR {
                continue;
            }
            match name.parse::<u64>() {
                Ok(id) => ids.push(id),
                Err(_) => tracing::debug!(name, "skipping reserved segment store entry"),
            }
        }
        ids.sort_unstable();

        Ok(Self {
            dir,
            values_dir,
            ids,
        })
    }

    fn segment_path(&self, id: u64) -> PathBuf {
        self.dir.join(id.to_string())
    }

    /// Returns the value for the newest segment mentioning `key`, or `None`
    /// if no segment mentions it or the newest mention is a tombstone.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        for &id in self.ids.iter().rev() {
            let path = self.segment_path(id);
            match reader::find_in_segment(&path, key)? {
                Some(Kind::Tombstone) => return Ok(None),
                Some(Kind::Value) => {
                    let sidecar_path = self.values_dir.join(sidecar_name(key));
                    let bytes = fs::read(&sidecar_path).map_err(|e| {
                        if e.kind() == std::io::ErrorKind::NotFound {
                            SegmentError::MissingSidecar { path: sidecar_path.clone() }
                        } else {
                            SegmentError::io(&sidecar_path, e)
                        }
                    })?;
                    return Ok(Some(bytes));
                }
                None => continue,
            }
        }
        Ok(None)
    }

    /// Returns the set of keys whose most recent mention, across all
    /// segments oldest to newest, is a live value.
    pub fn sorted_keys(&self) -> Result<BTreeSet<Vec<u8>>> {
        let mut keys: std::collections::BTreeMap<Vec<u8>, Kind> = std::collections::BTreeMap::new();
        for &id in &self.ids {
            let path = self.segment_path(id);
            for record in reader::scan_segment(&path)? {
                keys.insert(record.key, record.kind);
            }
        }
        Ok(keys
            .into_iter()
            .filter_map(|(k, kind)| matches!(kind, Kind::Value).then_some(k))
            .collect())
    }

    /// Appends one new segment holding `items`. Writes every live value's
    /// sidecar before the segment file that references it.
    ///
    /// `items.is_empty()` is a documented no-op: no segment is appended and
    /// `self.ids` is left untouched, rather than writing a zero-record
    /// segment. Callers that mean "flush, unconditionally" should check
    /// non-emptiness themselves.
    pub fn store(&mut self, items: &[PendingItem]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        let next_id = self.ids.last().map(|&m| m + 1).unwrap_or(0);
        writer::write_segment(&self.dir, &self.values_dir, next_id, items)?;
        self.ids.push(next_id);
        Ok(())
    }

    /// Merges the two oldest segments into one, preserving newest-wins
    /// semantics, then drops the superseded segment. A no-op if fewer than
    /// two segments exist.
    pub fn try_merge_oldest(&mut self) -> Result<()> {
        if self.ids.len() < 2 {
            return Ok(());
        }
        let old_id = self.ids[0];
        let new_id = self.ids[1];
        merge::merge_into(&self.dir, old_id, new_id)?;
        self.ids.remove(0);
        Ok(())
    }

    /// Number of segments currently on disk.
    pub fn segment_count(&self) -> usize {
        self.ids.len()
    }

    /// Root directory this store was opened on.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
