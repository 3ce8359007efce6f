use std::collections::BTreeSet;

use config::Config;
use partition::Partition;

use crate::error::Result;
use crate::routing::partition_index;

/// Every partition owned by one execution unit.
///
/// Unit `u` owns partition `i` for every segment index `i` with
/// `i mod units == u`, stored at local position `k = i / units`. A
/// `ShardManager` trusts its caller to only route keys that actually belong
/// to it — see [`crate::routing::shard_of`].
pub struct ShardManager {
    units: usize,
    partitions: Vec<Partition>,
}

impl ShardManager {
    /// Opens every partition this unit owns.
    pub fn open(cfg: &Config, unit: usize) -> Result<Self> {
        let mut partitions = Vec::new();
        let mut i = unit;
        while i < config::SEGMENT_COUNT {
            partitions.push(Partition::open(cfg.partition_dir(i), cfg.memory_threshold)?);
            i += cfg.units;
        }
        Ok(Self {
            units: cfg.units,
            partitions,
        })
    }

    fn local(&mut self, key: &[u8]) -> &mut Partition {
        &mut self.partitions[partition_index(key, self.units)]
    }

    pub fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.local(key).get(key)?)
    }

    pub fn insert(&mut self, key: &[u8], value: Vec<u8>) -> Result<()> {
        self.local(key).insert(key, value);
        Ok(())
    }

    pub fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.local(key).delete(key);
        Ok(())
    }

    /// Merges `sorted_keys()` across every locally owned partition, run in
    /// parallel — partitions are exclusively owned and never overlap, so
    /// there's nothing serializing them.
    pub fn sorted_keys(&self) -> Result<BTreeSet<Vec<u8>>> {
        let results: Vec<partition::Result<BTreeSet<Vec<u8>>>> = std::thread::scope(|scope| {
            let handles: Vec<_> = self
                .partitions
                .iter()
                .map(|partition| scope.spawn(|| partition.sorted_keys()))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("partition sorted_keys thread panicked"))
                .collect()
        });

        let mut merged = BTreeSet::new();
        for keys in results {
            merged.extend(keys?);
        }
        Ok(merged)
    }

    /// Runs one housekeeping tick on every locally owned partition, in
    /// parallel, for the same reason `sorted_keys` does.
    pub fn housekeeping(&mut self) -> Result<()> {
        let results: Vec<partition::Result<()>> = std::thread::scope(|scope| {
            let handles: Vec<_> = self
                .partitions
                .iter_mut()
                .map(|partition| scope.spawn(|| partition.housekeeping()))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("partition housekeeping thread panicked"))
                .collect()
        });
        for result in results {
            result?;
        }
        Ok(())
    }

    /// Number of partitions this unit owns.
    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }
}
