//! # Config
//!
//! Process-wide configuration for the pkvs storage engine, shared by the
//! `server` binary and every execution unit it spawns.
//!
//! `Config` is built once at startup (from CLI flags in the common case) and
//! handed by value to each unit; nothing in this crate mutates it after
//! construction.

use std::io;
use std::path::PathBuf;

/// Number of logical key-space partitions. Fixed by the on-disk format: a
/// partition's directory name is its index in `0..SEGMENT_COUNT`, and
/// changing this constant would silently reroute every existing key.
pub const SEGMENT_COUNT: usize = 256;

/// Name of the marker file, written under `data_dir`, recording the unit
/// count a database was created with.
pub const UNITS_MARKER_FILENAME: &str = "UNITS";

/// Process-wide configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// HTTP listen port.
    pub port: u16,
    /// Per-partition soft memory budget (bytes) before eviction kicks in.
    pub memory_threshold: u64,
    /// Number of execution units (one OS thread per unit).
    pub units: usize,
    /// Root directory for all partition state.
    pub data_dir: PathBuf,
}

impl Config {
    /// Directory for a given logical partition (`0..SEGMENT_COUNT`).
    pub fn partition_dir(&self, segment_no: usize) -> PathBuf {
        self.data_dir.join(segment_no.to_string())
    }

    /// Path to the `UNITS` marker file.
    pub fn units_marker_path(&self) -> PathBuf {
        self.data_dir.join(UNITS_MARKER_FILENAME)
    }

    /// Validates `self.units` against the marker file left by a prior run,
    /// writing one if this is a fresh `data_dir`. Routing (`partition_index`,
    /// `shard_of`) is a function of `units`, so changing it across restarts
    /// would silently reroute every existing key; this is the guard against
    /// that.
    pub fn ensure_units_marker(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        let path = self.units_marker_path();
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                let recorded: usize = contents.trim().parse().map_err(|_| {
                    io::Error::new(io::ErrorKind::InvalidData, format!("{path:?} is not a valid unit count"))
                })?;
                if recorded != self.units {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!(
                            "data_dir was created with units={recorded}, but this run was started with units={}",
                            self.units
                        ),
                    ));
                }
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                std::fs::write(&path, self.units.to_string())
            }
            Err(e) => Err(e),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            memory_threshold: 100_000_000,
            units: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            data_dir: PathBuf::from("pkvs_data"),
        }
    }
}
