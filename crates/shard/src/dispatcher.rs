//! Cross-shard dispatch: one OS thread per execution unit, each
//! single-threaded with respect to the partitions it owns. A request for a
//! key is marshalled to its owning unit over a bounded channel; the unit
//! replies on a one-shot channel made for that request. The only shared
//! mutable state between units is the channel itself — every [`Partition`]
//! (and the segment store and memtable behind it) is touched by exactly one
//! thread.
//!
//! [`Partition`]: partition::Partition

use std::collections::BTreeSet;
use std::thread::JoinHandle;
use std::time::Duration;

use config::Config;
use crossbeam_channel::{bounded, select, Sender};

use crate::error::{Result, ShardError};
use crate::manager::ShardManager;
use crate::routing::shard_of;

/// How often a unit's background loop runs housekeeping across its
/// partitions, matching the "~1 second" cadence described for the engine's
/// concurrency model.
pub const HOUSEKEEPING_TICK: Duration = Duration::from_secs(1);

enum Request {
    Get(Vec<u8>, Sender<Result<Option<Vec<u8>>>>),
    Insert(Vec<u8>, Vec<u8>, Sender<Result<()>>),
    Delete(Vec<u8>, Sender<Result<()>>),
    SortedKeys(Sender<Result<BTreeSet<Vec<u8>>>>),
}

/// Routes operations to the execution unit that owns the key, and fans
/// `sorted_keys()` out across every unit.
pub struct Dispatcher {
    units: usize,
    senders: Vec<Sender<Request>>,
    handles: Vec<JoinHandle<()>>,
    supervisor: Option<JoinHandle<()>>,
}

impl Dispatcher {
    /// Spawns one thread per execution unit named by `cfg.units`, each
    /// owning its slice of the key space and ticking housekeeping at
    /// [`HOUSEKEEPING_TICK`] until the dispatcher is dropped, plus a
    /// supervisor thread that aborts the whole process if any unit dies of
    /// a fatal error — a unit thread exiting on its own would otherwise
    /// leave its shard silently unreachable (every request to it would
    /// return `UnitUnavailable`) while the rest of the process kept
    /// serving.
    pub fn spawn(cfg: Config) -> Result<Self> {
        let mut senders = Vec::with_capacity(cfg.units);
        let mut handles = Vec::with_capacity(cfg.units);
        let (fatal_tx, fatal_rx) = bounded::<usize>(cfg.units);

        for unit in 0..cfg.units {
            let (tx, rx) = bounded::<Request>(64);
            let mut manager = ShardManager::open(&cfg, unit)?;
            let fatal_tx = fatal_tx.clone();
            let handle = std::thread::Builder::new()
                .name(format!("pkvs-unit-{unit}"))
                .spawn(move || run_unit(unit, &mut manager, &rx, &fatal_tx))
                .expect("failed to spawn execution unit thread");
            senders.push(tx);
            handles.push(handle);
        }
        drop(fatal_tx);

        let supervisor = std::thread::Builder::new()
            .name("pkvs-supervisor".to_string())
            .spawn(move || {
                if let Ok(unit) = fatal_rx.recv() {
                    tracing::error!(unit, "execution unit died of a fatal error, aborting process");
                    std::process::exit(1);
                }
            })
            .expect("failed to spawn supervisor thread");

        Ok(Self {
            units: cfg.units,
            senders,
            handles,
            supervisor: Some(supervisor),
        })
    }

    fn send_to_owner<T>(
        &self,
        key: &[u8],
        build: impl FnOnce(Sender<Result<T>>) -> Request,
    ) -> Result<T> {
        let (reply_tx, reply_rx) = bounded(1);
        let unit = shard_of(key, self.units);
        self.senders[unit]
            .send(build(reply_tx))
            .map_err(|_| ShardError::UnitUnavailable)?;
        reply_rx.recv().map_err(|_| ShardError::UnitUnavailable)?
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.send_to_owner(key, |reply| Request::Get(key.to_vec(), reply))
    }

    pub fn insert(&self, key: &[u8], value: Vec<u8>) -> Result<()> {
        self.send_to_owner(key, |reply| Request::Insert(key.to_vec(), value, reply))
    }

    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.send_to_owner(key, |reply| Request::Delete(key.to_vec(), reply))
    }

    /// Dispatches `sorted_keys()` to every unit in parallel and merges the
    /// results. Any single unit's failure fails the whole request.
    pub fn sorted_keys(&self) -> Result<BTreeSet<Vec<u8>>> {
        let mut receivers = Vec::with_capacity(self.units);
        for tx in &self.senders {
            let (reply_tx, reply_rx) = bounded(1);
            tx.send(Request::SortedKeys(reply_tx))
                .map_err(|_| ShardError::UnitUnavailable)?;
            receivers.push(reply_rx);
        }

        let mut merged = BTreeSet::new();
        for reply_rx in receivers {
            let keys = reply_rx.recv().map_err(|_| ShardError::UnitUnavailable)??;
            merged.extend(keys);
        }
        Ok(merged)
    }

    /// Drops every sender (closing each unit's channel, which ends its run
    /// loop), joins all unit threads, then joins the supervisor — by then
    /// every unit's fatal-signal sender has been dropped, so the
    /// supervisor observes its channel disconnect and returns without
    /// calling `process::exit`.
    pub fn shutdown(self) {
        drop(self.senders);
        for handle in self.handles {
            let _ = handle.join();
        }
        if let Some(supervisor) = self.supervisor {
            let _ = supervisor.join();
        }
    }
}

fn run_unit(
    unit: usize,
    manager: &mut ShardManager,
    rx: &crossbeam_channel::Receiver<Request>,
    fatal_tx: &Sender<usize>,
) {
    let ticker = crossbeam_channel::tick(HOUSEKEEPING_TICK);
    loop {
        select! {
            recv(rx) -> msg => {
                let Ok(request) = msg else { break };
                if !handle_request(manager, request) {
                    tracing::error!(unit, "execution unit aborting after fatal error");
                    let _ = fatal_tx.send(unit);
                    break;
                }
            }
            recv(ticker) -> _ => {
                if let Err(e) = manager.housekeeping() {
                    tracing::error!(unit, error = %e, "housekeeping failed");
                    if e.is_fatal() {
                        let _ = fatal_tx.send(unit);
                        break;
                    }
                }
            }
        }
    }
}

/// Handles one request; returns `false` if the underlying error was fatal
/// and this unit should stop serving.
fn handle_request(manager: &mut ShardManager, request: Request) -> bool {
    match request {
        Request::Get(key, reply) => {
            let result = manager.get(&key);
            let fatal = result.as_ref().err().is_some_and(ShardError::is_fatal);
            let _ = reply.send(result);
            !fatal
        }
        Request::Insert(key, value, reply) => {
            let result = manager.insert(&key, value);
            let fatal = result.as_ref().err().is_some_and(ShardError::is_fatal);
            let _ = reply.send(result);
            !fatal
        }
        Request::Delete(key, reply) => {
            let result = manager.delete(&key);
            let fatal = result.as_ref().err().is_some_and(ShardError::is_fatal);
            let _ = reply.send(result);
            !fatal
        }
        Request::SortedKeys(reply) => {
            let result = manager.sorted_keys();
            let fatal = result.as_ref().err().is_some_and(ShardError::is_fatal);
            let _ = reply.send(result);
            !fatal
        }
    }
}
