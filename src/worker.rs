//! Worker aggregator: consumes lines from the buffer pool, parses them, and
//! updates a private per-worker owner index. Workers touch no process-wide
//! state; the only cross-thread channels are the buffer pool's two queues.

use crate::arena::Arena;
use crate::buffer_pool::{BufferPool, Slot};
use crate::config::{ReducerConfig, MIN_SIZE};
use crate::error::{fatal, ReduceError};
use crate::owner::{FinalOwner, Object, Owner};
use crate::record::{parse_line, RecordKind};
use std::collections::BTreeMap;

pub struct WorkerState {
    pub idx: usize,
    arena: &'static mut Arena,
    owners: BTreeMap<&'static str, Owner>,
}

impl WorkerState {
    pub fn new(idx: usize, arena: &'static mut Arena) -> Self {
        Self { idx, arena, owners: BTreeMap::new() }
    }

    /// Process one input line: parse to a `Record`, drop it if its namespace
    /// isn't configured, then update the owning `Owner`'s counters and, for
    /// objects, its object index.
    pub fn on_line(&mut self, line: &str, config: &ReducerConfig) -> Result<(), ReduceError> {
        let rec = parse_line(line)?;

        let nsid = match config.namespace_index(&rec.namespace) {
            Some(nsid) => nsid,
            None => return Ok(()),
        };

        if !self.owners.contains_key(rec.owner.as_str()) {
            let uuid = self.arena.alloc_str(&rec.owner)?;
            self.owners.insert(uuid, Owner::new(uuid));
        }
        let owner = self.owners.get_mut(rec.owner.as_str()).expect("owner just ensured present");

        match rec.kind {
            RecordKind::Directory => {
                owner.dirs[nsid] += 1;
            }
            RecordKind::Object => {
                if !owner.objects.contains_key(rec.object_id.as_str()) {
                    let uuid = self.arena.alloc_str(&rec.object_id)?;
                    let size_bytes = rec.length_bytes.max(MIN_SIZE) * rec.replica_count;
                    owner.objects.insert(uuid, Object { uuid, nsid, size_bytes });
                    owner.objs[nsid] += 1;
                    owner.bytes[nsid] += size_bytes;
                }
                owner.keys[nsid] += 1;
            }
        }

        Ok(())
    }

    /// Flatten the sorted owner/object maps into sorted lists. After this,
    /// the trees are dead; only the flat lists are consulted by merging.
    pub fn finalize(self) -> Vec<FinalOwner> {
        self.owners.into_values().map(FinalOwner::from).collect()
    }
}

/// The body of a worker thread: block on the active queue until a sentinel
/// arrives, parsing and aggregating every line in between. Any parse or
/// arena-exhaustion error is fatal to the whole process; there is no
/// per-record recovery.
pub fn run_worker(idx: usize, arena: &'static mut Arena, pool: &BufferPool, config: &ReducerConfig) -> Vec<FinalOwner> {
    let mut state = WorkerState::new(idx, arena);

    loop {
        match pool.get_active() {
            Slot::Sentinel => break,
            Slot::Line(line) => {
                if let Err(e) = state.on_line(&line, config) {
                    fatal(e);
                }
                pool.put_free(line);
            }
        }
    }

    state.finalize()
}
