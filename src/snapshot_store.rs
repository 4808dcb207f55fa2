use crate::types::TopologySnapshot;
use std::sync::{Arc, Mutex};
use tracing::trace;

/// Process-wide holder of the latest finalized topology snapshot.
///
/// Every accepted gateway report mints a new generation before its probe
/// round starts; a round may only publish its snapshot while its generation
/// is still the newest one minted. A slow round that was superseded by a
/// later report finishes normally but its publish is silently discarded.
#[derive(Clone)]
pub struct SnapshotStore {
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    latest_generation: u64,
    current: TopologySnapshot,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                latest_generation: 0,
                current: TopologySnapshot::empty(),
            })),
        }
    }

    /// Mint the generation for a new probe round.
    pub fn begin_round(&self) -> u64 {
        let mut inner = self.inner.lock().unwrap();
        inner.latest_generation += 1;
        inner.latest_generation
    }

    /// Swap in a finalized snapshot. Returns false (and drops the snapshot)
    /// when `generation` has been superseded by a newer round.
    pub fn publish(&self, generation: u64, snapshot: TopologySnapshot) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if generation != inner.latest_generation {
            trace!(
                "discarding stale round {} (latest is {})",
                generation,
                inner.latest_generation
            );
            return false;
        }
        inner.current = snapshot;
        true
    }

    /// The latest finalized snapshot, or the empty snapshot before any
    /// round has ever finalized.
    pub fn current(&self) -> TopologySnapshot {
        self.inner.lock().unwrap().current.clone()
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
