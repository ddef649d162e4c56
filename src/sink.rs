use std::sync::atomic::{AtomicU64, Ordering};

use strata_blocks::BlockId;
use strata_geom::Vec3S;
use strata_world::{BlockUpdate, ViewerId, ViewerSink, WorldId};

/// Stand-in for the network layer: reports traffic to the log and counts it.
#[derive(Debug, Default)]
pub struct LogSink {
    updates: AtomicU64,
    snapshots: AtomicU64,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates_sent(&self) -> u64 {
        self.updates.load(Ordering::Relaxed)
    }

    pub fn snapshots_sent(&self) -> u64 {
        self.snapshots.load(Ordering::Relaxed)
    }
}

impl ViewerSink for LogSink {
    fn block_changed(&self, viewer: ViewerId, pos: Vec3S, ty: BlockId) {
        self.updates.fetch_add(1, Ordering::Relaxed);
        log::trace!("viewer {viewer}: {pos:?} -> {ty}");
    }

    fn block_changes(&self, viewer: ViewerId, updates: &[BlockUpdate]) {
        self.updates.fetch_add(updates.len() as u64, Ordering::Relaxed);
        log::debug!("viewer {viewer}: {} block update(s)", updates.len());
    }

    fn world_snapshot(&self, viewer: ViewerId, world: WorldId) {
        self.snapshots.fetch_add(1, Ordering::Relaxed);
        log::debug!("viewer {viewer}: sending world {world}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_batches_and_snapshots() {
        let sink = LogSink::new();
        let updates = [
            BlockUpdate { pos: Vec3S::ZERO, ty: 1 },
            BlockUpdate { pos: Vec3S::new(1, 0, 0), ty: 2 },
        ];
        sink.block_changes(3, &updates);
        sink.block_changed(3, Vec3S::ZERO, 0);
        sink.world_snapshot(3, 0);
        assert_eq!(sink.updates_sent(), 3);
        assert_eq!(sink.snapshots_sent(), 1);
    }
}
