use parking_lot::Mutex;
use strata_blocks::BlockId;
use strata_geom::Vec3S;

use crate::entity::ViewerId;
use crate::{BlockUpdate, WorldId};

/// Outbound notifications to connected viewers. Implemented by the network layer.
pub trait ViewerSink: Send + Sync {
    fn block_changed(&self, viewer: ViewerId, pos: Vec3S, ty: BlockId);

    /// One batch per viewer per tick.
    fn block_changes(&self, viewer: ViewerId, updates: &[BlockUpdate]) {
        for u in updates {
            self.block_changed(viewer, u.pos, u.ty);
        }
    }

    /// Full world transfer to a viewer that is joining or must reload.
    fn world_snapshot(&self, viewer: ViewerId, world: WorldId);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ViewerSink for NullSink {
    fn block_changed(&self, _viewer: ViewerId, _pos: Vec3S, _ty: BlockId) {}
    fn world_snapshot(&self, _viewer: ViewerId, _world: WorldId) {}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SinkEvent {
    Block {
        viewer: ViewerId,
        pos: Vec3S,
        ty: BlockId,
    },
    Snapshot {
        viewer: ViewerId,
        world: WorldId,
    },
}

/// Keeps every notification in order; for tests and tooling.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<SinkEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn block_events_for(&self, viewer: ViewerId) -> Vec<(Vec3S, BlockId)> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match *e {
                SinkEvent::Block { viewer: v, pos, ty } if v == viewer => Some((pos, ty)),
                _ => None,
            })
            .collect()
    }
}

impl ViewerSink for RecordingSink {
    fn block_changed(&self, viewer: ViewerId, pos: Vec3S, ty: BlockId) {
        self.events.lock().push(SinkEvent::Block { viewer, pos, ty });
    }

    fn world_snapshot(&self, viewer: ViewerId, world: WorldId) {
        self.events.lock().push(SinkEvent::Snapshot { viewer, world });
    }
}
