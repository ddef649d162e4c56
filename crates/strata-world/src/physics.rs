use std::collections::{BTreeMap, VecDeque};
use std::time::{Duration, Instant};

use rand::Rng;
use strata_blocks::{AIR, BlockId, PhysicsKind};
use strata_geom::{Dims, Vec3S};
use strata_voxel::{ActorNumber, SYSTEM_ACTOR, VoxelBuffer};

use crate::WorldId;

/// Cells to revisit, bucketed by due time. Entries sharing a due time fire in
/// the order they were scheduled; the same cell may be queued many times.
#[derive(Debug, Default, Clone)]
pub struct PhysicsQueue {
    by_due: BTreeMap<Instant, VecDeque<Vec3S>>,
    len: usize,
}

impl PhysicsQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, pos: Vec3S, due: Instant) {
        self.by_due.entry(due).or_default().push_back(pos);
        self.len += 1;
    }

    /// Removes every entry due at or before `now`, earliest first.
    pub fn pop_due(&mut self, now: Instant) -> Vec<Vec3S> {
        let mut out = Vec::new();
        while let Some(entry) = self.by_due.first_entry() {
            if *entry.key() > now {
                break;
            }
            out.extend(entry.remove());
        }
        self.len -= out.len();
        out
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.by_due.keys().next().copied()
    }

    pub fn retain_in(&mut self, dims: Dims) {
        for q in self.by_due.values_mut() {
            q.retain(|p| dims.contains(*p));
        }
        self.by_due.retain(|_, q| !q.is_empty());
        self.len = self.by_due.values().map(VecDeque::len).sum();
    }

    pub fn clear(&mut self) {
        self.by_due.clear();
        self.len = 0;
    }
}

/// An edit produced by a physics callback, applied at the start of the next tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingEdit {
    pub pos: Vec3S,
    pub ty: BlockId,
    pub actor: ActorNumber,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PhysicsReport {
    pub applied: usize,
    pub fired: usize,
    pub panicked: usize,
}

/// What a physics behavior may see and do for one due cell. Reads observe
/// edits already queued this tick; writes are only queued.
pub struct PhysicsContext<'a> {
    pub world: WorldId,
    pub pos: Vec3S,
    pub ty: BlockId,
    voxels: &'a VoxelBuffer,
    edits: &'a mut Vec<PendingEdit>,
}

impl<'a> PhysicsContext<'a> {
    pub(crate) fn new(
        world: WorldId,
        pos: Vec3S,
        ty: BlockId,
        voxels: &'a VoxelBuffer,
        edits: &'a mut Vec<PendingEdit>,
    ) -> Self {
        Self {
            world,
            pos,
            ty,
            voxels,
            edits,
        }
    }

    #[inline]
    pub fn dims(&self) -> Dims {
        self.voxels.dims()
    }

    pub fn get(&self, p: Vec3S) -> Option<BlockId> {
        if let Some(e) = self.edits.iter().rev().find(|e| e.pos == p) {
            return Some(e.ty);
        }
        self.voxels.get(p).ok()
    }

    #[inline]
    pub fn is_air(&self, p: Vec3S) -> bool {
        self.get(p) == Some(AIR)
    }

    /// Queues a write; out-of-bounds cells are ignored.
    pub fn set(&mut self, p: Vec3S, ty: BlockId) {
        if self.voxels.contains(p) {
            self.edits.push(PendingEdit {
                pos: p,
                ty,
                actor: SYSTEM_ACTOR,
            });
        }
    }

    fn move_to(&mut self, p: Vec3S) {
        self.set(p, self.ty);
        self.set(self.pos, AIR);
    }

    fn air_below(&self) -> Option<Vec3S> {
        self.pos.below().filter(|b| self.is_air(*b))
    }
}

pub(crate) fn run_builtin(kind: PhysicsKind, ctx: &mut PhysicsContext<'_>, rng: &mut impl Rng) {
    match kind {
        PhysicsKind::None => {}
        PhysicsKind::Fall => {
            if let Some(b) = ctx.air_below() {
                ctx.move_to(b);
            }
        }
        PhysicsKind::FallSlide => {
            if let Some(b) = ctx.air_below() {
                ctx.move_to(b);
                return;
            }
            let slide = ctx
                .pos
                .horizontal_neighbors()
                .filter(|n| ctx.is_air(*n))
                .filter_map(|n| n.below())
                .find(|d| ctx.is_air(*d));
            if let Some(d) = slide {
                ctx.move_to(d);
            }
        }
        PhysicsKind::Spread => {
            let targets: Vec<Vec3S> = ctx
                .pos
                .below()
                .into_iter()
                .chain(ctx.pos.horizontal_neighbors())
                .filter(|p| ctx.is_air(*p))
                .collect();
            let ty = ctx.ty;
            for t in targets {
                ctx.set(t, ty);
            }
        }
        PhysicsKind::Flow => {
            if let Some(b) = ctx.air_below() {
                ctx.move_to(b);
                return;
            }
            let open: Vec<Vec3S> = ctx
                .pos
                .horizontal_neighbors()
                .filter(|p| ctx.is_air(*p))
                .collect();
            if !open.is_empty() {
                let pick = open[rng.gen_range(0..open.len())];
                ctx.move_to(pick);
            }
        }
    }
}

/// Uniform extra delay in `0..=max`, millisecond resolution.
pub(crate) fn jitter(max: Duration) -> Duration {
    let ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
    if ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..=ms))
}
