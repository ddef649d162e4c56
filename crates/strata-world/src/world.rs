use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use strata_blocks::{
    AIR, BlockId, BlockRegistry, PermissionOracle, PhysicsHandler, Rank, SharedBlocks,
};
use strata_edit::{BroadcastEntry, BroadcastQueue, ChangeHistory, ChangeRecord, WorldId};
use strata_geom::{BlockBox, Dims, Location, Vec3S};
use strata_voxel::{ActorNumber, VoxelBuffer};

use crate::entity::{EntityId, EntityRecord, ViewerId, WorldEntitySet};
use crate::error::WorldError;
use crate::hooks::{FillContext, Hooks};
use crate::meta::{Permissions, RankBox, Teleporter, WorldMeta};
use crate::physics::{
    PendingEdit, PhysicsContext, PhysicsQueue, PhysicsReport, jitter, run_builtin,
};
use crate::sink::ViewerSink;

/// Broadcast priority of edits made by connected players.
pub const ACTOR_PRIORITY: u8 = 250;

const IMPORT_PRIORITY: u8 = 1;
const PHYSICS_PRIORITY: u8 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorldSettings {
    pub undo_capacity: usize,
    /// Maximum broadcast entries drained per tick; `None` drains everything.
    pub broadcast_limit: Option<usize>,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            undo_capacity: 10_000,
            broadcast_limit: None,
        }
    }
}

/// A connected player editing the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Actor {
    pub viewer: ViewerId,
    pub number: ActorNumber,
    pub rank: Rank,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditMode {
    Delete,
    Place,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditOutcome {
    Applied { old: BlockId, new: BlockId },
    /// Permission check failed; the actor was sent `old` back.
    Rejected { old: BlockId },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EditFlags {
    pub undo: bool,
    pub physics: bool,
    pub broadcast: bool,
    pub priority: u8,
}

impl EditFlags {
    pub const ACTOR: EditFlags = EditFlags {
        undo: true,
        physics: true,
        broadcast: true,
        priority: ACTOR_PRIORITY,
    };

    const PHYSICS: EditFlags = EditFlags {
        undo: false,
        physics: true,
        broadcast: true,
        priority: PHYSICS_PRIORITY,
    };

    const REPLAY: EditFlags = EditFlags {
        undo: false,
        physics: false,
        broadcast: true,
        priority: IMPORT_PRIORITY,
    };
}

/// Persistable state of a world, taken under its edit lock.
#[derive(Clone, Debug, PartialEq)]
pub struct WorldSnapshot {
    pub meta: WorldMeta,
    pub voxels: VoxelBuffer,
    /// Edit generation the snapshot reflects; 0 for snapshots read from disk.
    pub generation: u64,
}

struct WorldState {
    voxels: VoxelBuffer,
    history: ChangeHistory,
    physics: PhysicsQueue,
    broadcast: BroadcastQueue,
    pending: Vec<PendingEdit>,
}

pub struct World {
    id: WorldId,
    blocks: SharedBlocks,
    settings: WorldSettings,
    meta: RwLock<WorldMeta>,
    state: Mutex<WorldState>,
    entities: Mutex<WorldEntitySet>,
    loading: AtomicBool,
    physics_enabled: AtomicBool,
    broadcast_enabled: AtomicBool,
    ticking: AtomicBool,
    generation: AtomicU64,
    saved_generation: AtomicU64,
    last_save: Mutex<Instant>,
}

/// Clears the world's in-flight tick flag when dropped.
pub struct TickGuard {
    world: Arc<World>,
}

impl TickGuard {
    pub fn world(&self) -> &Arc<World> {
        &self.world
    }
}

impl Drop for TickGuard {
    fn drop(&mut self) {
        self.world.ticking.store(false, Ordering::Release);
    }
}

impl World {
    /// Fresh zero-filled world.
    pub fn new(
        id: WorldId,
        name: &str,
        dims: Dims,
        blocks: SharedBlocks,
        settings: WorldSettings,
    ) -> Result<World, WorldError> {
        let voxels = VoxelBuffer::new(dims)?;
        let mut meta = WorldMeta::new(name);
        meta.spawn.pos = strata_geom::Vec3::new(
            f32::from(dims.x) / 2.0,
            f32::from(dims.y) / 2.0,
            f32::from(dims.z) / 2.0,
        );
        let world = Self::assemble(id, meta, voxels, blocks, settings);
        // Unsaved from the start.
        world.generation.store(1, Ordering::Release);
        Ok(world)
    }

    /// World rebuilt from persisted state, with load-time block replacement and
    /// physics applied.
    pub fn from_snapshot(
        id: WorldId,
        snapshot: WorldSnapshot,
        blocks: SharedBlocks,
        settings: WorldSettings,
    ) -> World {
        let world = Self::assemble(id, snapshot.meta, snapshot.voxels, blocks, settings);
        world.apply_load_rules(Instant::now());
        world
    }

    fn assemble(
        id: WorldId,
        meta: WorldMeta,
        voxels: VoxelBuffer,
        blocks: SharedBlocks,
        settings: WorldSettings,
    ) -> World {
        World {
            id,
            blocks,
            settings,
            meta: RwLock::new(meta),
            state: Mutex::new(WorldState {
                voxels,
                history: ChangeHistory::new(settings.undo_capacity),
                physics: PhysicsQueue::new(),
                broadcast: BroadcastQueue::new(),
                pending: Vec::new(),
            }),
            entities: Mutex::new(WorldEntitySet::new()),
            loading: AtomicBool::new(false),
            physics_enabled: AtomicBool::new(true),
            broadcast_enabled: AtomicBool::new(true),
            ticking: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            saved_generation: AtomicU64::new(0),
            last_save: Mutex::new(Instant::now()),
        }
    }

    fn apply_load_rules(&self, now: Instant) {
        let blocks = self.blocks.current();
        let mut st = self.state.lock();
        let mut replaced = 0usize;
        let mut armed = 0usize;
        let cells: Vec<(Vec3S, BlockId)> = st.voxels.iter().collect();
        for (p, ty) in cells {
            let ty = match blocks.replace_on_load(ty) {
                Some(r) if r != ty => {
                    if st.voxels.set(p, r).is_ok() {
                        replaced += 1;
                    }
                    r
                }
                _ => ty,
            };
            if blocks.physics_on_load(ty) {
                if let Some(b) = blocks.behavior_for(ty) {
                    st.physics.schedule(p, now + b.delay + jitter(b.jitter));
                    armed += 1;
                }
            }
        }
        if replaced > 0 || armed > 0 {
            log::debug!(
                "world {}: {} cells replaced on load, {} physics entries armed",
                self.id,
                replaced,
                armed
            );
        }
    }

    #[inline]
    pub fn id(&self) -> WorldId {
        self.id
    }

    pub fn name(&self) -> String {
        self.meta.read().name.clone()
    }

    pub fn unique_id(&self) -> String {
        self.meta.read().unique_id.clone()
    }

    pub fn dims(&self) -> Dims {
        self.state.lock().voxels.dims()
    }

    pub fn meta(&self) -> WorldMeta {
        self.meta.read().clone()
    }

    /// Mutates metadata and marks the world for saving.
    pub fn update_meta<R>(&self, f: impl FnOnce(&mut WorldMeta) -> R) -> R {
        let r = f(&mut self.meta.write());
        self.touch();
        r
    }

    pub fn permissions(&self) -> Permissions {
        self.meta.read().permissions
    }

    pub fn set_spawn(&self, spawn: Location) {
        self.update_meta(|m| m.spawn = spawn);
    }

    pub fn build_rank_at(&self, pos: Vec3S) -> Rank {
        self.meta.read().build_rank_at(pos)
    }

    pub fn set_rank_box(&self, area: BlockBox, rank: Rank) {
        self.update_meta(|m| m.rank_boxes.push(RankBox { area, rank }));
    }

    pub fn add_teleporter(&self, tp: Teleporter) -> Result<(), WorldError> {
        self.update_meta(|m| {
            if m.teleporters.contains_key(&tp.id) {
                return Err(WorldError::DuplicateTeleporter(tp.id));
            }
            m.teleporters.insert(tp.id.clone(), tp);
            Ok(())
        })
    }

    pub fn remove_teleporter(&self, id: &str) -> Result<Teleporter, WorldError> {
        self.update_meta(|m| {
            m.teleporters
                .remove(id)
                .ok_or_else(|| WorldError::UnknownTeleporter(id.to_string()))
        })
    }

    pub fn teleporter(&self, id: &str) -> Option<Teleporter> {
        self.meta.read().teleporters.get(id).cloned()
    }

    // ---- lifecycle flags ----

    #[inline]
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    pub fn set_loading(&self, loading: bool) {
        self.loading.store(loading, Ordering::Release);
    }

    fn ensure_ready(&self) -> Result<(), WorldError> {
        if self.is_loading() {
            return Err(WorldError::Loading(self.id));
        }
        Ok(())
    }

    pub fn set_physics_enabled(&self, on: bool) {
        self.physics_enabled.store(on, Ordering::Release);
    }

    pub fn set_broadcast_enabled(&self, on: bool) {
        self.broadcast_enabled.store(on, Ordering::Release);
    }

    #[inline]
    fn touch(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    pub fn is_dirty(&self) -> bool {
        self.generation.load(Ordering::Acquire) != self.saved_generation.load(Ordering::Acquire)
    }

    /// Dirty and the autosave interval has passed since the last save.
    pub fn save_due(&self, now: Instant) -> bool {
        let interval = self.meta.read().save_interval;
        self.is_dirty() && now.saturating_duration_since(*self.last_save.lock()) >= interval
    }

    /// Records a successful save of the snapshot taken at `generation`.
    pub fn mark_saved(&self, generation: u64, now: Instant) {
        self.saved_generation.store(generation, Ordering::Release);
        *self.last_save.lock() = now;
    }

    /// Claims the world for one maintenance tick; `None` while a previous tick runs.
    pub fn begin_tick(self: &Arc<Self>) -> Option<TickGuard> {
        self.ticking
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| TickGuard {
                world: Arc::clone(self),
            })
    }

    // ---- reads ----

    pub fn get_block(&self, pos: Vec3S) -> Result<BlockId, WorldError> {
        Ok(self.state.lock().voxels.get(pos)?)
    }

    /// Actor that last changed the cell.
    pub fn get_block_actor(&self, pos: Vec3S) -> Result<ActorNumber, WorldError> {
        Ok(self.state.lock().voxels.get_actor(pos)?)
    }

    pub fn history_len(&self) -> usize {
        self.state.lock().history.len()
    }

    pub fn history_for(&self, pos: Vec3S) -> Vec<ChangeRecord> {
        self.state.lock().history.for_position(pos).copied().collect()
    }

    pub fn pending_broadcasts(&self) -> usize {
        self.state.lock().broadcast.len()
    }

    pub fn pending_physics(&self) -> usize {
        self.state.lock().physics.len()
    }

    /// The generation is read first; an edit racing the copy only makes the
    /// world look dirty again after the save.
    pub fn snapshot(&self) -> WorldSnapshot {
        let generation = self.generation.load(Ordering::Acquire);
        let meta = self.meta.read().clone();
        let voxels = self.state.lock().voxels.clone();
        WorldSnapshot {
            meta,
            voxels,
            generation,
        }
    }

    /// Copy of a sub-box of the buffer.
    pub fn export_region(&self, area: &BlockBox) -> Result<VoxelBuffer, WorldError> {
        Ok(self.state.lock().voxels.region(area)?)
    }

    // ---- edits ----

    /// Player edit with rank checks. A rejected edit leaves the world untouched
    /// and sends the requesting viewer the current type.
    pub fn actor_block_change(
        &self,
        actor: &Actor,
        pos: Vec3S,
        mode: EditMode,
        ty: BlockId,
        sink: &dyn ViewerSink,
    ) -> Result<EditOutcome, WorldError> {
        self.ensure_ready()?;
        let blocks = self.blocks.current();
        let build_rank = self.build_rank_at(pos);
        let now = Instant::now();
        let mut st = self.state.lock();
        let old = st.voxels.get(pos).inspect_err(|e| {
            log::warn!("world {}: actor {} edit rejected: {e}", self.id, actor.number);
        })?;
        let new = match mode {
            EditMode::Delete => blocks.after_delete(old),
            EditMode::Place => ty,
        };
        let allowed = actor.rank >= build_rank
            && (mode == EditMode::Delete || blocks.can_place(actor.rank, new))
            && (old == AIR || blocks.can_delete(actor.rank, old));
        if !allowed {
            drop(st);
            sink.block_changed(actor.viewer, pos, old);
            return Ok(EditOutcome::Rejected { old });
        }
        self.apply(&mut st, &blocks, pos, new, actor.number, EditFlags::ACTOR, now)?;
        Ok(EditOutcome::Applied { old, new })
    }

    /// Edit without permission checks (scripts, physics, replays). Returns the old type.
    pub fn block_change(
        &self,
        pos: Vec3S,
        ty: BlockId,
        actor: ActorNumber,
        flags: EditFlags,
    ) -> Result<BlockId, WorldError> {
        self.block_change_at(pos, ty, actor, flags, Instant::now())
    }

    /// As [`World::block_change`] with an explicit clock for physics due times.
    pub fn block_change_at(
        &self,
        pos: Vec3S,
        ty: BlockId,
        actor: ActorNumber,
        flags: EditFlags,
        now: Instant,
    ) -> Result<BlockId, WorldError> {
        self.ensure_ready()?;
        let blocks = self.blocks.current();
        let mut st = self.state.lock();
        self.apply(&mut st, &blocks, pos, ty, actor, flags, now)
    }

    /// Moves the block at `from` to `to`, leaving air behind.
    pub fn block_move(
        &self,
        from: Vec3S,
        to: Vec3S,
        actor: ActorNumber,
        flags: EditFlags,
    ) -> Result<(), WorldError> {
        self.ensure_ready()?;
        let blocks = self.blocks.current();
        let now = Instant::now();
        let mut st = self.state.lock();
        let ty = st.voxels.get(from)?;
        st.voxels.idx(to)?;
        if from == to {
            return Ok(());
        }
        self.apply(&mut st, &blocks, to, ty, actor, flags, now)?;
        self.apply(&mut st, &blocks, from, AIR, actor, flags, now)?;
        Ok(())
    }

    /// Edits `actor` made since `since`, newest first, are reverted to their
    /// prior types. Returns the number of cells written.
    pub fn undo_actor(&self, actor: ActorNumber, since: Instant) -> Result<usize, WorldError> {
        self.ensure_ready()?;
        let blocks = self.blocks.current();
        let now = Instant::now();
        let mut st = self.state.lock();
        let steps: Vec<ChangeRecord> = st.history.by_actor_since(actor, since).copied().collect();
        for r in &steps {
            self.apply(&mut st, &blocks, r.pos, r.before, r.actor_before, EditFlags::REPLAY, now)?;
        }
        Ok(steps.len())
    }

    /// Writes `region` with its origin at `at`, clipped to the world. No undo
    /// or physics; broadcast at low priority. Returns the number of cells written.
    pub fn paste_region(
        &self,
        at: Vec3S,
        region: &VoxelBuffer,
        actor: ActorNumber,
    ) -> Result<usize, WorldError> {
        self.ensure_ready()?;
        let blocks = self.blocks.current();
        let now = Instant::now();
        let mut st = self.state.lock();
        let dims = st.voxels.dims();
        let mut written = 0usize;
        for (p, ty) in region.iter() {
            let target = at
                .offset(i32::from(p.x), i32::from(p.y), i32::from(p.z))
                .filter(|t| dims.contains(*t));
            let Some(t) = target else {
                continue;
            };
            self.apply(&mut st, &blocks, t, ty, actor, EditFlags::REPLAY, now)?;
            written += 1;
        }
        Ok(written)
    }

    /// The single mutation path. Caller holds the edit lock.
    #[allow(clippy::too_many_arguments)]
    fn apply(
        &self,
        st: &mut WorldState,
        blocks: &BlockRegistry,
        pos: Vec3S,
        ty: BlockId,
        actor: ActorNumber,
        flags: EditFlags,
        now: Instant,
    ) -> Result<BlockId, WorldError> {
        let (old, actor_before) = st.voxels.set_with_actor(pos, ty, actor).inspect_err(|e| {
            log::warn!("world {}: edit dropped: {e}", self.id);
        })?;
        if flags.undo {
            st.history.push(ChangeRecord {
                pos,
                world: self.id,
                at: now,
                before: old,
                after: ty,
                actor_before,
                actor,
            });
        }
        if flags.physics {
            Self::arm_physics_around(st, blocks, pos, now);
        }
        if old != ty {
            if flags.broadcast {
                st.broadcast.push(BroadcastEntry {
                    pos,
                    priority: flags.priority,
                    old,
                });
            }
            self.touch();
        }
        Ok(old)
    }

    /// Queues physics for the cell and its face neighbours when their types have a behavior.
    fn arm_physics_around(st: &mut WorldState, blocks: &BlockRegistry, pos: Vec3S, now: Instant) {
        let dims = st.voxels.dims();
        for p in std::iter::once(pos).chain(pos.face_neighbors()) {
            if !dims.contains(p) {
                continue;
            }
            let Ok(ty) = st.voxels.get(p) else {
                continue;
            };
            if let Some(b) = blocks.behavior_for(ty) {
                st.physics.schedule(p, now + b.delay + jitter(b.jitter));
            }
        }
    }

    // ---- ticks ----

    /// Applies edits queued by the previous tick's behaviors, then runs the
    /// behavior of every cell whose physics entry is due.
    pub fn tick_physics(&self, now: Instant, hooks: &Hooks) -> PhysicsReport {
        let mut report = PhysicsReport::default();
        if !self.physics_enabled.load(Ordering::Acquire) || self.is_loading() {
            return report;
        }
        let blocks = self.blocks.current();
        let mut guard = self.state.lock();
        let st = &mut *guard;

        for e in std::mem::take(&mut st.pending) {
            if self
                .apply(st, &blocks, e.pos, e.ty, e.actor, EditFlags::PHYSICS, now)
                .is_ok()
            {
                report.applied += 1;
            }
        }

        let mut rng = rand::thread_rng();
        for pos in st.physics.pop_due(now) {
            let Ok(ty) = st.voxels.get(pos) else {
                continue;
            };
            let Some(behavior) = blocks.behavior_for(ty) else {
                continue;
            };
            report.fired += 1;
            {
                let mut ctx = PhysicsContext::new(self.id, pos, ty, &st.voxels, &mut st.pending);
                match &behavior.handler {
                    PhysicsHandler::Builtin(kind) => run_builtin(*kind, &mut ctx, &mut rng),
                    PhysicsHandler::Script(name) => match hooks.physics(name) {
                        Some(hook) => {
                            if catch_unwind(AssertUnwindSafe(|| hook(&mut ctx))).is_err() {
                                log::error!(
                                    "world {}: physics hook '{name}' panicked at {:?}",
                                    self.id,
                                    pos
                                );
                                report.panicked += 1;
                            }
                        }
                        None => log::debug!("world {}: no physics hook '{name}'", self.id),
                    },
                }
            }
            if behavior.repeat {
                st.physics
                    .schedule(pos, now + behavior.delay + jitter(behavior.jitter));
            }
        }
        if report.fired > 0 || report.applied > 0 {
            log::trace!(
                "world {}: physics applied={} fired={}",
                self.id,
                report.applied,
                report.fired
            );
        }
        report
    }

    /// Sends the net change of every queued cell to viewers that finished
    /// loading. The edit lock is released before the sink is called.
    pub fn flush_broadcast(&self, sink: &dyn ViewerSink) -> usize {
        if !self.broadcast_enabled.load(Ordering::Acquire) {
            return 0;
        }
        let updates = {
            let mut guard = self.state.lock();
            let st = &mut *guard;
            if st.broadcast.is_empty() {
                return 0;
            }
            let voxels = &st.voxels;
            st.broadcast
                .drain_updates(self.settings.broadcast_limit, |p| voxels.get(p).ok())
        };
        if updates.is_empty() {
            return 0;
        }
        let viewers = self.entities.lock().loaded_viewers();
        for v in viewers {
            sink.block_changes(v, &updates);
        }
        updates.len()
    }

    // ---- structural ----

    /// Reallocates the buffer; queued work for vanished cells is discarded.
    pub fn resize(&self, dims: Dims) -> Result<(), WorldError> {
        let mut st = self.state.lock();
        let old = st.voxels.dims();
        st.voxels.resize(dims)?;
        st.physics.retain_in(dims);
        st.broadcast.retain_in(dims);
        st.pending.retain(|e| dims.contains(e.pos));
        st.history.retain_in(dims);
        drop(st);
        self.touch();
        log::info!(
            "world {} resized {}x{}x{} -> {}x{}x{}",
            self.id,
            old.x,
            old.y,
            old.z,
            dims.x,
            dims.y,
            dims.z
        );
        Ok(())
    }

    /// Clears the world and runs the named fill handler under the edit lock.
    /// A panicking handler leaves whatever it wrote.
    pub fn fill(&self, hook_name: &str, args: &str, hooks: &Hooks) -> Result<(), WorldError> {
        let hook = hooks
            .fill(hook_name)
            .ok_or_else(|| WorldError::UnknownHook(hook_name.to_string()))?;
        let mut st = self.state.lock();
        st.voxels.clear();
        st.physics.clear();
        st.broadcast.clear();
        st.pending.clear();
        let mut ctx = FillContext::new(self.id, args, &mut st.voxels);
        let outcome = catch_unwind(AssertUnwindSafe(|| hook(&mut ctx)));
        drop(st);
        self.touch();
        if outcome.is_err() {
            log::error!("world {}: fill '{hook_name}' panicked", self.id);
            return Err(WorldError::HookPanicked(hook_name.to_string()));
        }
        log::info!("world {} filled with '{hook_name}'", self.id);
        Ok(())
    }

    /// Replaces buffer and metadata with persisted state. Edits are refused meanwhile.
    pub fn restore(&self, snapshot: WorldSnapshot) {
        self.set_loading(true);
        {
            let mut st = self.state.lock();
            st.voxels = snapshot.voxels;
            st.physics.clear();
            st.broadcast.clear();
            st.pending.clear();
            st.history.clear();
        }
        *self.meta.write() = snapshot.meta;
        self.apply_load_rules(Instant::now());
        let generation = self.generation.load(Ordering::Acquire);
        self.mark_saved(generation, Instant::now());
        self.set_loading(false);
    }

    // ---- viewers and entities ----

    /// Adds a viewer and starts its world transfer.
    pub fn join_viewer(&self, viewer: ViewerId, sink: &dyn ViewerSink) {
        let fresh = self.entities.lock().join_viewer(viewer);
        if fresh {
            sink.world_snapshot(viewer, self.id);
        }
    }

    /// The viewer finished receiving the world and now gets block updates.
    pub fn viewer_loaded(&self, viewer: ViewerId) -> Result<(), WorldError> {
        self.entities.lock().mark_loaded(viewer)
    }

    pub fn leave_viewer(&self, viewer: ViewerId) -> Result<(), WorldError> {
        self.entities.lock().leave_viewer(viewer).inspect_err(|e| {
            log::error!("world {}: {e}", self.id);
        })
    }

    pub fn viewer_count(&self) -> usize {
        self.entities.lock().viewer_count()
    }

    /// Every viewer reloads the world, e.g. after a resize or fill.
    pub fn resend_all(&self, sink: &dyn ViewerSink) {
        let viewers = self.entities.lock().mark_all_unloaded();
        for v in viewers {
            sink.world_snapshot(v, self.id);
        }
    }

    pub fn add_entity(&self, id: EntityId, rec: EntityRecord) -> Result<(), WorldError> {
        self.entities.lock().add_entity(id, rec)
    }

    pub fn remove_entity(&self, id: EntityId) -> Result<EntityRecord, WorldError> {
        self.entities.lock().remove_entity(id)
    }

    pub fn entity(&self, id: EntityId) -> Option<EntityRecord> {
        self.entities.lock().entity(id).cloned()
    }

    pub fn entity_ids(&self) -> Vec<EntityId> {
        self.entities.lock().entity_ids()
    }

    /// Moves an entity; returns the teleporter it stepped into, if any.
    pub fn set_entity_location(
        &self,
        id: EntityId,
        loc: Location,
    ) -> Result<Option<Teleporter>, WorldError> {
        self.entities.lock().set_location(id, loc)?;
        Ok(self.meta.read().teleporter_at(&loc).cloned())
    }

    pub fn settings(&self) -> WorldSettings {
        self.settings
    }

    pub fn block_table(&self) -> &SharedBlocks {
        &self.blocks
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("id", &self.id)
            .field("name", &self.meta.read().name)
            .field("loading", &self.is_loading())
            .finish_non_exhaustive()
    }
}
