use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use hashbrown::HashMap;
use parking_lot::RwLock;
use strata_blocks::SharedBlocks;
use strata_geom::{Dims, Location};
use strata_io::{MapEntry, MapList, PersistError};
use strata_world::{
    EntityId, Hooks, Permissions, TickGuard, ViewerSink, World, WorldId, WorldSettings,
};

use crate::error::RegistryError;

/// Lifecycle of a world slot. Deleted slots are removed outright.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotState {
    Unloaded,
    Loading,
    Loaded,
    Unloading,
}

#[derive(Debug)]
struct Slot {
    name: String,
    directory: PathBuf,
    unique_id: String,
    state: SlotState,
    world: Option<Arc<World>>,
}

impl Slot {
    fn occupied(&self) -> bool {
        self.state != SlotState::Unloaded
    }
}

/// What one maintenance tick did to one world.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub physics_fired: usize,
    pub physics_applied: usize,
    pub notified: usize,
    pub saved: bool,
}

impl std::ops::AddAssign for TickReport {
    fn add_assign(&mut self, rhs: Self) {
        self.physics_fired += rhs.physics_fired;
        self.physics_applied += rhs.physics_applied;
        self.notified += rhs.notified;
        self.saved |= rhs.saved;
    }
}

/// Owns every world of the process. Slot bookkeeping is done under a short
/// write lock; disk I/O always happens outside it.
pub struct WorldRegistry {
    data_dir: PathBuf,
    blocks: SharedBlocks,
    settings: WorldSettings,
    hooks: RwLock<Arc<Hooks>>,
    slots: RwLock<HashMap<WorldId, Slot>>,
}

impl WorldRegistry {
    pub fn new(data_dir: impl Into<PathBuf>, blocks: SharedBlocks, settings: WorldSettings) -> Self {
        Self {
            data_dir: data_dir.into(),
            blocks,
            settings,
            hooks: RwLock::new(Arc::new(Hooks::new())),
            slots: RwLock::new(HashMap::new()),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn blocks(&self) -> &SharedBlocks {
        &self.blocks
    }

    pub fn hooks(&self) -> Arc<Hooks> {
        Arc::clone(&self.hooks.read())
    }

    pub fn set_hooks(&self, hooks: Hooks) {
        *self.hooks.write() = Arc::new(hooks);
    }

    /// Default directory for a world created under `name`.
    pub fn default_directory(&self, name: &str) -> PathBuf {
        self.data_dir.join("worlds").join(name)
    }

    // ---- lifecycle ----

    /// Creates a zero-filled, loaded world.
    pub fn add(&self, id: WorldId, name: &str, dims: Dims) -> Result<Arc<World>, RegistryError> {
        let mut slots = self.slots.write();
        if slots.get(&id).is_some_and(Slot::occupied) {
            return Err(RegistryError::DuplicateId(id));
        }
        let world = Arc::new(World::new(id, name, dims, self.blocks.clone(), self.settings)?);
        slots.insert(
            id,
            Slot {
                name: name.to_string(),
                directory: self.default_directory(name),
                unique_id: world.unique_id(),
                state: SlotState::Loaded,
                world: Some(Arc::clone(&world)),
            },
        );
        log::info!(
            "world {id} '{name}' created ({}x{}x{})",
            dims.x,
            dims.y,
            dims.z
        );
        Ok(world)
    }

    /// Smallest id without a slot.
    pub fn next_free_id(&self) -> WorldId {
        let slots = self.slots.read();
        (0..).find(|id| !slots.contains_key(id)).unwrap_or(WorldId::MAX)
    }

    /// Records an unloaded world that can later be loaded by id.
    pub fn register(&self, entry: &MapEntry) -> Result<(), RegistryError> {
        let mut slots = self.slots.write();
        if slots.contains_key(&entry.id) {
            return Err(RegistryError::DuplicateId(entry.id));
        }
        slots.insert(
            entry.id,
            Slot {
                name: entry.name.clone(),
                directory: MapList::resolve(&self.data_dir, entry),
                unique_id: entry.unique_id.clone(),
                state: SlotState::Unloaded,
                world: None,
            },
        );
        Ok(())
    }

    /// Deserializes the world in `directory` into slot `id`. On failure the slot
    /// is left unloaded and the error is returned.
    pub fn load(&self, id: WorldId, directory: &Path) -> Result<Arc<World>, RegistryError> {
        // Registered slots go back to their old directory on failure; slots
        // created here are dropped again.
        let previous = {
            let mut slots = self.slots.write();
            let created = !slots.contains_key(&id);
            let slot = slots.entry(id).or_insert_with(|| Slot {
                name: String::new(),
                directory: directory.to_path_buf(),
                unique_id: String::new(),
                state: SlotState::Unloaded,
                world: None,
            });
            if slot.state != SlotState::Unloaded {
                return Err(RegistryError::InvalidState {
                    id,
                    state: slot.state,
                    expected: SlotState::Unloaded,
                });
            }
            slot.state = SlotState::Loading;
            let old = std::mem::replace(&mut slot.directory, directory.to_path_buf());
            (!created).then_some(old)
        };

        let loaded = strata_io::load(directory);

        let mut slots = self.slots.write();
        let Some(slot) = slots.get_mut(&id) else {
            return Err(RegistryError::NotFound(id));
        };
        match loaded {
            Ok(snapshot) => {
                let world = Arc::new(World::from_snapshot(
                    id,
                    snapshot,
                    self.blocks.clone(),
                    self.settings,
                ));
                slot.name = world.name();
                slot.unique_id = world.unique_id();
                slot.state = SlotState::Loaded;
                slot.world = Some(Arc::clone(&world));
                log::info!("world {id} '{}' loaded from {}", slot.name, directory.display());
                Ok(world)
            }
            Err(e) => {
                match previous {
                    Some(old) => {
                        slot.state = SlotState::Unloaded;
                        slot.directory = old;
                    }
                    None => {
                        slots.remove(&id);
                    }
                }
                log::warn!("world {id}: load from {} failed: {e}", directory.display());
                Err(e.into())
            }
        }
    }

    /// Loads a registered world from its recorded directory.
    pub fn load_registered(&self, id: WorldId) -> Result<Arc<World>, RegistryError> {
        let dir = self.directory_of(id).ok_or(RegistryError::NotFound(id))?;
        self.load(id, &dir)
    }

    /// Replaces a loaded world's state with what is on disk. Edits are refused
    /// while the file is read.
    pub fn reload(&self, id: WorldId) -> Result<(), RegistryError> {
        let dir = self.directory_of(id).ok_or(RegistryError::NotFound(id))?;
        self.reload_from(id, &dir)
    }

    pub fn reload_from(&self, id: WorldId, directory: &Path) -> Result<(), RegistryError> {
        let world = self.loaded(id)?;
        world.set_loading(true);
        match strata_io::load(directory) {
            Ok(snapshot) => {
                world.restore(snapshot);
                log::info!("world {id} reloaded from {}", directory.display());
                Ok(())
            }
            Err(e) => {
                world.set_loading(false);
                Err(e.into())
            }
        }
    }

    /// Saves and drops a world without viewers.
    pub fn unload(&self, id: WorldId) -> Result<(), RegistryError> {
        let (world, dir) = self.transition(id, SlotState::Loaded, SlotState::Unloading)?;
        let viewers = world.viewer_count();
        if viewers > 0 {
            self.set_state(id, SlotState::Loaded);
            return Err(RegistryError::InUse { id, viewers });
        }
        if let Err(e) = self.save_world_to(&world, &dir) {
            self.set_state(id, SlotState::Loaded);
            return Err(e);
        }
        if let Some(slot) = self.slots.write().get_mut(&id) {
            slot.state = SlotState::Unloaded;
            slot.world = None;
        }
        log::info!("world {id} unloaded");
        Ok(())
    }

    /// Removes the slot and the world's directory. Irreversible.
    pub fn delete(&self, id: WorldId) -> Result<(), RegistryError> {
        let dir = {
            let mut slots = self.slots.write();
            let slot = slots.get(&id).ok_or(RegistryError::NotFound(id))?;
            match slot.state {
                SlotState::Loaded | SlotState::Unloaded => {}
                other => {
                    return Err(RegistryError::InvalidState {
                        id,
                        state: other,
                        expected: SlotState::Loaded,
                    });
                }
            }
            if let Some(w) = &slot.world {
                let viewers = w.viewer_count();
                if viewers > 0 {
                    return Err(RegistryError::InUse { id, viewers });
                }
            }
            let slot = slots.remove(&id).ok_or(RegistryError::NotFound(id))?;
            slot.directory
        };
        match fs::remove_dir_all(&dir) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(PersistError::Io {
                    path: dir,
                    source: e,
                }
                .into());
            }
        }
        log::info!("world {id} deleted");
        Ok(())
    }

    fn transition(
        &self,
        id: WorldId,
        from: SlotState,
        to: SlotState,
    ) -> Result<(Arc<World>, PathBuf), RegistryError> {
        let mut slots = self.slots.write();
        let slot = slots.get_mut(&id).ok_or(RegistryError::NotFound(id))?;
        let world = match (&slot.world, slot.state == from) {
            (Some(w), true) => Arc::clone(w),
            _ => {
                return Err(RegistryError::InvalidState {
                    id,
                    state: slot.state,
                    expected: from,
                });
            }
        };
        slot.state = to;
        Ok((world, slot.directory.clone()))
    }

    fn set_state(&self, id: WorldId, state: SlotState) {
        if let Some(slot) = self.slots.write().get_mut(&id) {
            slot.state = state;
        }
    }

    // ---- lookups ----

    pub fn state(&self, id: WorldId) -> Option<SlotState> {
        self.slots.read().get(&id).map(|s| s.state)
    }

    pub fn get(&self, id: WorldId) -> Option<Arc<World>> {
        let slots = self.slots.read();
        let slot = slots.get(&id)?;
        (slot.state == SlotState::Loaded)
            .then(|| slot.world.clone())
            .flatten()
    }

    fn loaded(&self, id: WorldId) -> Result<Arc<World>, RegistryError> {
        self.get(id).ok_or_else(|| match self.state(id) {
            None => RegistryError::NotFound(id),
            Some(state) => RegistryError::InvalidState {
                id,
                state,
                expected: SlotState::Loaded,
            },
        })
    }

    /// Case-insensitive lookup among loaded worlds.
    pub fn find_by_name(&self, name: &str) -> Option<Arc<World>> {
        self.loaded_worlds()
            .into_iter()
            .find(|w| w.name().eq_ignore_ascii_case(name))
    }

    pub fn find_by_unique_id(&self, unique_id: &str) -> Option<Arc<World>> {
        self.loaded_worlds()
            .into_iter()
            .find(|w| w.unique_id() == unique_id)
    }

    /// Loaded worlds ordered by id.
    pub fn loaded_worlds(&self) -> Vec<Arc<World>> {
        let slots = self.slots.read();
        let mut out: Vec<Arc<World>> = slots
            .values()
            .filter(|s| s.state == SlotState::Loaded)
            .filter_map(|s| s.world.clone())
            .collect();
        out.sort_by_key(|w| w.id());
        out
    }

    pub fn directory_of(&self, id: WorldId) -> Option<PathBuf> {
        self.slots.read().get(&id).map(|s| s.directory.clone())
    }

    pub fn permissions(&self, id: WorldId) -> Option<Permissions> {
        self.get(id).map(|w| w.permissions())
    }

    // ---- entities ----

    /// Moves an entity into the loaded world with `to_unique_id`. The two
    /// worlds are never locked at the same time; on failure the entity stays
    /// in the source world.
    pub fn transfer_entity(
        &self,
        entity: EntityId,
        from: WorldId,
        to_unique_id: &str,
        location: Location,
    ) -> Result<Arc<World>, RegistryError> {
        let source = self.loaded(from)?;
        let target = self
            .find_by_unique_id(to_unique_id)
            .ok_or_else(|| RegistryError::UnknownWorld(to_unique_id.to_string()))?;
        let mut rec = source.remove_entity(entity)?;
        let previous = rec.location;
        rec.location = location;
        if let Err(e) = target.add_entity(entity, rec.clone()) {
            rec.location = previous;
            if let Err(back) = source.add_entity(entity, rec) {
                log::error!("entity {entity} lost during transfer: {back}");
            }
            return Err(e.into());
        }
        log::debug!("entity {entity} moved from world {from} to {}", target.id());
        Ok(target)
    }

    // ---- maintenance ----

    /// Claims every loaded world that is not mid-tick.
    pub fn claim_ticks(&self) -> Vec<TickGuard> {
        self.loaded_worlds()
            .iter()
            .filter_map(World::begin_tick)
            .collect()
    }

    /// Physics, broadcast and autosave for one claimed world.
    pub fn tick_world(&self, guard: &TickGuard, now: Instant, sink: &dyn ViewerSink) -> TickReport {
        let world = guard.world();
        let hooks = self.hooks();
        let physics = world.tick_physics(now, &hooks);
        let notified = world.flush_broadcast(sink);
        let mut report = TickReport {
            physics_fired: physics.fired,
            physics_applied: physics.applied,
            notified,
            saved: false,
        };
        if world.save_due(now) {
            match self.save_world(world) {
                Ok(()) => report.saved = true,
                Err(e) => log::error!("world {}: autosave failed: {e}", world.id()),
            }
        }
        report
    }

    /// One sequential pass over all loaded worlds.
    pub fn maintenance_pass(&self, now: Instant, sink: &dyn ViewerSink) -> TickReport {
        let mut total = TickReport::default();
        for guard in self.claim_ticks() {
            total += self.tick_world(&guard, now, sink);
        }
        if total.physics_fired > 0 || total.notified > 0 {
            log::debug!(
                "maintenance: physics fired={} applied={} notified={}",
                total.physics_fired,
                total.physics_applied,
                total.notified
            );
        }
        total
    }

    // ---- saving ----

    pub fn save(&self, id: WorldId) -> Result<(), RegistryError> {
        let world = self.loaded(id)?;
        self.save_world(&world)
    }

    /// Writes a copy to another directory. The world's own directory and its
    /// dirty state are unchanged.
    pub fn save_to(&self, id: WorldId, directory: &Path) -> Result<(), RegistryError> {
        let world = self.loaded(id)?;
        strata_io::save(&world.snapshot(), directory)?;
        log::info!("world {id} copied to {}", directory.display());
        Ok(())
    }

    fn save_world(&self, world: &World) -> Result<(), RegistryError> {
        let dir = self
            .directory_of(world.id())
            .ok_or(RegistryError::NotFound(world.id()))?;
        self.save_world_to(world, &dir)
    }

    fn save_world_to(&self, world: &World, dir: &Path) -> Result<(), RegistryError> {
        let snapshot = world.snapshot();
        let generation = snapshot.generation;
        strata_io::save(&snapshot, dir)?;
        world.mark_saved(generation, Instant::now());
        log::info!("world {} saved to {}", world.id(), dir.display());
        Ok(())
    }

    /// Saves every dirty loaded world. Returns how many failed.
    pub fn save_all(&self) -> usize {
        let mut failed = 0;
        for world in self.loaded_worlds() {
            if !world.is_dirty() {
                continue;
            }
            if let Err(e) = self.save_world(&world) {
                log::error!("world {}: save failed: {e}", world.id());
                failed += 1;
            }
        }
        failed
    }

    // ---- map list ----

    pub fn map_list(&self) -> MapList {
        let slots = self.slots.read();
        let mut maps: Vec<MapEntry> = slots
            .iter()
            .map(|(id, s)| MapEntry {
                id: *id,
                name: s.name.clone(),
                directory: s
                    .directory
                    .strip_prefix(&self.data_dir)
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|_| s.directory.clone()),
                unique_id: s.unique_id.clone(),
            })
            .collect();
        maps.sort_by_key(|m| m.id);
        MapList { maps }
    }

    pub fn save_map_list(&self) -> Result<(), RegistryError> {
        self.map_list().save(&self.data_dir)?;
        Ok(())
    }

    /// Registers every listed world as unloaded. Returns the entries read.
    pub fn load_map_list(&self) -> Result<MapList, RegistryError> {
        let list = MapList::load(&self.data_dir)?;
        for entry in &list.maps {
            if let Err(e) = self.register(entry) {
                log::warn!("map list entry {} '{}' skipped: {e}", entry.id, entry.name);
            }
        }
        Ok(list)
    }
}

impl std::fmt::Debug for WorldRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorldRegistry")
            .field("data_dir", &self.data_dir)
            .field("worlds", &self.slots.read().len())
            .finish_non_exhaustive()
    }
}
