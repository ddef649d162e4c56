use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, unbounded};
use hashbrown::HashSet;
use parking_lot::Mutex;
use strata_geom::{BlockBox, Dims, Vec3S};
use strata_voxel::SYSTEM_ACTOR;
use strata_world::{ViewerSink, WorldId};

use crate::error::RegistryError;
use crate::registry::{SlotState, WorldRegistry};

pub type ActionId = u64;

/// Deferred structural work on one world.
#[derive(Clone, Debug, PartialEq)]
pub enum ActionKind {
    /// Save to `to`, or to the world's own directory.
    Save { to: Option<PathBuf> },
    /// Load into an unloaded slot, or reload a loaded one.
    Load { from: PathBuf },
    Resize { dims: Dims },
    Fill { hook: String, args: String },
    Delete,
    /// Paste a region file with its origin at `at`, each cell scaled up by `scale`.
    Import { path: PathBuf, at: Vec3S, scale: Dims },
    Export { path: PathBuf, area: BlockBox, origin: Vec3S },
}

impl ActionKind {
    pub fn label(&self) -> &'static str {
        match self {
            ActionKind::Save { .. } => "save",
            ActionKind::Load { .. } => "load",
            ActionKind::Resize { .. } => "resize",
            ActionKind::Fill { .. } => "fill",
            ActionKind::Delete => "delete",
            ActionKind::Import { .. } => "import",
            ActionKind::Export { .. } => "export",
        }
    }
}

#[derive(Clone, Debug)]
struct Action {
    id: ActionId,
    world: WorldId,
    kind: ActionKind,
}

#[derive(Debug)]
pub struct ActionOutcome {
    pub id: ActionId,
    pub world: WorldId,
    pub kind: ActionKind,
    pub result: Result<(), RegistryError>,
}

/// FIFO of structural actions run one at a time by a single worker thread.
pub struct ActionQueue {
    tx: Option<Sender<Action>>,
    results: Receiver<ActionOutcome>,
    queued: Arc<Mutex<HashSet<ActionId>>>,
    next_id: AtomicU64,
    worker: Option<JoinHandle<()>>,
}

impl ActionQueue {
    pub fn start(registry: Arc<WorldRegistry>, sink: Arc<dyn ViewerSink>) -> std::io::Result<Self> {
        let (tx, rx) = unbounded::<Action>();
        let (res_tx, results) = unbounded::<ActionOutcome>();
        let queued = Arc::new(Mutex::new(HashSet::new()));
        let worker = {
            let queued = Arc::clone(&queued);
            thread::Builder::new()
                .name("strata-actions".into())
                .spawn(move || {
                    while let Ok(action) = rx.recv() {
                        if !queued.lock().remove(&action.id) {
                            log::debug!("action {} cancelled", action.id);
                            continue;
                        }
                        let result = catch_unwind(AssertUnwindSafe(|| {
                            run_action(&registry, sink.as_ref(), &action)
                        }))
                        .unwrap_or_else(|_| Err(RegistryError::Panicked(action.kind.label())));
                        match &result {
                            Ok(()) => log::info!(
                                "action {} ({}) on world {} done",
                                action.id,
                                action.kind.label(),
                                action.world
                            ),
                            Err(e) => log::warn!(
                                "action {} ({}) on world {} failed: {e}",
                                action.id,
                                action.kind.label(),
                                action.world
                            ),
                        }
                        let _ = res_tx.send(ActionOutcome {
                            id: action.id,
                            world: action.world,
                            kind: action.kind,
                            result,
                        });
                    }
                })?
        };
        Ok(Self {
            tx: Some(tx),
            results,
            queued,
            next_id: AtomicU64::new(1),
            worker: Some(worker),
        })
    }

    /// Queues an action; `None` after shutdown.
    pub fn submit(&self, world: WorldId, kind: ActionKind) -> Option<ActionId> {
        let tx = self.tx.as_ref()?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.queued.lock().insert(id);
        if tx.send(Action { id, world, kind }).is_err() {
            self.queued.lock().remove(&id);
            return None;
        }
        Some(id)
    }

    /// Withdraws an action the worker has not picked up yet.
    pub fn cancel(&self, id: ActionId) -> bool {
        self.queued.lock().remove(&id)
    }

    pub fn pending(&self) -> usize {
        self.queued.lock().len()
    }

    pub fn results(&self) -> &Receiver<ActionOutcome> {
        &self.results
    }

    pub fn drain_results(&self) -> Vec<ActionOutcome> {
        self.results.try_iter().collect()
    }

    /// Runs what is still queued, then stops the worker.
    pub fn shutdown(&mut self) {
        self.tx.take();
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                log::error!("action worker panicked");
            }
        }
    }
}

impl Drop for ActionQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_action(
    registry: &WorldRegistry,
    sink: &dyn ViewerSink,
    action: &Action,
) -> Result<(), RegistryError> {
    let id = action.world;
    match &action.kind {
        ActionKind::Save { to: Some(dir) } => registry.save_to(id, dir),
        ActionKind::Save { to: None } => registry.save(id),
        ActionKind::Load { from } => match registry.state(id) {
            Some(SlotState::Loaded) => {
                registry.reload_from(id, from)?;
                if let Some(world) = registry.get(id) {
                    world.resend_all(sink);
                }
                Ok(())
            }
            _ => registry.load(id, from).map(|_| ()),
        },
        ActionKind::Resize { dims } => {
            let world = registry.get(id).ok_or(RegistryError::NotFound(id))?;
            world.resize(*dims)?;
            world.resend_all(sink);
            Ok(())
        }
        ActionKind::Fill { hook, args } => {
            let world = registry.get(id).ok_or(RegistryError::NotFound(id))?;
            let result = world.fill(hook, args, &registry.hooks());
            // A panicking fill may still have written cells.
            world.resend_all(sink);
            result.map_err(RegistryError::from)
        }
        ActionKind::Delete => registry.delete(id),
        ActionKind::Import { path, at, scale } => {
            let world = registry.get(id).ok_or(RegistryError::NotFound(id))?;
            let region = strata_io::import_region(path)?.scaled(scale.x, scale.y, scale.z)?;
            let Some((corner, cells)) = region.placed_at(*at)? else {
                log::info!("world {id}: nothing of {} lands inside", path.display());
                return Ok(());
            };
            let written = world.paste_region(corner, &cells, SYSTEM_ACTOR)?;
            log::info!("world {id}: imported {written} cells from {}", path.display());
            Ok(())
        }
        ActionKind::Export { path, area, origin } => {
            let world = registry.get(id).ok_or(RegistryError::NotFound(id))?;
            let cut = world.export_region(area)?;
            let Some(full) = cut.dims().full_box() else {
                return Ok(());
            };
            strata_io::export_region(&cut, &full, *origin, path)?;
            Ok(())
        }
    }
}
