use strata_io::PersistError;
use strata_voxel::VoxelError;
use strata_world::{WorldError, WorldId};

use crate::registry::SlotState;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("world id {0} is already in use")]
    DuplicateId(WorldId),
    #[error("no world with id {0}")]
    NotFound(WorldId),
    #[error("no loaded world '{0}'")]
    UnknownWorld(String),
    #[error("world {id} has {viewers} viewer(s)")]
    InUse { id: WorldId, viewers: usize },
    #[error("world {id} is {state:?}, expected {expected:?}")]
    InvalidState {
        id: WorldId,
        state: SlotState,
        expected: SlotState,
    },
    #[error("{0} action panicked")]
    Panicked(&'static str),
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error(transparent)]
    World(#[from] WorldError),
}

impl From<VoxelError> for RegistryError {
    fn from(e: VoxelError) -> Self {
        RegistryError::World(WorldError::Voxel(e))
    }
}
