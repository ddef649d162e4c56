use strata_voxel::VoxelError;

use crate::entity::{EntityId, ViewerId};
use crate::WorldId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    #[error(transparent)]
    Voxel(#[from] VoxelError),
    #[error("world {0} is loading")]
    Loading(WorldId),
    #[error("viewer {0} is not in this world")]
    UnknownViewer(ViewerId),
    #[error("entity {0} not found")]
    UnknownEntity(EntityId),
    #[error("entity {0} already present")]
    DuplicateEntity(EntityId),
    #[error("teleporter '{0}' already exists")]
    DuplicateTeleporter(String),
    #[error("teleporter '{0}' not found")]
    UnknownTeleporter(String),
    #[error("no hook named '{0}'")]
    UnknownHook(String),
    #[error("hook '{0}' panicked")]
    HookPanicked(String),
}

impl WorldError {
    #[inline]
    pub fn is_out_of_bounds(&self) -> bool {
        matches!(self, WorldError::Voxel(VoxelError::OutOfBounds { .. }))
    }
}
