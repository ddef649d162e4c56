//! Live worlds: block edits, physics, viewers and entities.
#![forbid(unsafe_code)]

pub mod entity;
pub mod error;
pub mod hooks;
pub mod meta;
pub mod physics;
pub mod sink;
mod world;

pub use entity::{EntityId, EntityRecord, ViewerId, WorldEntitySet};
pub use error::WorldError;
pub use hooks::{FillContext, FillHook, Hooks, PhysicsHook};
pub use meta::{Environment, HackControl, Permissions, RankBox, Teleporter, WorldMeta};
pub use physics::{PendingEdit, PhysicsContext, PhysicsQueue, PhysicsReport};
pub use sink::{NullSink, RecordingSink, SinkEvent, ViewerSink};
pub use strata_edit::{BlockUpdate, WorldId};
pub use world::{
    ACTOR_PRIORITY, Actor, EditFlags, EditMode, EditOutcome, TickGuard, World, WorldSettings,
    WorldSnapshot,
};
