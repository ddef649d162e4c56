//! Block definitions, permissions and physics behaviors.
#![forbid(unsafe_code)]

pub mod config;
pub mod registry;
pub mod shared;
pub mod types;

pub use config::{BlockConfigError, BlockDef, BlocksConfig};
pub use registry::{BlockRegistry, PermissionOracle};
pub use shared::SharedBlocks;
pub use types::{AIR, BlockId, BlockType, PhysicsBehavior, PhysicsHandler, PhysicsKind, Rank};
