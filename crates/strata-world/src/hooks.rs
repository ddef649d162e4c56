use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use strata_blocks::BlockId;
use strata_geom::{Dims, Vec3S};
use strata_voxel::{VoxelBuffer, VoxelError};

use crate::WorldId;
use crate::physics::PhysicsContext;

pub type PhysicsHook = Arc<dyn Fn(&mut PhysicsContext<'_>) + Send + Sync>;
pub type FillHook = Arc<dyn Fn(&mut FillContext<'_>) + Send + Sync>;

/// Direct buffer access for a fill handler. The world's edit lock is held
/// while the handler runs; nothing is broadcast or recorded.
pub struct FillContext<'a> {
    pub world: WorldId,
    pub args: &'a str,
    voxels: &'a mut VoxelBuffer,
}

impl<'a> FillContext<'a> {
    pub(crate) fn new(world: WorldId, args: &'a str, voxels: &'a mut VoxelBuffer) -> Self {
        Self {
            world,
            args,
            voxels,
        }
    }

    #[inline]
    pub fn dims(&self) -> Dims {
        self.voxels.dims()
    }

    #[inline]
    pub fn get(&self, p: Vec3S) -> Result<BlockId, VoxelError> {
        self.voxels.get(p)
    }

    #[inline]
    pub fn set(&mut self, p: Vec3S, ty: BlockId) -> Result<(), VoxelError> {
        self.voxels.set(p, ty)
    }
}

/// Named handlers for scripted physics and world fills.
#[derive(Clone, Default)]
pub struct Hooks {
    physics: HashMap<String, PhysicsHook>,
    fill: HashMap<String, FillHook>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut physics: Vec<&String> = self.physics.keys().collect();
        let mut fill: Vec<&String> = self.fill.keys().collect();
        physics.sort();
        fill.sort();
        f.debug_struct("Hooks")
            .field("physics", &physics)
            .field("fill", &fill)
            .finish()
    }
}

impl Hooks {
    /// Empty table plus the built-in `flat` fill.
    pub fn new() -> Self {
        let mut hooks = Self::default();
        hooks.register_fill("flat", Arc::new(fill_flat));
        hooks
    }

    pub fn register_physics(&mut self, name: &str, hook: PhysicsHook) {
        self.physics.insert(name.to_string(), hook);
    }

    pub fn register_fill(&mut self, name: &str, hook: FillHook) {
        self.fill.insert(name.to_string(), hook);
    }

    pub fn physics(&self, name: &str) -> Option<&PhysicsHook> {
        self.physics.get(name)
    }

    pub fn fill(&self, name: &str) -> Option<&FillHook> {
        self.fill.get(name)
    }
}

/// Bedrock floor, dirt up to the ground level, grass on top. `args` may give the
/// ground level; default is half the height.
fn fill_flat(ctx: &mut FillContext<'_>) {
    let dims = ctx.dims();
    let ground = ctx
        .args
        .trim()
        .parse::<u16>()
        .unwrap_or(dims.z / 2)
        .min(dims.z);
    let Some(full) = dims.full_box() else {
        return;
    };
    for p in full.iter().filter(|p| p.z < ground) {
        let ty = if p.z == 0 {
            7
        } else if p.z + 1 == ground {
            2
        } else {
            3
        };
        if ctx.set(p, ty).is_err() {
            return;
        }
    }
}
