//! Flat voxel storage for one world.
#![forbid(unsafe_code)]

use strata_blocks::{AIR, BlockId};
use strata_geom::{BlockBox, Dims, Vec3S};

/// Number identifying who last changed a cell; negative for the server itself.
pub type ActorNumber = i16;

pub const SYSTEM_ACTOR: ActorNumber = -1;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VoxelError {
    #[error("position {pos:?} outside {dims:?}")]
    OutOfBounds { pos: Vec3S, dims: Dims },
    #[error("invalid dimensions {0:?}")]
    InvalidDimensions(Dims),
    #[error("expected {expected} cells, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Block types plus the last actor per cell, indexed `x + y*sx + z*sx*sy`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoxelBuffer {
    dims: Dims,
    blocks: Vec<BlockId>,
    actors: Vec<ActorNumber>,
}

impl VoxelBuffer {
    pub fn new(dims: Dims) -> Result<Self, VoxelError> {
        if !dims.is_valid() {
            return Err(VoxelError::InvalidDimensions(dims));
        }
        let len = dims.volume();
        Ok(Self {
            dims,
            blocks: vec![AIR; len],
            actors: vec![SYSTEM_ACTOR; len],
        })
    }

    /// Wraps existing storage. A missing actor layer is filled with the system actor.
    pub fn from_raw(
        dims: Dims,
        blocks: Vec<BlockId>,
        actors: Option<Vec<ActorNumber>>,
    ) -> Result<Self, VoxelError> {
        if !dims.is_valid() {
            return Err(VoxelError::InvalidDimensions(dims));
        }
        let expected = dims.volume();
        if blocks.len() != expected {
            return Err(VoxelError::LengthMismatch {
                expected,
                actual: blocks.len(),
            });
        }
        let actors = match actors {
            Some(a) if a.len() == expected => a,
            Some(a) => {
                return Err(VoxelError::LengthMismatch {
                    expected,
                    actual: a.len(),
                });
            }
            None => vec![SYSTEM_ACTOR; expected],
        };
        Ok(Self {
            dims,
            blocks,
            actors,
        })
    }

    #[inline]
    pub fn dims(&self) -> Dims {
        self.dims
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    #[inline]
    pub fn contains(&self, p: Vec3S) -> bool {
        self.dims.contains(p)
    }

    #[inline]
    pub fn idx(&self, p: Vec3S) -> Result<usize, VoxelError> {
        if !self.dims.contains(p) {
            return Err(VoxelError::OutOfBounds {
                pos: p,
                dims: self.dims,
            });
        }
        let (sx, sy) = (usize::from(self.dims.x), usize::from(self.dims.y));
        Ok(usize::from(p.x) + usize::from(p.y) * sx + usize::from(p.z) * sx * sy)
    }

    #[inline]
    pub fn get(&self, p: Vec3S) -> Result<BlockId, VoxelError> {
        Ok(self.blocks[self.idx(p)?])
    }

    #[inline]
    pub fn get_actor(&self, p: Vec3S) -> Result<ActorNumber, VoxelError> {
        Ok(self.actors[self.idx(p)?])
    }

    /// Writes the type only; the last-actor layer is left as is.
    #[inline]
    pub fn set(&mut self, p: Vec3S, ty: BlockId) -> Result<(), VoxelError> {
        let i = self.idx(p)?;
        self.blocks[i] = ty;
        Ok(())
    }

    /// Writes type and actor, returning the previous `(type, actor)`.
    #[inline]
    pub fn set_with_actor(
        &mut self,
        p: Vec3S,
        ty: BlockId,
        actor: ActorNumber,
    ) -> Result<(BlockId, ActorNumber), VoxelError> {
        let i = self.idx(p)?;
        let prev = (self.blocks[i], self.actors[i]);
        self.blocks[i] = ty;
        self.actors[i] = actor;
        Ok(prev)
    }

    /// Reallocates to `dims`, keeping the overlap and zero-filling the rest.
    pub fn resize(&mut self, dims: Dims) -> Result<(), VoxelError> {
        let mut next = VoxelBuffer::new(dims)?;
        let overlap = self.dims.overlap(dims);
        let (ox, oy) = (usize::from(self.dims.x), usize::from(self.dims.y));
        let (nx, ny) = (usize::from(dims.x), usize::from(dims.y));
        let run = usize::from(overlap.x);
        for z in 0..usize::from(overlap.z) {
            for y in 0..usize::from(overlap.y) {
                let src = y * ox + z * ox * oy;
                let dst = y * nx + z * nx * ny;
                next.blocks[dst..dst + run].copy_from_slice(&self.blocks[src..src + run]);
                next.actors[dst..dst + run].copy_from_slice(&self.actors[src..src + run]);
            }
        }
        *self = next;
        Ok(())
    }

    pub fn fill(&mut self, ty: BlockId) {
        self.blocks.fill(ty);
        self.actors.fill(SYSTEM_ACTOR);
    }

    #[inline]
    pub fn clear(&mut self) {
        self.fill(AIR);
    }

    /// Copies a sub-box into a new buffer sized to the box.
    pub fn region(&self, bx: &BlockBox) -> Result<VoxelBuffer, VoxelError> {
        self.idx(bx.max)?;
        let size = bx.size();
        let mut out = VoxelBuffer::new(size)?;
        for p in bx.iter() {
            let q = Vec3S::new(p.x - bx.min.x, p.y - bx.min.y, p.z - bx.min.z);
            let i = out.idx(q)?;
            out.blocks[i] = self.get(p)?;
        }
        Ok(out)
    }

    #[inline]
    pub fn blocks(&self) -> &[BlockId] {
        &self.blocks
    }

    #[inline]
    pub fn actors(&self) -> &[ActorNumber] {
        &self.actors
    }

    /// Every cell with its type, in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (Vec3S, BlockId)> + '_ {
        let dims = self.dims;
        dims.full_box()
            .into_iter()
            .flat_map(|bx| bx.iter())
            .zip(self.blocks.iter().copied())
    }

    #[inline]
    pub fn has_non_air(&self) -> bool {
        self.blocks.iter().any(|b| *b != AIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_dims_rejected() {
        assert_eq!(
            VoxelBuffer::new(Dims::new(0, 1, 1)),
            Err(VoxelError::InvalidDimensions(Dims::new(0, 1, 1)))
        );
    }

    #[test]
    fn actor_layer_tracks_writer() {
        let mut buf = VoxelBuffer::new(Dims::new(2, 2, 2)).unwrap();
        let p = Vec3S::new(1, 0, 1);
        assert_eq!(buf.get_actor(p), Ok(SYSTEM_ACTOR));
        assert_eq!(buf.set_with_actor(p, 4, 7), Ok((AIR, SYSTEM_ACTOR)));
        assert_eq!(buf.set_with_actor(p, 5, 9), Ok((4, 7)));
        assert_eq!(buf.get_actor(p), Ok(9));
    }

    #[test]
    fn from_raw_checks_length() {
        let err = VoxelBuffer::from_raw(Dims::new(2, 2, 2), vec![0; 7], None);
        assert_eq!(
            err,
            Err(VoxelError::LengthMismatch {
                expected: 8,
                actual: 7
            })
        );
    }
}
