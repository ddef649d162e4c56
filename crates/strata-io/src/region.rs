use std::path::Path;

use strata_geom::{BlockBox, Dims, Vec3S};
use strata_voxel::{VoxelBuffer, VoxelError};

use crate::FORMAT_VERSION;
use crate::error::PersistError;
use crate::fsutil::{read_nbt_gz, write_nbt_gz};
use crate::tags::{RegionHeaderTag, RegionTag, decode_blocks, dims, dims_tag, encode_blocks};

/// A box of blocks cut out of a world, with the offset of its copy point.
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    pub voxels: VoxelBuffer,
    /// Position inside the region that lines up with the paste target.
    pub origin: Vec3S,
}

impl Region {
    #[inline]
    pub fn dims(&self) -> Dims {
        self.voxels.dims()
    }

    /// Integer upscale: every cell becomes an `sx*sy*sz` block. Factors of 0 act as 1.
    pub fn scaled(&self, sx: u16, sy: u16, sz: u16) -> Result<Region, VoxelError> {
        let (sx, sy, sz) = (sx.max(1), sy.max(1), sz.max(1));
        let d = self.dims();
        let mul = |a: u16, s: u16| a.checked_mul(s).ok_or(VoxelError::InvalidDimensions(d));
        let target = Dims::new(mul(d.x, sx)?, mul(d.y, sy)?, mul(d.z, sz)?);
        let mut out = VoxelBuffer::new(target)?;
        for (p, ty) in self.voxels.iter() {
            if ty == 0 {
                continue;
            }
            for kz in 0..sz {
                for ky in 0..sy {
                    for kx in 0..sx {
                        let q = Vec3S::new(p.x * sx + kx, p.y * sy + ky, p.z * sz + kz);
                        out.set(q, ty)?;
                    }
                }
            }
        }
        Ok(Region {
            voxels: out,
            origin: Vec3S::new(
                self.origin.x.saturating_mul(sx),
                self.origin.y.saturating_mul(sy),
                self.origin.z.saturating_mul(sz),
            ),
        })
    }

    /// Lines the region's origin up with `target`. Returns the world corner and
    /// the cells that fall on non-negative coordinates; `None` when none do.
    pub fn placed_at(&self, target: Vec3S) -> Result<Option<(Vec3S, VoxelBuffer)>, VoxelError> {
        let d = self.dims();
        let axis = |t: u16, o: u16, len: u16| -> Option<(u16, u16)> {
            // (world corner, cells skipped on this axis)
            if t >= o {
                Some((t - o, 0))
            } else {
                let skip = o - t;
                (skip < len).then_some((0, skip))
            }
        };
        let (Some((cx, kx)), Some((cy, ky)), Some((cz, kz))) = (
            axis(target.x, self.origin.x, d.x),
            axis(target.y, self.origin.y, d.y),
            axis(target.z, self.origin.z, d.z),
        ) else {
            return Ok(None);
        };
        let corner = Vec3S::new(cx, cy, cz);
        if (kx, ky, kz) == (0, 0, 0) {
            return Ok(Some((corner, self.voxels.clone())));
        }
        let kept = BlockBox::new(
            Vec3S::new(kx, ky, kz),
            Vec3S::new(d.x - 1, d.y - 1, d.z - 1),
        );
        Ok(Some((corner, self.voxels.region(&kept)?)))
    }
}

/// Writes the cells of `area` to `path`. Returns the exported size.
pub fn export_region(
    voxels: &VoxelBuffer,
    area: &BlockBox,
    origin: Vec3S,
    path: &Path,
) -> Result<Dims, PersistError> {
    let region = voxels.region(area)?;
    let size = region.dims();
    let (x, y, z) = dims_tag(size);
    let tag = RegionTag {
        format_version: FORMAT_VERSION,
        x,
        y,
        z,
        origin_x: i32::from(origin.x),
        origin_y: i32::from(origin.y),
        origin_z: i32::from(origin.z),
        block_array: encode_blocks(region.blocks()),
    };
    write_nbt_gz(path, &tag)?;
    log::info!("exported {x}x{y}x{z} region to {}", path.display());
    Ok(size)
}

/// Size of a region file without materializing its blocks.
pub fn export_size(path: &Path) -> Result<Dims, PersistError> {
    let tag: RegionHeaderTag = read_nbt_gz(path)?;
    dims(tag.x, tag.y, tag.z).map_err(|r| PersistError::corrupt(path, r))
}

pub fn import_region(path: &Path) -> Result<Region, PersistError> {
    let tag: RegionTag = read_nbt_gz(path)?;
    let size = dims(tag.x, tag.y, tag.z).map_err(|r| PersistError::corrupt(path, r))?;
    let origin = crate::tags::vec3s(tag.origin_x, tag.origin_y, tag.origin_z)
        .map_err(|r| PersistError::corrupt(path, r))?;
    let voxels = VoxelBuffer::from_raw(size, decode_blocks(tag.block_array), None)
        .map_err(|e| PersistError::corrupt(path, e.to_string()))?;
    Ok(Region { voxels, origin })
}
