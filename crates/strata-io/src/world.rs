use std::path::{Path, PathBuf};

use strata_voxel::VoxelBuffer;
use strata_world::{WorldMeta, WorldSnapshot};

use crate::FORMAT_VERSION;
use crate::error::PersistError;
use crate::fsutil::{read_nbt_gz, write_nbt_gz};
use crate::tags::{
    MetaTag, WorldTag, decode_actors, decode_blocks, dims, dims_tag, encode_actors, encode_blocks,
};

pub const WORLD_FILE: &str = "world.cw";

#[inline]
pub fn world_file(dir: &Path) -> PathBuf {
    dir.join(WORLD_FILE)
}

/// Writes the snapshot to `dir/world.cw`, replacing any previous file atomically.
pub fn save(snapshot: &WorldSnapshot, dir: &Path) -> Result<(), PersistError> {
    let (x, y, z) = dims_tag(snapshot.voxels.dims());
    let tag = WorldTag {
        format_version: FORMAT_VERSION,
        name: snapshot.meta.name.clone(),
        unique_id: snapshot.meta.unique_id.clone(),
        x,
        y,
        z,
        spawn: snapshot.meta.spawn.into(),
        block_array: encode_blocks(snapshot.voxels.blocks()),
        actor_array: Some(encode_actors(snapshot.voxels.actors())),
        metadata: MetaTag::from(&snapshot.meta),
    };
    let path = world_file(dir);
    write_nbt_gz(&path, &tag)?;
    log::debug!(
        "saved '{}' ({}x{}x{}) to {}",
        tag.name,
        x,
        y,
        z,
        path.display()
    );
    Ok(())
}

/// Reads `dir/world.cw`.
pub fn load(dir: &Path) -> Result<WorldSnapshot, PersistError> {
    let path = world_file(dir);
    let tag: WorldTag = read_nbt_gz(&path)?;
    if tag.format_version > FORMAT_VERSION {
        return Err(PersistError::corrupt(
            &path,
            format!("unsupported format version {}", tag.format_version),
        ));
    }
    let dims = dims(tag.x, tag.y, tag.z).map_err(|r| PersistError::corrupt(&path, r))?;
    let blocks = decode_blocks(tag.block_array);
    let actors = tag
        .actor_array
        .map(decode_actors)
        .transpose()
        .map_err(|r| PersistError::corrupt(&path, r))?;
    let voxels = VoxelBuffer::from_raw(dims, blocks, actors)
        .map_err(|e| PersistError::corrupt(&path, e.to_string()))?;

    let mut meta = WorldMeta::new(&tag.name);
    if !tag.unique_id.is_empty() {
        meta.unique_id = tag.unique_id;
    }
    meta.spawn = tag.spawn.into();
    tag.metadata
        .apply_to(&mut meta)
        .map_err(|r| PersistError::corrupt(&path, r))?;

    Ok(WorldSnapshot {
        meta,
        voxels,
        generation: 0,
    })
}
