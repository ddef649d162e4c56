use std::collections::BTreeMap;
use std::time::Duration;

use fastnbt::ByteArray;
use serde::{Deserialize, Serialize};
use strata_blocks::BlockId;
use strata_geom::{BlockBox, Dims, Location, Vec3, Vec3S};
use strata_voxel::ActorNumber;
use strata_world::{Environment, HackControl, Permissions, RankBox, Teleporter, WorldMeta};

/// Root compound of `world.cw`.
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct WorldTag {
    pub format_version: i32,
    pub name: String,
    pub unique_id: String,
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub spawn: LocationTag,
    pub block_array: ByteArray,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_array: Option<ByteArray>,
    #[serde(default)]
    pub metadata: MetaTag,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct LocationTag {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub rotation: f32,
    pub look: f32,
}

impl From<Location> for LocationTag {
    fn from(l: Location) -> Self {
        Self {
            x: l.pos.x,
            y: l.pos.y,
            z: l.pos.z,
            rotation: l.rotation,
            look: l.look,
        }
    }
}

impl From<LocationTag> for Location {
    fn from(t: LocationTag) -> Self {
        Location::new(Vec3::new(t.x, t.y, t.z), t.rotation, t.look)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct BoxTag {
    pub x1: i32,
    pub y1: i32,
    pub z1: i32,
    pub x2: i32,
    pub y2: i32,
    pub z2: i32,
}

impl From<BlockBox> for BoxTag {
    fn from(b: BlockBox) -> Self {
        Self {
            x1: i32::from(b.min.x),
            y1: i32::from(b.min.y),
            z1: i32::from(b.min.z),
            x2: i32::from(b.max.x),
            y2: i32::from(b.max.y),
            z2: i32::from(b.max.z),
        }
    }
}

impl BoxTag {
    pub fn to_box(self) -> Result<BlockBox, String> {
        let a = vec3s(self.x1, self.y1, self.z1)?;
        let b = vec3s(self.x2, self.y2, self.z2)?;
        Ok(BlockBox::new(a, b))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct PermissionsTag {
    pub join: i32,
    pub build: i32,
    pub show: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct EnvironmentTag {
    pub sky_color: i32,
    pub cloud_color: i32,
    pub fog_color: i32,
    pub ambient_color: i32,
    pub diffuse_color: i32,
    pub texture_url: String,
    pub side_block: i8,
    pub edge_block: i8,
    pub side_level: i16,
    pub can_fly: bool,
    pub noclip: bool,
    pub speeding: bool,
    pub spawn_control: bool,
    pub third_person: bool,
    pub jump_height: i16,
}

impl From<&Environment> for EnvironmentTag {
    fn from(e: &Environment) -> Self {
        Self {
            sky_color: e.sky_color,
            cloud_color: e.cloud_color,
            fog_color: e.fog_color,
            ambient_color: e.ambient_color,
            diffuse_color: e.diffuse_color,
            texture_url: e.texture_url.clone(),
            side_block: e.side_block as i8,
            edge_block: e.edge_block as i8,
            side_level: e.side_level,
            can_fly: e.hacks.can_fly,
            noclip: e.hacks.noclip,
            speeding: e.hacks.speeding,
            spawn_control: e.hacks.spawn_control,
            third_person: e.hacks.third_person,
            jump_height: e.hacks.jump_height,
        }
    }
}

impl From<EnvironmentTag> for Environment {
    fn from(t: EnvironmentTag) -> Self {
        Environment {
            sky_color: t.sky_color,
            cloud_color: t.cloud_color,
            fog_color: t.fog_color,
            ambient_color: t.ambient_color,
            diffuse_color: t.diffuse_color,
            texture_url: t.texture_url,
            side_block: t.side_block as BlockId,
            edge_block: t.edge_block as BlockId,
            side_level: t.side_level,
            hacks: HackControl {
                can_fly: t.can_fly,
                noclip: t.noclip,
                speeding: t.speeding,
                spawn_control: t.spawn_control,
                third_person: t.third_person,
                jump_height: t.jump_height,
            },
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct TeleporterTag {
    pub source: BoxTag,
    pub dest_world: String,
    pub dest: LocationTag,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct RankBoxTag {
    pub area: BoxTag,
    pub rank: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct MetaTag {
    pub permissions: PermissionsTag,
    pub environment: EnvironmentTag,
    #[serde(default)]
    pub teleporters: BTreeMap<String, TeleporterTag>,
    #[serde(default)]
    pub rank_boxes: Vec<RankBoxTag>,
    pub save_interval_secs: i64,
}

impl Default for MetaTag {
    fn default() -> Self {
        let meta = WorldMeta::new("");
        Self::from(&meta)
    }
}

impl From<&WorldMeta> for MetaTag {
    fn from(m: &WorldMeta) -> Self {
        Self {
            permissions: PermissionsTag {
                join: m.permissions.join,
                build: m.permissions.build,
                show: m.permissions.show,
            },
            environment: EnvironmentTag::from(&m.environment),
            teleporters: m
                .teleporters
                .iter()
                .map(|(id, t)| {
                    (
                        id.clone(),
                        TeleporterTag {
                            source: t.source.into(),
                            dest_world: t.dest_world.clone(),
                            dest: t.dest.into(),
                        },
                    )
                })
                .collect(),
            rank_boxes: m
                .rank_boxes
                .iter()
                .map(|b| RankBoxTag {
                    area: b.area.into(),
                    rank: b.rank,
                })
                .collect(),
            save_interval_secs: i64::try_from(m.save_interval.as_secs()).unwrap_or(i64::MAX),
        }
    }
}

impl MetaTag {
    /// Fills the metadata fields of `meta` (name, unique id and spawn are set by the caller).
    pub fn apply_to(self, meta: &mut WorldMeta) -> Result<(), String> {
        meta.permissions = Permissions {
            join: self.permissions.join,
            build: self.permissions.build,
            show: self.permissions.show,
        };
        meta.environment = self.environment.into();
        meta.teleporters = self
            .teleporters
            .into_iter()
            .map(|(id, t)| {
                let tp = Teleporter {
                    id: id.clone(),
                    source: t.source.to_box()?,
                    dest_world: t.dest_world,
                    dest: t.dest.into(),
                };
                Ok((id, tp))
            })
            .collect::<Result<_, String>>()?;
        meta.rank_boxes = self
            .rank_boxes
            .into_iter()
            .map(|b| {
                Ok(RankBox {
                    area: b.area.to_box()?,
                    rank: b.rank,
                })
            })
            .collect::<Result<_, String>>()?;
        if self.save_interval_secs > 0 {
            meta.save_interval = Duration::from_secs(self.save_interval_secs as u64);
        }
        Ok(())
    }
}

/// Root compound of an exported region file.
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct RegionTag {
    pub format_version: i32,
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub origin_x: i32,
    pub origin_y: i32,
    pub origin_z: i32,
    pub block_array: ByteArray,
}

/// Leading fields of a region file, enough to size it without the block array.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct RegionHeaderTag {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

pub(crate) fn vec3s(x: i32, y: i32, z: i32) -> Result<Vec3S, String> {
    let axis = |v: i32| u16::try_from(v).map_err(|_| format!("coordinate {v} out of range"));
    Ok(Vec3S::new(axis(x)?, axis(y)?, axis(z)?))
}

pub(crate) fn dims(x: i32, y: i32, z: i32) -> Result<Dims, String> {
    let p = vec3s(x, y, z)?;
    let d = Dims::new(p.x, p.y, p.z);
    if !d.is_valid() {
        return Err(format!("invalid dimensions {x}x{y}x{z}"));
    }
    Ok(d)
}

pub(crate) fn dims_tag(d: Dims) -> (i32, i32, i32) {
    (i32::from(d.x), i32::from(d.y), i32::from(d.z))
}

pub(crate) fn encode_blocks(blocks: &[BlockId]) -> ByteArray {
    ByteArray::new(blocks.iter().map(|&b| b as i8).collect())
}

pub(crate) fn decode_blocks(arr: ByteArray) -> Vec<BlockId> {
    arr.into_inner().into_iter().map(|b| b as u8).collect()
}

/// Two big-endian bytes per cell.
pub(crate) fn encode_actors(actors: &[ActorNumber]) -> ByteArray {
    let mut out = Vec::with_capacity(actors.len() * 2);
    for a in actors {
        out.extend(a.to_be_bytes().map(|b| b as i8));
    }
    ByteArray::new(out)
}

pub(crate) fn decode_actors(arr: ByteArray) -> Result<Vec<ActorNumber>, String> {
    let raw = arr.into_inner();
    if raw.len() % 2 != 0 {
        return Err(format!("actor array has odd length {}", raw.len()));
    }
    Ok(raw
        .chunks_exact(2)
        .map(|c| ActorNumber::from_be_bytes([c[0] as u8, c[1] as u8]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actor_bytes_are_big_endian() {
        let arr = encode_actors(&[0x0102, -1]);
        assert_eq!(arr.clone().into_inner(), vec![1, 2, -1, -1]);
        assert_eq!(decode_actors(arr).unwrap(), vec![0x0102, -1]);
        assert!(decode_actors(ByteArray::new(vec![1, 2, 3])).is_err());
    }

    #[test]
    fn negative_coordinates_are_rejected() {
        assert!(vec3s(0, -1, 0).is_err());
        assert!(dims(0, 4, 4).is_err());
        assert_eq!(dims(2, 3, 4), Ok(Dims::new(2, 3, 4)));
    }
}
