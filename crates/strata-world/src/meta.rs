use std::collections::BTreeMap;
use std::time::Duration;

use rand::Rng;
use rand::distributions::Alphanumeric;
use strata_blocks::Rank;
use strata_geom::{BlockBox, Location, Vec3S};

/// Rank thresholds for joining, building in and listing a world.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Permissions {
    pub join: Rank,
    pub build: Rank,
    pub show: Rank,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HackControl {
    pub can_fly: bool,
    pub noclip: bool,
    pub speeding: bool,
    pub spawn_control: bool,
    pub third_person: bool,
    pub jump_height: i16,
}

impl Default for HackControl {
    fn default() -> Self {
        Self {
            can_fly: true,
            noclip: true,
            speeding: true,
            spawn_control: true,
            third_person: true,
            jump_height: -1,
        }
    }
}

/// Client appearance settings. Stored and persisted, never interpreted here.
/// Colors are `0xRRGGBB`, `-1` meaning client default.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Environment {
    pub sky_color: i32,
    pub cloud_color: i32,
    pub fog_color: i32,
    pub ambient_color: i32,
    pub diffuse_color: i32,
    pub texture_url: String,
    pub side_block: u8,
    pub edge_block: u8,
    pub side_level: i16,
    pub hacks: HackControl,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            sky_color: -1,
            cloud_color: -1,
            fog_color: -1,
            ambient_color: -1,
            diffuse_color: -1,
            texture_url: String::new(),
            side_block: 7,
            edge_block: 8,
            side_level: -1,
            hacks: HackControl::default(),
        }
    }
}

/// Box of cells whose build rank overrides the world's.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RankBox {
    pub area: BlockBox,
    pub rank: Rank,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Teleporter {
    pub id: String,
    pub source: BlockBox,
    /// Unique id of the target world; empty for the same world.
    pub dest_world: String,
    pub dest: Location,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WorldMeta {
    pub name: String,
    pub unique_id: String,
    pub spawn: Location,
    pub permissions: Permissions,
    pub environment: Environment,
    pub teleporters: BTreeMap<String, Teleporter>,
    pub rank_boxes: Vec<RankBox>,
    pub save_interval: Duration,
}

impl WorldMeta {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            unique_id: generate_unique_id(),
            spawn: Location::default(),
            permissions: Permissions::default(),
            environment: Environment::default(),
            teleporters: BTreeMap::new(),
            rank_boxes: Vec::new(),
            save_interval: Duration::from_secs(600),
        }
    }

    /// Last matching rank box wins; otherwise the world's build rank.
    pub fn build_rank_at(&self, pos: Vec3S) -> Rank {
        self.rank_boxes
            .iter()
            .rev()
            .find(|b| b.area.contains(pos))
            .map_or(self.permissions.build, |b| b.rank)
    }

    /// First teleporter whose source box holds `loc`.
    pub fn teleporter_at(&self, loc: &Location) -> Option<&Teleporter> {
        self.teleporters.values().find(|t| loc.within(&t.source))
    }
}

pub fn generate_unique_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_rank_box_overrides_earlier() {
        let mut m = WorldMeta::new("t");
        m.permissions.build = 10;
        m.rank_boxes.push(RankBox {
            area: BlockBox::new(Vec3S::new(0, 0, 0), Vec3S::new(4, 4, 4)),
            rank: 50,
        });
        m.rank_boxes.push(RankBox {
            area: BlockBox::new(Vec3S::new(2, 2, 2), Vec3S::new(3, 3, 3)),
            rank: 0,
        });
        assert_eq!(m.build_rank_at(Vec3S::new(1, 1, 1)), 50);
        assert_eq!(m.build_rank_at(Vec3S::new(2, 3, 2)), 0);
        assert_eq!(m.build_rank_at(Vec3S::new(9, 9, 9)), 10);
    }

    #[test]
    fn unique_ids_are_sixteen_alphanumerics() {
        let id = generate_unique_id();
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(id, generate_unique_id());
    }
}
