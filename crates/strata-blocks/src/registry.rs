use std::collections::HashMap;
use std::fs;
use std::path::Path;

use super::config::{BlockConfigError, BlocksConfig};
use super::types::{AIR, BlockId, BlockType, PhysicsBehavior, PhysicsKind, Rank};

/// Rank checks used by actor-initiated edits.
pub trait PermissionOracle {
    fn can_place(&self, rank: Rank, ty: BlockId) -> bool;
    fn can_delete(&self, rank: Rank, ty: BlockId) -> bool;
}

/// Table of all 256 block ids. Ids missing from the config stay undefined and
/// behave like inert blocks with rank 0.
#[derive(Clone, Debug)]
pub struct BlockRegistry {
    pub blocks: Vec<BlockType>,
    pub by_name: HashMap<String, BlockId>,
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// (id, name, physics, time ms, random ms, rank place, rank delete)
const CLASSIC: &[(BlockId, &str, PhysicsKind, u64, u64, Rank, Rank)] = &[
    (0, "air", PhysicsKind::None, 0, 0, 0, 0),
    (1, "stone", PhysicsKind::None, 0, 0, 0, 0),
    (2, "grass", PhysicsKind::None, 0, 0, 0, 0),
    (3, "dirt", PhysicsKind::None, 0, 0, 0, 0),
    (4, "cobblestone", PhysicsKind::None, 0, 0, 0, 0),
    (5, "planks", PhysicsKind::None, 0, 0, 0, 0),
    (6, "sapling", PhysicsKind::None, 0, 0, 0, 0),
    (7, "bedrock", PhysicsKind::None, 0, 0, 100, 100),
    (8, "water", PhysicsKind::Spread, 250, 100, 50, 0),
    (9, "still_water", PhysicsKind::None, 0, 0, 50, 0),
    (10, "lava", PhysicsKind::Spread, 1000, 500, 50, 0),
    (11, "still_lava", PhysicsKind::None, 0, 0, 50, 0),
    (12, "sand", PhysicsKind::Fall, 150, 0, 0, 0),
    (13, "gravel", PhysicsKind::FallSlide, 150, 0, 0, 0),
    (14, "gold_ore", PhysicsKind::None, 0, 0, 0, 0),
    (15, "iron_ore", PhysicsKind::None, 0, 0, 0, 0),
    (16, "coal_ore", PhysicsKind::None, 0, 0, 0, 0),
    (17, "log", PhysicsKind::None, 0, 0, 0, 0),
    (18, "leaves", PhysicsKind::None, 0, 0, 0, 0),
    (19, "sponge", PhysicsKind::None, 0, 0, 0, 0),
    (20, "glass", PhysicsKind::None, 0, 0, 0, 0),
    (21, "red_wool", PhysicsKind::None, 0, 0, 0, 0),
    (22, "orange_wool", PhysicsKind::None, 0, 0, 0, 0),
    (23, "yellow_wool", PhysicsKind::None, 0, 0, 0, 0),
    (24, "lime_wool", PhysicsKind::None, 0, 0, 0, 0),
    (25, "green_wool", PhysicsKind::None, 0, 0, 0, 0),
    (26, "teal_wool", PhysicsKind::None, 0, 0, 0, 0),
    (27, "aqua_wool", PhysicsKind::None, 0, 0, 0, 0),
    (28, "cyan_wool", PhysicsKind::None, 0, 0, 0, 0),
    (29, "blue_wool", PhysicsKind::None, 0, 0, 0, 0),
    (30, "indigo_wool", PhysicsKind::None, 0, 0, 0, 0),
    (31, "violet_wool", PhysicsKind::None, 0, 0, 0, 0),
    (32, "magenta_wool", PhysicsKind::None, 0, 0, 0, 0),
    (33, "pink_wool", PhysicsKind::None, 0, 0, 0, 0),
    (34, "black_wool", PhysicsKind::None, 0, 0, 0, 0),
    (35, "gray_wool", PhysicsKind::None, 0, 0, 0, 0),
    (36, "white_wool", PhysicsKind::None, 0, 0, 0, 0),
    (37, "dandelion", PhysicsKind::None, 0, 0, 0, 0),
    (38, "rose", PhysicsKind::None, 0, 0, 0, 0),
    (39, "brown_mushroom", PhysicsKind::None, 0, 0, 0, 0),
    (40, "red_mushroom", PhysicsKind::None, 0, 0, 0, 0),
    (41, "gold_block", PhysicsKind::None, 0, 0, 0, 0),
    (42, "iron_block", PhysicsKind::None, 0, 0, 0, 0),
    (43, "double_slab", PhysicsKind::None, 0, 0, 0, 0),
    (44, "slab", PhysicsKind::None, 0, 0, 0, 0),
    (45, "brick", PhysicsKind::None, 0, 0, 0, 0),
    (46, "tnt", PhysicsKind::None, 0, 0, 0, 0),
    (47, "bookshelf", PhysicsKind::None, 0, 0, 0, 0),
    (48, "mossy_cobblestone", PhysicsKind::None, 0, 0, 0, 0),
    (49, "obsidian", PhysicsKind::None, 0, 0, 0, 0),
];

impl BlockRegistry {
    pub fn new() -> Self {
        Self {
            blocks: (0..=BlockId::MAX).map(BlockType::undefined).collect(),
            by_name: HashMap::new(),
        }
    }

    /// The 50 classic blocks with sand, gravel and liquid physics.
    pub fn classic() -> Self {
        let mut reg = Self::new();
        for &(id, name, physics, time_ms, random_ms, rank_place, rank_delete) in CLASSIC {
            reg.insert(BlockType {
                id,
                name: name.to_string(),
                defined: true,
                physics,
                physics_delay: std::time::Duration::from_millis(time_ms),
                physics_jitter: std::time::Duration::from_millis(random_ms),
                rank_place,
                rank_delete,
                ..BlockType::undefined(id)
            });
        }
        reg
    }

    pub fn load_from_path(path: &Path) -> Result<Self, BlockConfigError> {
        let text = fs::read_to_string(path).map_err(|source| BlockConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg = BlocksConfig::from_toml_str(&text)?;
        Self::from_config(cfg)
    }

    pub fn from_config(cfg: BlocksConfig) -> Result<Self, BlockConfigError> {
        let mut reg = Self::new();
        for def in &cfg.blocks {
            if reg.blocks[usize::from(def.id)].defined {
                return Err(BlockConfigError::DuplicateId(def.id));
            }
            reg.insert(def.compile());
        }
        Ok(reg)
    }

    fn insert(&mut self, ty: BlockType) {
        if !ty.name.is_empty() {
            self.by_name.insert(ty.name.to_lowercase(), ty.id);
        }
        let id = usize::from(ty.id);
        self.blocks[id] = ty;
    }

    #[inline]
    pub fn get(&self, id: BlockId) -> &BlockType {
        &self.blocks[usize::from(id)]
    }

    /// Case-insensitive name lookup.
    pub fn id_by_name(&self, name: &str) -> Option<BlockId> {
        self.by_name.get(&name.to_lowercase()).copied()
    }

    #[inline]
    pub fn behavior_for(&self, id: BlockId) -> Option<PhysicsBehavior> {
        self.get(id).behavior()
    }

    #[inline]
    pub fn has_physics(&self, id: BlockId) -> bool {
        self.get(id).has_physics()
    }

    /// Type written when an actor deletes `id`.
    #[inline]
    pub fn after_delete(&self, id: BlockId) -> BlockId {
        let ty = self.get(id);
        if ty.defined { ty.after_delete } else { AIR }
    }

    #[inline]
    pub fn replace_on_load(&self, id: BlockId) -> Option<BlockId> {
        self.get(id).replace_on_load
    }

    #[inline]
    pub fn physics_on_load(&self, id: BlockId) -> bool {
        let ty = self.get(id);
        ty.physics_on_load && ty.has_physics()
    }

    pub fn defined_count(&self) -> usize {
        self.blocks.iter().filter(|b| b.defined).count()
    }
}

impl PermissionOracle for BlockRegistry {
    fn can_place(&self, rank: Rank, ty: BlockId) -> bool {
        rank >= self.get(ty).rank_place
    }

    fn can_delete(&self, rank: Rank, ty: BlockId) -> bool {
        rank >= self.get(ty).rank_delete
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classic_table_has_fifty_blocks() {
        let reg = BlockRegistry::classic();
        assert_eq!(reg.defined_count(), 50);
        assert_eq!(reg.id_by_name("Sand"), Some(12));
        assert_eq!(reg.get(12).physics, PhysicsKind::Fall);
        assert!(reg.behavior_for(1).is_none());
    }

    #[test]
    fn undefined_ids_are_inert() {
        let reg = BlockRegistry::classic();
        assert!(!reg.get(200).defined);
        assert!(reg.can_place(0, 200));
        assert_eq!(reg.after_delete(200), AIR);
    }
}
