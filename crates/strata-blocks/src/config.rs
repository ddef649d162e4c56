use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::{BlockId, BlockType, PhysicsKind, Rank};

const MAX_PHYSICS_MS: u64 = 10_000;
const MAX_RANK: i64 = 65_535;

#[derive(Debug, thiserror::Error)]
pub enum BlockConfigError {
    #[error("failed to read block table {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid block table: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("block id {0} defined twice")]
    DuplicateId(BlockId),
}

/// One `[[block]]` entry of `blocks.toml`. Out-of-range values are reset to
/// their defaults when compiled.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct BlockDef {
    pub id: BlockId,
    pub name: String,
    #[serde(default)]
    pub physics: Option<String>,
    #[serde(default)]
    pub physics_script: Option<String>,
    #[serde(default)]
    pub physics_time_ms: Option<i64>,
    #[serde(default)]
    pub physics_random_ms: Option<i64>,
    #[serde(default)]
    pub physics_repeat: Option<bool>,
    #[serde(default)]
    pub physics_on_load: Option<bool>,
    #[serde(default)]
    pub rank_place: Option<i64>,
    #[serde(default)]
    pub rank_delete: Option<i64>,
    #[serde(default)]
    pub after_delete: Option<i64>,
    #[serde(default)]
    pub replace_on_load: Option<i64>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct BlocksConfig {
    #[serde(default, rename = "block")]
    pub blocks: Vec<BlockDef>,
}

impl BlocksConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, BlockConfigError> {
        Ok(toml::from_str(s)?)
    }
}

fn physics_ms(block: &str, field: &str, v: Option<i64>) -> u64 {
    match v {
        None => 0,
        Some(ms) if (0..=MAX_PHYSICS_MS as i64).contains(&ms) => ms as u64,
        Some(ms) => {
            log::warn!("block '{block}': {field}={ms} out of range, using 0");
            0
        }
    }
}

fn rank(block: &str, field: &str, v: Option<i64>) -> Rank {
    match v {
        None => 0,
        Some(r) if (0..=MAX_RANK).contains(&r) => r as Rank,
        Some(r) => {
            log::warn!("block '{block}': {field}={r} out of range, using 0");
            0
        }
    }
}

fn block_ref(v: Option<i64>) -> Option<BlockId> {
    v.and_then(|id| BlockId::try_from(id).ok())
}

impl BlockDef {
    pub fn compile(&self) -> BlockType {
        let name = self.name.as_str();
        let physics = match self.physics.as_deref() {
            None => PhysicsKind::None,
            Some(p) => PhysicsKind::from_name(p).unwrap_or_else(|| {
                log::warn!("block '{name}': unknown physics '{p}', disabling");
                PhysicsKind::None
            }),
        };
        let after_delete = match self.after_delete {
            None => 0,
            Some(v) => block_ref(Some(v)).unwrap_or_else(|| {
                log::warn!("block '{name}': after_delete={v} out of range, using air");
                0
            }),
        };
        BlockType {
            id: self.id,
            name: self.name.clone(),
            defined: true,
            physics,
            physics_script: self.physics_script.clone().filter(|s| !s.is_empty()),
            physics_delay: std::time::Duration::from_millis(physics_ms(
                name,
                "physics_time_ms",
                self.physics_time_ms,
            )),
            physics_jitter: std::time::Duration::from_millis(physics_ms(
                name,
                "physics_random_ms",
                self.physics_random_ms,
            )),
            physics_repeat: self.physics_repeat.unwrap_or(false),
            physics_on_load: self.physics_on_load.unwrap_or(false),
            rank_place: rank(name, "rank_place", self.rank_place),
            rank_delete: rank(name, "rank_delete", self.rank_delete),
            after_delete,
            // Negative means "keep"; anything outside the id range is treated the same.
            replace_on_load: block_ref(self.replace_on_load),
        }
    }
}
