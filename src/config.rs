use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use strata_geom::Dims;
use strata_runtime::SchedulerConfig;
use strata_world::WorldSettings;

/// Server settings read from `strata.toml`. Every field has a default, so a
/// missing file or a partial one both work.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub data_dir: PathBuf,
    /// Block table; the built-in classic table when unset.
    pub blocks_file: Option<PathBuf>,
    pub tick_ms: u64,
    pub action_poll_ms: u64,
    /// Autosave interval given to worlds created at startup.
    pub autosave_secs: u64,
    pub undo_capacity: usize,
    pub broadcast_limit: Option<usize>,
    /// 0 sizes the tick pool from available parallelism.
    pub tick_threads: usize,
    pub watch_blocks: bool,
    pub default_world: DefaultWorld,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DefaultWorld {
    pub name: String,
    pub dims: [u16; 3],
    /// Fill hook run once on creation; empty leaves the world as air.
    pub fill: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            blocks_file: None,
            tick_ms: 50,
            action_poll_ms: 100,
            autosave_secs: 600,
            undo_capacity: 10_000,
            broadcast_limit: None,
            tick_threads: 0,
            watch_blocks: true,
            default_world: DefaultWorld::default(),
        }
    }
}

impl Default for DefaultWorld {
    fn default() -> Self {
        Self {
            name: "main".to_string(),
            dims: [64, 64, 64],
            fill: "flat".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        match fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text)
                .with_context(|| format!("invalid config {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("{} not found; using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    /// Resolves `blocks_file` against `base` when relative.
    pub fn blocks_path(&self, base: &Path) -> Option<PathBuf> {
        self.blocks_file.as_ref().map(|p| {
            if p.is_absolute() {
                p.clone()
            } else {
                base.join(p)
            }
        })
    }

    pub fn world_settings(&self) -> WorldSettings {
        WorldSettings {
            undo_capacity: self.undo_capacity,
            broadcast_limit: self.broadcast_limit,
        }
    }

    pub fn scheduler(&self) -> SchedulerConfig {
        SchedulerConfig {
            tick: Duration::from_millis(self.tick_ms.max(1)),
            threads: self.tick_threads,
        }
    }

    pub fn default_dims(&self) -> Dims {
        let [x, y, z] = self.default_world.dims;
        Dims::new(x, y, z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_other_defaults() {
        let cfg = ServerConfig::from_toml_str(
            r#"
            tick_ms = 20
            broadcast_limit = 512

            [default_world]
            name = "hub"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.tick_ms, 20);
        assert_eq!(cfg.broadcast_limit, Some(512));
        assert_eq!(cfg.default_world.name, "hub");
        assert_eq!(cfg.default_world.dims, [64, 64, 64]);
        assert_eq!(cfg.undo_capacity, 10_000);
        assert!(cfg.watch_blocks);
    }

    #[test]
    fn shipped_config_parses() {
        let cfg = ServerConfig::from_toml_str(include_str!("../strata.toml")).unwrap();
        assert_eq!(cfg.blocks_file, Some(PathBuf::from("blocks.toml")));
        assert_eq!(cfg.default_dims(), Dims::new(64, 64, 64));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ServerConfig::load(&dir.path().join("strata.toml")).unwrap();
        assert_eq!(cfg, ServerConfig::default());
    }

    #[test]
    fn bad_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strata.toml");
        fs::write(&path, "tick_ms = \"fast\"").unwrap();
        assert!(ServerConfig::load(&path).is_err());
    }

    #[test]
    fn relative_blocks_path_is_joined() {
        let cfg = ServerConfig {
            blocks_file: Some(PathBuf::from("blocks.toml")),
            ..ServerConfig::default()
        };
        assert_eq!(
            cfg.blocks_path(Path::new("/srv")),
            Some(PathBuf::from("/srv/blocks.toml"))
        );
        assert_eq!(ServerConfig::default().blocks_path(Path::new("/srv")), None);
    }
}
