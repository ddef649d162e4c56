use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::PersistError;

pub const MAP_LIST_FILE: &str = "maps.toml";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MapEntry {
    pub id: u32,
    pub name: String,
    /// World directory, relative to the data directory unless absolute.
    pub directory: PathBuf,
    #[serde(default)]
    pub unique_id: String,
}

/// Worlds known to the server between runs.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct MapList {
    #[serde(default, rename = "map")]
    pub maps: Vec<MapEntry>,
}

impl MapList {
    /// Reads `maps.toml` from `data_dir`; a missing file is an empty list.
    pub fn load(data_dir: &Path) -> Result<MapList, PersistError> {
        let path = data_dir.join(MAP_LIST_FILE);
        let text = match fs::read_to_string(&path) {
            Ok(t) => t,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(MapList::default()),
            Err(e) => return Err(PersistError::io(path, e)),
        };
        Ok(toml::from_str(&text)?)
    }

    pub fn save(&self, data_dir: &Path) -> Result<(), PersistError> {
        fs::create_dir_all(data_dir).map_err(|e| PersistError::io(data_dir, e))?;
        let path = data_dir.join(MAP_LIST_FILE);
        let text = toml::to_string_pretty(self)?;
        let mut tmp = NamedTempFile::new_in(data_dir).map_err(|e| PersistError::io(data_dir, e))?;
        tmp.write_all(text.as_bytes())
            .map_err(|e| PersistError::io(&path, e))?;
        tmp.persist(&path)
            .map_err(|e| PersistError::io(&path, e.error))?;
        Ok(())
    }

    pub fn get(&self, id: u32) -> Option<&MapEntry> {
        self.maps.iter().find(|m| m.id == id)
    }

    /// Resolves an entry's directory against `data_dir`.
    pub fn resolve(data_dir: &Path, entry: &MapEntry) -> PathBuf {
        if entry.directory.is_absolute() {
            entry.directory.clone()
        } else {
            data_dir.join(&entry.directory)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_list_round_trips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(MapList::load(dir.path()).unwrap(), MapList::default());

        let list = MapList {
            maps: vec![
                MapEntry {
                    id: 0,
                    name: "main".into(),
                    directory: "worlds/main".into(),
                    unique_id: "AbCdEfGhIjKlMnOp".into(),
                },
                MapEntry {
                    id: 3,
                    name: "build".into(),
                    directory: "/srv/build".into(),
                    unique_id: String::new(),
                },
            ],
        };
        list.save(dir.path()).unwrap();
        let back = MapList::load(dir.path()).unwrap();
        assert_eq!(back, list);
        assert_eq!(
            MapList::resolve(dir.path(), back.get(0).unwrap()),
            dir.path().join("worlds/main")
        );
        assert_eq!(
            MapList::resolve(dir.path(), back.get(3).unwrap()),
            PathBuf::from("/srv/build")
        );
    }
}
