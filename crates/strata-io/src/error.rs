use std::path::PathBuf;

use strata_voxel::VoxelError;

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("no world file at {0}")]
    NotFound(PathBuf),
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("nbt: {0}")]
    Nbt(#[from] fastnbt::error::Error),
    #[error("corrupt file {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },
    #[error(transparent)]
    Voxel(#[from] VoxelError),
    #[error("map list: {0}")]
    MapListDecode(#[from] toml::de::Error),
    #[error("map list: {0}")]
    MapListEncode(#[from] toml::ser::Error),
}

impl PersistError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PersistError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        PersistError::Corrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }

    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, PersistError::NotFound(_))
    }
}
