use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::Path;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;

use crate::error::PersistError;

/// Serializes `value` as gzip NBT into a temp file beside `path`, then renames
/// it over `path`. Readers never observe a partial file.
pub(crate) fn write_nbt_gz<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|e| PersistError::io(dir, e))?;
    let bytes = fastnbt::to_bytes(value)?;

    let tmp = NamedTempFile::new_in(dir).map_err(|e| PersistError::io(dir, e))?;
    let mut enc = GzEncoder::new(tmp, Compression::default());
    enc.write_all(&bytes).map_err(|e| PersistError::io(path, e))?;
    let tmp = enc.finish().map_err(|e| PersistError::io(path, e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| PersistError::io(path, e))?;
    tmp.persist(path)
        .map_err(|e| PersistError::io(path, e.error))?;
    Ok(())
}

/// Reads and decodes a gzip NBT file. A missing file is `NotFound`; bytes that
/// are not gzip are `Corrupt`.
pub(crate) fn read_nbt_gz<T: DeserializeOwned>(path: &Path) -> Result<T, PersistError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(PersistError::NotFound(path.to_path_buf()));
        }
        Err(e) => return Err(PersistError::io(path, e)),
    };
    let mut raw = Vec::new();
    GzDecoder::new(file)
        .read_to_end(&mut raw)
        .map_err(|e| match e.kind() {
            ErrorKind::InvalidInput | ErrorKind::InvalidData | ErrorKind::UnexpectedEof => {
                PersistError::corrupt(path, format!("gzip: {e}"))
            }
            _ => PersistError::io(path, e),
        })?;
    Ok(fastnbt::from_bytes(&raw)?)
}
