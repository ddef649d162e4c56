//! On-disk formats: compressed NBT worlds and regions, and the map list.
#![forbid(unsafe_code)]

mod error;
mod fsutil;
mod maps;
mod region;
mod tags;
mod world;

pub use error::PersistError;
pub use maps::{MAP_LIST_FILE, MapEntry, MapList};
pub use region::{Region, export_region, export_size, import_region};
pub use world::{WORLD_FILE, load, save, world_file};

/// Version written into every file; readers accept this version and older.
pub const FORMAT_VERSION: i32 = 1;
