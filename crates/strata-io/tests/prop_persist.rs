use std::fs;
use std::time::Duration;

use proptest::prelude::*;
use strata_geom::{BlockBox, Dims, Location, Vec3, Vec3S};
use strata_io::{PersistError, export_region, export_size, import_region, load, save, world_file};
use strata_voxel::VoxelBuffer;
use strata_world::{RankBox, Teleporter, WorldMeta, WorldSnapshot};

fn sample_snapshot() -> WorldSnapshot {
    let dims = Dims::new(6, 5, 4);
    let blocks: Vec<u8> = (0..dims.volume()).map(|i| (i * 7 % 250) as u8 + 1).collect();
    let actors: Vec<i16> = (0..dims.volume()).map(|i| i as i16 * 131 - 900).collect();
    let voxels = VoxelBuffer::from_raw(dims, blocks, Some(actors)).unwrap();

    let mut meta = WorldMeta::new("spleef");
    meta.spawn = Location::new(Vec3::new(3.5, 2.5, 4.0), 180.0, -12.5);
    meta.permissions.build = 30;
    meta.permissions.join = 5;
    meta.environment.sky_color = 0x00ff_8800;
    meta.environment.texture_url = "http://example.invalid/pack.zip".into();
    meta.environment.side_block = 200;
    meta.environment.hacks.can_fly = false;
    meta.save_interval = Duration::from_secs(90);
    meta.rank_boxes.push(RankBox {
        area: BlockBox::new(Vec3S::new(0, 0, 0), Vec3S::new(2, 2, 2)),
        rank: 80,
    });
    meta.teleporters.insert(
        "door".into(),
        Teleporter {
            id: "door".into(),
            source: BlockBox::new(Vec3S::new(1, 1, 1), Vec3S::new(1, 1, 2)),
            dest_world: "ZZZZZZZZZZZZZZZZ".into(),
            dest: Location::new(Vec3::new(10.0, 11.0, 12.0), 90.0, 0.0),
        },
    );
    WorldSnapshot {
        meta,
        voxels,
        generation: 0,
    }
}

#[test]
fn save_then_load_is_exact() {
    let dir = tempfile::tempdir().unwrap();
    let snap = sample_snapshot();
    save(&snap, dir.path()).unwrap();
    assert!(world_file(dir.path()).exists());
    let back = load(dir.path()).unwrap();
    assert_eq!(back, snap);
}

#[test]
fn saving_twice_replaces_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut snap = sample_snapshot();
    save(&snap, dir.path()).unwrap();
    snap.voxels.set(Vec3S::ZERO, 0).unwrap();
    snap.meta.teleporters.clear();
    save(&snap, dir.path()).unwrap();
    assert_eq!(load(dir.path()).unwrap(), snap);
    let leftovers = fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(leftovers, 1);
}

#[test]
fn missing_world_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let err = load(&dir.path().join("nowhere")).unwrap_err();
    assert!(err.is_not_found(), "{err}");
}

#[test]
fn garbage_is_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(world_file(dir.path()), b"definitely not gzip").unwrap();
    let err = load(dir.path()).unwrap_err();
    assert!(matches!(err, PersistError::Corrupt { .. }), "{err}");
}

#[test]
fn region_export_import() {
    let dir = tempfile::tempdir().unwrap();
    let snap = sample_snapshot();
    let path = dir.path().join("cut.region");
    let area = BlockBox::new(Vec3S::new(1, 1, 1), Vec3S::new(3, 2, 1));
    let size = export_region(&snap.voxels, &area, Vec3S::new(1, 0, 0), &path).unwrap();
    assert_eq!(size, Dims::new(3, 2, 1));
    assert_eq!(export_size(&path).unwrap(), size);

    let region = import_region(&path).unwrap();
    assert_eq!(region.origin, Vec3S::new(1, 0, 0));
    for p in area.iter() {
        let local = Vec3S::new(p.x - 1, p.y - 1, p.z - 1);
        assert_eq!(region.voxels.get(local), snap.voxels.get(p));
    }
}

#[test]
fn exporting_outside_the_world_fails() {
    let dir = tempfile::tempdir().unwrap();
    let snap = sample_snapshot();
    let area = BlockBox::new(Vec3S::new(10, 0, 0), Vec3S::new(12, 1, 1));
    let err = export_region(&snap.voxels, &area, Vec3S::ZERO, &dir.path().join("x")).unwrap_err();
    assert!(matches!(err, PersistError::Voxel(_)), "{err}");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn block_bytes_survive_the_codec(
        (dims, blocks) in (1u16..6, 1u16..6, 1u16..6).prop_flat_map(|(x, y, z)| {
            let d = Dims::new(x, y, z);
            (Just(d), proptest::collection::vec(any::<u8>(), d.volume()))
        })
    ) {
        let dir = tempfile::tempdir().unwrap();
        let mut snap = sample_snapshot();
        snap.voxels = VoxelBuffer::from_raw(dims, blocks.clone(), None).unwrap();
        save(&snap, dir.path()).unwrap();
        let back = load(dir.path()).unwrap();
        prop_assert_eq!(back.voxels.blocks(), &blocks[..]);
        prop_assert_eq!(back.voxels.actors(), snap.voxels.actors());
    }
}
