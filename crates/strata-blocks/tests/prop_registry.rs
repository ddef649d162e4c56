use std::time::Duration;

use proptest::prelude::*;
use strata_blocks::{
    BlockConfigError, BlockRegistry, BlocksConfig, PermissionOracle, PhysicsHandler, PhysicsKind,
};

#[test]
fn parses_block_table() {
    let cfg = BlocksConfig::from_toml_str(
        r#"
        [[block]]
        id = 0
        name = "air"

        [[block]]
        id = 12
        name = "sand"
        physics = "fall"
        physics_time_ms = 200
        physics_random_ms = 50

        [[block]]
        id = 60
        name = "spawner"
        physics_script = "spawn_mob"
        physics_time_ms = 1000
        physics_repeat = true
        physics_on_load = true
        rank_place = 150
        rank_delete = 150
        after_delete = 3
        replace_on_load = 1
    "#,
    )
    .unwrap();
    let reg = BlockRegistry::from_config(cfg).unwrap();

    let sand = reg.behavior_for(12).unwrap();
    assert_eq!(sand.handler, PhysicsHandler::Builtin(PhysicsKind::Fall));
    assert_eq!(sand.delay, Duration::from_millis(200));
    assert_eq!(sand.jitter, Duration::from_millis(50));
    assert!(!sand.repeat);

    let spawner = reg.behavior_for(60).unwrap();
    assert_eq!(spawner.handler, PhysicsHandler::Script("spawn_mob".into()));
    assert!(spawner.repeat);
    assert!(reg.physics_on_load(60));
    assert_eq!(reg.after_delete(60), 3);
    assert_eq!(reg.replace_on_load(60), Some(1));
    assert_eq!(reg.id_by_name("SPAWNER"), Some(60));
}

#[test]
fn out_of_range_values_are_reset() {
    let cfg = BlocksConfig::from_toml_str(
        r#"
        [[block]]
        id = 5
        name = "odd"
        physics = "teleport"
        physics_time_ms = 20000
        physics_random_ms = -4
        rank_place = 70000
        rank_delete = -1
        after_delete = 300
        replace_on_load = -1
    "#,
    )
    .unwrap();
    let reg = BlockRegistry::from_config(cfg).unwrap();
    let ty = reg.get(5);
    assert_eq!(ty.physics, PhysicsKind::None);
    assert_eq!(ty.physics_delay, Duration::ZERO);
    assert_eq!(ty.physics_jitter, Duration::ZERO);
    assert_eq!(ty.rank_place, 0);
    assert_eq!(ty.rank_delete, 0);
    assert_eq!(ty.after_delete, 0);
    assert_eq!(ty.replace_on_load, None);
}

#[test]
fn duplicate_ids_are_rejected() {
    let cfg = BlocksConfig::from_toml_str(
        r#"
        [[block]]
        id = 1
        name = "stone"
        [[block]]
        id = 1
        name = "rock"
    "#,
    )
    .unwrap();
    assert!(matches!(
        BlockRegistry::from_config(cfg),
        Err(BlockConfigError::DuplicateId(1))
    ));
}

#[test]
fn missing_file_is_io_error() {
    let err = BlockRegistry::load_from_path(std::path::Path::new("/nonexistent/blocks.toml"));
    assert!(matches!(err, Err(BlockConfigError::Io { .. })));
}

proptest! {
    // Permission checks are plain threshold comparisons
    #[test]
    fn permissions_follow_rank_thresholds(place in 0i64..=300, delete in 0i64..=300, rank in -50i32..=400) {
        let cfg = BlocksConfig::from_toml_str(&format!(
            "[[block]]\nid = 7\nname = \"b\"\nrank_place = {place}\nrank_delete = {delete}\n"
        )).unwrap();
        let reg = BlockRegistry::from_config(cfg).unwrap();
        prop_assert_eq!(reg.can_place(rank, 7), i64::from(rank) >= place);
        prop_assert_eq!(reg.can_delete(rank, 7), i64::from(rank) >= delete);
    }
}
