use std::collections::BTreeSet;
use std::path::PathBuf;

use proptest::prelude::*;
use strata_blocks::SharedBlocks;
use strata_io::MapEntry;
use strata_runtime::{RegistryError, SlotState, WorldRegistry};
use strata_world::WorldSettings;

fn entry(id: u32) -> MapEntry {
    MapEntry {
        id,
        name: format!("w{id}"),
        directory: PathBuf::from(format!("worlds/w{id}")),
        unique_id: format!("uid-{id}"),
    }
}

proptest! {
    #[test]
    fn registered_ids_round_trip_through_map_list(ids in proptest::collection::btree_set(0u32..64, 0..24)) {
        let reg = WorldRegistry::new("/data", SharedBlocks::default(), WorldSettings::default());
        for &id in &ids {
            reg.register(&entry(id)).unwrap();
        }

        let listed: Vec<u32> = reg.map_list().maps.iter().map(|m| m.id).collect();
        let expected: Vec<u32> = ids.iter().copied().collect();
        prop_assert_eq!(listed, expected);
        for m in reg.map_list().maps {
            let want = entry(m.id);
            prop_assert_eq!(&m, &want);
        }

        let free = (0..).find(|id| !ids.contains(id)).unwrap();
        prop_assert_eq!(reg.next_free_id(), free);
        for &id in &ids {
            prop_assert_eq!(reg.state(id), Some(SlotState::Unloaded));
            prop_assert!(reg.get(id).is_none());
        }
    }

    #[test]
    fn duplicate_registration_is_rejected(ids in proptest::collection::vec(0u32..8, 1..16)) {
        let reg = WorldRegistry::new("/data", SharedBlocks::default(), WorldSettings::default());
        let mut seen = BTreeSet::new();
        for id in ids {
            let res = reg.register(&entry(id));
            if seen.insert(id) {
                prop_assert!(res.is_ok());
            } else {
                prop_assert!(matches!(res, Err(RegistryError::DuplicateId(d)) if d == id));
            }
        }
    }
}
