use proptest::prelude::*;
use strata_geom::{BlockBox, Dims, Vec3S};
use strata_voxel::{VoxelBuffer, VoxelError};

fn dim() -> impl Strategy<Value = u16> {
    1u16..=8
}

fn dims() -> impl Strategy<Value = Dims> {
    (dim(), dim(), dim()).prop_map(|(x, y, z)| Dims::new(x, y, z))
}

fn patterned(d: Dims) -> VoxelBuffer {
    let blocks = (0..d.volume()).map(|i| (i % 251) as u8 + 1).collect();
    VoxelBuffer::from_raw(d, blocks, None).unwrap()
}

proptest! {
    // idx is x + y*sx + z*sx*sy and hits every slot once
    #[test]
    fn idx_is_linear_and_unique(d in dims()) {
        let buf = VoxelBuffer::new(d).unwrap();
        let mut seen = vec![false; d.volume()];
        for z in 0..d.z { for y in 0..d.y { for x in 0..d.x {
            let i = buf.idx(Vec3S::new(x, y, z)).unwrap();
            let expect = x as usize + y as usize * d.x as usize + z as usize * d.x as usize * d.y as usize;
            prop_assert_eq!(i, expect);
            prop_assert!(!seen[i]);
            seen[i] = true;
        }}}
        prop_assert!(seen.into_iter().all(|b| b));
    }

    // set then get returns the written type in bounds
    #[test]
    fn set_then_get(d in dims(), x in 0u16..8, y in 0u16..8, z in 0u16..8, ty in any::<u8>()) {
        let mut buf = VoxelBuffer::new(d).unwrap();
        let p = Vec3S::new(x % d.x, y % d.y, z % d.z);
        buf.set(p, ty).unwrap();
        prop_assert_eq!(buf.get(p), Ok(ty));
    }

    // Out-of-bounds reads and writes fail and leave the buffer untouched
    #[test]
    fn out_of_bounds_rejected(d in dims(), axis in 0usize..3, over in 0u16..4, ty in 1u8..=255) {
        let mut buf = patterned(d);
        let before = buf.clone();
        let mut p = Vec3S::ZERO;
        match axis {
            0 => p.x = d.x + over,
            1 => p.y = d.y + over,
            _ => p.z = d.z + over,
        }
        prop_assert_eq!(buf.get(p), Err(VoxelError::OutOfBounds { pos: p, dims: d }));
        prop_assert_eq!(buf.set(p, ty), Err(VoxelError::OutOfBounds { pos: p, dims: d }));
        prop_assert_eq!(buf, before);
    }

    // Resize keeps the overlap and zero-fills cells outside the old dimensions
    #[test]
    fn resize_keeps_overlap(old in dims(), new in dims()) {
        let src = patterned(old);
        let mut buf = src.clone();
        buf.resize(new).unwrap();
        prop_assert_eq!(buf.dims(), new);
        prop_assert_eq!(buf.len(), new.volume());
        for z in 0..new.z { for y in 0..new.y { for x in 0..new.x {
            let p = Vec3S::new(x, y, z);
            let expect = if old.contains(p) { src.get(p).unwrap() } else { 0 };
            prop_assert_eq!(buf.get(p).unwrap(), expect);
        }}}
    }

    // region copies exactly the boxed cells
    #[test]
    fn region_copies_box(d in dims(), a in (0u16..8, 0u16..8, 0u16..8), b in (0u16..8, 0u16..8, 0u16..8)) {
        let buf = patterned(d);
        let pa = Vec3S::new(a.0 % d.x, a.1 % d.y, a.2 % d.z);
        let pb = Vec3S::new(b.0 % d.x, b.1 % d.y, b.2 % d.z);
        let bx = BlockBox::new(pa, pb);
        let region = buf.region(&bx).unwrap();
        prop_assert_eq!(region.dims(), bx.size());
        for p in bx.iter() {
            let q = Vec3S::new(p.x - bx.min.x, p.y - bx.min.y, p.z - bx.min.z);
            prop_assert_eq!(region.get(q).unwrap(), buf.get(p).unwrap());
        }
    }
}

#[test]
fn clear_zeroes_everything() {
    let mut buf = patterned(Dims::new(3, 3, 3));
    assert!(buf.has_non_air());
    buf.clear();
    assert!(!buf.has_non_air());
}

#[test]
fn iter_visits_storage_order() {
    let buf = patterned(Dims::new(2, 3, 2));
    let cells: Vec<_> = buf.iter().collect();
    assert_eq!(cells.len(), 12);
    for (p, ty) in cells {
        assert_eq!(buf.get(p).unwrap(), ty);
    }
}
