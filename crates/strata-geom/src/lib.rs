//! Block positions, world dimensions and boxes shared by the map crates.
#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

/// Integer cell position. Z is the vertical axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct Vec3S {
    pub x: u16,
    pub y: u16,
    pub z: u16,
}

impl Vec3S {
    pub const ZERO: Vec3S = Vec3S { x: 0, y: 0, z: 0 };

    #[inline]
    pub const fn new(x: u16, y: u16, z: u16) -> Self {
        Self { x, y, z }
    }

    /// Checked offset; `None` when any axis leaves the u16 range.
    #[inline]
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Option<Vec3S> {
        let x = u16::try_from(i32::from(self.x) + dx).ok()?;
        let y = u16::try_from(i32::from(self.y) + dy).ok()?;
        let z = u16::try_from(i32::from(self.z) + dz).ok()?;
        Some(Vec3S { x, y, z })
    }

    #[inline]
    pub fn below(self) -> Option<Vec3S> {
        self.offset(0, 0, -1)
    }

    /// The four horizontal neighbours in +X, -X, +Y, -Y order.
    pub fn horizontal_neighbors(self) -> impl Iterator<Item = Vec3S> {
        [(1, 0), (-1, 0), (0, 1), (0, -1)]
            .into_iter()
            .filter_map(move |(dx, dy)| self.offset(dx, dy, 0))
    }

    /// The six face neighbours; positions that would underflow or overflow are skipped.
    pub fn face_neighbors(self) -> impl Iterator<Item = Vec3S> {
        [
            (1, 0, 0),
            (-1, 0, 0),
            (0, 1, 0),
            (0, -1, 0),
            (0, 0, 1),
            (0, 0, -1),
        ]
        .into_iter()
        .filter_map(move |(dx, dy, dz)| self.offset(dx, dy, dz))
    }
}

/// Size of a world or region along each axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dims {
    pub x: u16,
    pub y: u16,
    pub z: u16,
}

impl Dims {
    #[inline]
    pub const fn new(x: u16, y: u16, z: u16) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn volume(self) -> usize {
        usize::from(self.x) * usize::from(self.y) * usize::from(self.z)
    }

    /// No axis may be zero.
    #[inline]
    pub fn is_valid(self) -> bool {
        self.x > 0 && self.y > 0 && self.z > 0
    }

    #[inline]
    pub fn contains(self, p: Vec3S) -> bool {
        p.x < self.x && p.y < self.y && p.z < self.z
    }

    /// Per-axis minimum of two sizes.
    #[inline]
    pub fn overlap(self, other: Dims) -> Dims {
        Dims {
            x: self.x.min(other.x),
            y: self.y.min(other.y),
            z: self.z.min(other.z),
        }
    }

    /// Box covering every cell.
    pub fn full_box(self) -> Option<BlockBox> {
        if !self.is_valid() {
            return None;
        }
        Some(BlockBox::new(
            Vec3S::ZERO,
            Vec3S::new(self.x - 1, self.y - 1, self.z - 1),
        ))
    }
}

/// Inclusive box of cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockBox {
    pub min: Vec3S,
    pub max: Vec3S,
}

impl BlockBox {
    /// Corners may be given in any order.
    pub fn new(a: Vec3S, b: Vec3S) -> Self {
        Self {
            min: Vec3S::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Vec3S::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    #[inline]
    pub fn contains(&self, p: Vec3S) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// Extent in cells. Saturates at u16::MAX for a box spanning the full axis.
    #[inline]
    pub fn size(&self) -> Dims {
        Dims {
            x: (self.max.x - self.min.x).saturating_add(1),
            y: (self.max.y - self.min.y).saturating_add(1),
            z: (self.max.z - self.min.z).saturating_add(1),
        }
    }

    /// Clip to a world of the given size; `None` when nothing remains.
    pub fn clamp_to(&self, dims: Dims) -> Option<BlockBox> {
        if !dims.contains(self.min) {
            return None;
        }
        let max = Vec3S::new(
            self.max.x.min(dims.x - 1),
            self.max.y.min(dims.y - 1),
            self.max.z.min(dims.z - 1),
        );
        Some(BlockBox { min: self.min, max })
    }

    /// Cells in storage order (x fastest, then y, then z).
    pub fn iter(&self) -> impl Iterator<Item = Vec3S> + use<> {
        let (min, max) = (self.min, self.max);
        (min.z..=max.z).flat_map(move |z| {
            (min.y..=max.y).flat_map(move |y| (min.x..=max.x).map(move |x| Vec3S::new(x, y, z)))
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Entity position in block units plus orientation in degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub pos: Vec3,
    pub rotation: f32,
    pub look: f32,
}

impl Location {
    #[inline]
    pub const fn new(pos: Vec3, rotation: f32, look: f32) -> Self {
        Self {
            pos,
            rotation,
            look,
        }
    }

    /// Cell containing this location, if it lies in the non-negative u16 range.
    pub fn block_pos(&self) -> Option<Vec3S> {
        let axis = |v: f32| -> Option<u16> {
            let f = v.floor();
            if !f.is_finite() || f < 0.0 || f > f32::from(u16::MAX) {
                return None;
            }
            Some(f as u16)
        };
        Some(Vec3S::new(
            axis(self.pos.x)?,
            axis(self.pos.y)?,
            axis(self.pos.z)?,
        ))
    }

    #[inline]
    pub fn within(&self, b: &BlockBox) -> bool {
        self.block_pos().is_some_and(|p| b.contains(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn offset_roundtrips_when_in_range(p in any::<Vec3S>(), dx in -4i32..=4, dy in -4i32..=4, dz in -4i32..=4) {
            if let Some(q) = p.offset(dx, dy, dz) {
                prop_assert_eq!(q.offset(-dx, -dy, -dz), Some(p));
            } else {
                let fits = |v: u16, d: i32| (0..=i32::from(u16::MAX)).contains(&(i32::from(v) + d));
                prop_assert!(!(fits(p.x, dx) && fits(p.y, dy) && fits(p.z, dz)));
            }
        }
    }

    #[test]
    fn corner_has_three_face_neighbors() {
        assert_eq!(Vec3S::ZERO.face_neighbors().count(), 3);
        assert_eq!(Vec3S::new(1, 1, 1).face_neighbors().count(), 6);
    }
}
