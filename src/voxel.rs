//! The discrete voxel grid and the canonical identifiers derived from it.

use na::{Point3, Vector3};

/// A bounded grid of unit voxels with known dimensions `(x, y, z)`.
///
/// Every voxel is identified by its integer coordinates in
/// `[0, x) × [0, y) × [0, z)` and, equivalently, by a scalar key
/// `z*y_dim*x_dim + y*x_dim + x`, a bijection onto `[0, x*y*z)`. The key is
/// the canonical identity used for ordering, hashing and the dense index
/// assignment performed at serialization time.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct VoxelGrid {
    dims: Vector3<u32>,
}

impl VoxelGrid {
    /// Creates a grid with the given dimensions.
    pub fn new(dims: Vector3<u32>) -> Self {
        Self { dims }
    }

    /// The grid dimensions.
    pub fn dims(&self) -> Vector3<u32> {
        self.dims
    }

    /// Total number of voxels in the grid.
    pub fn len(&self) -> u32 {
        self.dims.x * self.dims.y * self.dims.z
    }

    /// Does the grid contain no voxel at all?
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Does `voxel` lie inside the grid bounds?
    pub fn contains(&self, voxel: &Point3<u32>) -> bool {
        voxel.x < self.dims.x && voxel.y < self.dims.y && voxel.z < self.dims.z
    }

    /// The scalar key of a voxel.
    pub fn key(&self, voxel: &Point3<u32>) -> u32 {
        voxel.z * self.dims.y * self.dims.x + voxel.y * self.dims.x + voxel.x
    }

    /// The voxel coordinates of a scalar key. Inverse of [`Self::key`].
    pub fn voxel(&self, key: u32) -> Point3<u32> {
        Point3::new(
            key % self.dims.x,
            (key / self.dims.x) % self.dims.y,
            key / (self.dims.x * self.dims.y),
        )
    }
}

/// Canonical identifier of an undirected edge between two distinct voxels.
///
/// The two 32-bit voxel keys are packed into a single 64-bit value with the
/// numerically smaller key in the high-order half. Ordering a collection of
/// combo keys therefore groups edges by their smaller endpoint in ascending
/// key order, which is exactly the traversal the serializer needs when it
/// emits column blocks.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComboKey(u64);

impl ComboKey {
    /// Packs the unordered pair `{a, b}` into its canonical form.
    ///
    /// Self-edges are never stored in the adjacency graph, so `a` and `b`
    /// must be distinct.
    pub fn new(a: u32, b: u32) -> Self {
        debug_assert!(a != b, "self-edges are counted separately, not stored");
        let (min, max) = if a < b { (a, b) } else { (b, a) };
        ComboKey(((min as u64) << 32) | max as u64)
    }

    /// The smaller voxel key of the pair.
    pub fn first(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// The larger voxel key of the pair.
    pub fn second(self) -> u32 {
        self.0 as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_a_bijection() {
        let grid = VoxelGrid::new(Vector3::new(5, 7, 3));
        let mut seen = std::collections::HashSet::new();
        for z in 0..3 {
            for y in 0..7 {
                for x in 0..5 {
                    let v = Point3::new(x, y, z);
                    let key = grid.key(&v);
                    assert!(key < grid.len());
                    assert!(seen.insert(key));
                    assert_eq!(grid.voxel(key), v);
                }
            }
        }
    }

    #[test]
    fn combo_key_is_order_independent() {
        assert_eq!(ComboKey::new(3, 5), ComboKey::new(5, 3));
        assert_eq!(ComboKey::new(3, 5).first(), 3);
        assert_eq!(ComboKey::new(3, 5).second(), 5);
    }

    #[test]
    fn combo_keys_sort_by_smaller_endpoint() {
        let mut combos = vec![
            ComboKey::new(9, 2),
            ComboKey::new(1, 7),
            ComboKey::new(4, 2),
        ];
        combos.sort();
        assert_eq!(combos[0].first(), 1);
        assert_eq!(combos[1], ComboKey::new(2, 4));
        assert_eq!(combos[2], ComboKey::new(2, 9));
    }
}
