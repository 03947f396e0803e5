//! Accumulation of the voxel-level adjacency graph across fibers.

use crate::voxel::{ComboKey, VoxelGrid};
use na::Point3;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// The accumulation state for one run of the pipeline: the coverage set of
/// voxels touched by at least one fiber, and the weighted edge map between
/// them.
///
/// Only one direction of every edge is stored, under the canonical
/// [`ComboKey`] ordering; the mirrored entries are re-derived wholesale at
/// serialization time. Self-edges (a fiber revisiting the same voxel) are
/// never stored in the edge map — they only bump the self-overlapping fiber
/// counter, at most once per fiber.
///
/// Fibers are folded in one at a time; there is no concurrent-access
/// discipline on this structure, by far the cheapest option for a pipeline
/// that is I/O-bound on a single sequential file.
pub struct FiberGraph {
    grid: VoxelGrid,
    coverage: BTreeSet<u32>,
    edges: BTreeMap<ComboKey, u32>,
    self_overlapping_fibers: u64,
    fibers: u64,
}

impl FiberGraph {
    /// Creates an empty graph over the given grid.
    pub fn new(grid: VoxelGrid) -> Self {
        Self {
            grid,
            coverage: BTreeSet::new(),
            edges: BTreeMap::new(),
            self_overlapping_fibers: 0,
            fibers: 0,
        }
    }

    /// The voxel grid this graph is defined over.
    pub fn grid(&self) -> &VoxelGrid {
        &self.grid
    }

    /// Keys of the voxels touched by at least one fiber, in ascending order.
    pub fn coverage(&self) -> &BTreeSet<u32> {
        &self.coverage
    }

    /// The accumulated edges and their co-occurrence weights.
    pub fn edges(&self) -> &BTreeMap<ComboKey, u32> {
        &self.edges
    }

    /// Number of fibers that revisited at least one of their own voxels.
    pub fn self_overlapping_fibers(&self) -> u64 {
        self.self_overlapping_fibers
    }

    /// Number of fibers folded into the graph so far.
    pub fn fibers(&self) -> u64 {
        self.fibers
    }

    /// Folds one voxelized fiber into the graph.
    ///
    /// Every position pair `(j, k)` with `j < k` either marks the fiber as
    /// self-overlapping (equal voxel keys) or increments the weight of the
    /// canonical edge between the two voxels by one. A voxel pair recurring
    /// at several position indices within the same fiber still contributes
    /// exactly one increment.
    ///
    /// The scan is O(n²) in the fiber length, which stays in the tens to low
    /// hundreds of points; the fiber count, not the fiber length, is the
    /// large dimension of the input.
    pub fn add_fiber(&mut self, voxels: &[Point3<u32>]) {
        let mut recorded: HashSet<ComboKey> = HashSet::new();
        let mut self_overlap = false;

        for j in 0..voxels.len() {
            let a = self.grid.key(&voxels[j]);
            self.coverage.insert(a);

            for k in j + 1..voxels.len() {
                let b = self.grid.key(&voxels[k]);
                if a == b {
                    self_overlap = true;
                    continue;
                }

                let combo = ComboKey::new(a, b);
                if recorded.insert(combo) {
                    *self.edges.entry(combo).or_insert(0) += 1;
                }
            }
        }

        if self_overlap {
            self.self_overlapping_fibers += 1;
        }
        self.fibers += 1;
    }
}
