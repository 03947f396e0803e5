//! Discretization of a fiber's point sequence into the voxels it traverses.

use crate::errors::{Error, Result};
use crate::voxel::VoxelGrid;
use na::Point3;

/// Index of the fiber's origin point: the unique point whose fractional part
/// is exactly 0.5 on all three axes. The tractography format encodes true
/// voxel centers this way.
fn origin_index(points: &[Point3<f32>]) -> Option<usize> {
    points
        .iter()
        .position(|p| p.x.fract() == 0.5 && p.y.fract() == 0.5 && p.z.fract() == 0.5)
}

/// Floors `point` into a voxel, disambiguating grid-boundary coordinates by
/// direction of travel.
///
/// `prev` is the neighboring point one walk step closer to the origin. An
/// axis coordinate with a zero fractional part lies exactly on the plane
/// shared by two cells; the segment is considered to occupy the cell it came
/// from, so when the axis moved in the negative direction the voxel index is
/// decremented on that axis.
fn snap(point: &Point3<f32>, prev: &Point3<f32>) -> Point3<u32> {
    let mut coords = [0u32; 3];
    for axis in 0..3 {
        let mut c = point[axis].floor() as i64;
        if point[axis].fract() == 0.0 && point[axis] < prev[axis] {
            c -= 1;
        }
        coords[axis] = c as u32;
    }
    Point3::new(coords[0], coords[1], coords[2])
}

/// Voxelizes one fiber, producing exactly one voxel per input point, in input
/// order.
///
/// The walk starts at the fiber's origin point, whose floored coordinates are
/// its voxel directly, and proceeds backward then forward along the sequence
/// so that every step can compare against the neighbor it came from. A fiber
/// with no origin point aborts with [`Error::MissingOrigin`]; this is a
/// fatal input-format violation, not a recoverable per-fiber condition.
///
/// `fiber_index` only appears in the error message.
pub fn voxelize(
    fiber_index: usize,
    points: &[Point3<f32>],
    grid: &VoxelGrid,
) -> Result<Vec<Point3<u32>>> {
    let origin = origin_index(points).ok_or(Error::MissingOrigin(fiber_index))?;

    let mut voxels = vec![Point3::origin(); points.len()];
    voxels[origin] = points[origin].map(|c| c.floor() as u32);

    for j in (0..origin).rev() {
        voxels[j] = snap(&points[j], &points[j + 1]);
    }
    for j in origin + 1..points.len() {
        voxels[j] = snap(&points[j], &points[j - 1]);
    }

    debug_assert!(voxels.iter().all(|v| grid.contains(v)));
    Ok(voxels)
}
