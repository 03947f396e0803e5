//! Collapse of the voxel-level matrix into anatomical-region adjacency.
//!
//! This is the second-stage pipeline: it consumes the serialized voxel
//! sparse matrix, the coordinate side table, and an externally supplied
//! region-label volume, and produces a fixed-size dense region-by-region
//! adjacency matrix.

use crate::errors::{Error, Result};
use crate::sparse::SparseReader;
use byteorder::{BigEndian, ReadBytesExt};
use na::{Point3, Vector3};
use std::io::{Read, Write};

/// Number of anatomical regions in the atlas.
pub const REGION_COUNT: usize = 71;

/// Dimensions of the atlas volume shipped with the original pipeline.
pub fn default_atlas_dims() -> Vector3<u32> {
    Vector3::new(256, 256, 199)
}

/// An externally supplied dense volume of anatomical region labels.
///
/// On disk the volume is raw big-endian 32-bit integers, exactly `x*y*z` of
/// them, laid out in the fixed convention `index = x*X*Y + y*X + z`. Labels
/// above 100 are shifted down by 65 on lookup, matching the atlas numbering.
#[derive(Debug)]
pub struct RegionVolume {
    dims: Vector3<u32>,
    labels: Vec<i32>,
}

impl RegionVolume {
    /// Loads a region volume, failing unless the stream holds exactly
    /// `x*y*z` labels.
    pub fn read_from<R: Read>(dims: Vector3<u32>, r: &mut R) -> Result<Self> {
        let count = dims.x as u64 * dims.y as u64 * dims.z as u64;
        let expected = count * 4;

        let mut bytes = Vec::new();
        let actual = r.read_to_end(&mut bytes)? as u64;
        if actual != expected {
            return Err(Error::RegionVolumeSize { expected, actual });
        }

        let mut cur = bytes.as_slice();
        let mut labels = Vec::with_capacity(count as usize);
        for _ in 0..count {
            labels.push(cur.read_i32::<BigEndian>()?);
        }
        Ok(Self { dims, labels })
    }

    /// The volume dimensions.
    pub fn dims(&self) -> Vector3<u32> {
        self.dims
    }

    /// The (shifted) region label at the given voxel coordinates.
    pub fn label(&self, voxel: &Point3<u32>) -> Result<i32> {
        if voxel.x >= self.dims.x || voxel.y >= self.dims.y || voxel.z >= self.dims.z {
            return Err(Error::VoxelOutsideVolume(*voxel));
        }
        let index = (voxel.x * self.dims.x * self.dims.y + voxel.y * self.dims.x + voxel.z) as usize;
        // The atlas convention mixes dimensions, so an in-bounds voxel can
        // still map past the stored labels when the volume is not cubic
        // (e.g. x >= z_dim with the default atlas).
        let label = *self
            .labels
            .get(index)
            .ok_or(Error::VoxelOutsideVolume(*voxel))?;
        Ok(if label > 100 { label - 65 } else { label })
    }
}

/// The fixed-size region-by-region adjacency matrix.
///
/// `counts` receives one increment per sparse matrix entry; when the
/// aggregation runs with weights enabled, a parallel matrix accumulates the
/// entry values under the same symmetric rule. Both are symmetric by
/// construction: every voxel-level entry contributes to `[start][end]` and,
/// off the diagonal, to `[end][start]` as well.
#[derive(Debug)]
pub struct RegionMatrix {
    counts: [[i64; REGION_COUNT]; REGION_COUNT],
    sums: Option<[[i64; REGION_COUNT]; REGION_COUNT]>,
}

impl RegionMatrix {
    fn new(weights: bool) -> Self {
        Self {
            counts: [[0; REGION_COUNT]; REGION_COUNT],
            sums: weights.then(|| [[0; REGION_COUNT]; REGION_COUNT]),
        }
    }

    /// The entry count between two regions.
    pub fn count(&self, start: usize, end: usize) -> i64 {
        self.counts[start][end]
    }

    /// The weighted sum between two regions, if weights were accumulated.
    pub fn sum(&self, start: usize, end: usize) -> Option<i64> {
        self.sums.map(|sums| sums[start][end])
    }

    /// Was the matrix aggregated with weights enabled?
    pub fn has_weights(&self) -> bool {
        self.sums.is_some()
    }

    /// Sum of all count cells.
    pub fn total(&self) -> i64 {
        self.counts.iter().flatten().sum()
    }

    fn write_matrix<W: Write>(m: &[[i64; REGION_COUNT]; REGION_COUNT], w: &mut W) -> Result<()> {
        for row in m {
            for value in row {
                write!(w, "{} ", value)?;
            }
            writeln!(w)?;
        }
        Ok(())
    }

    /// Prints the count matrix row-major, one row per line.
    pub fn write_counts<W: Write>(&self, w: &mut W) -> Result<()> {
        Self::write_matrix(&self.counts, w)
    }

    /// Prints the weighted-sum matrix row-major, if present.
    pub fn write_sums<W: Write>(&self, w: &mut W) -> Result<()> {
        match &self.sums {
            Some(sums) => Self::write_matrix(sums, w),
            None => Ok(()),
        }
    }
}

/// Streams a serialized voxel matrix column by column and collapses it into
/// region space.
///
/// `coords` is the dense-index → coordinate table read from the spatial side
/// table; it must list exactly one voxel per matrix row. Every voxel is
/// resolved to its region up front, and each `(row, col, value)` entry then
/// increments the count matrix at `[startRegion][endRegion]` and its mirror
/// (unless start and end coincide). With `weights` enabled the entry value is
/// accumulated into the parallel sum matrix under the same rule.
pub fn aggregate<R: Read>(
    matrix: &mut SparseReader<R>,
    coords: &[Point3<u32>],
    volume: &RegionVolume,
    weights: bool,
) -> Result<RegionMatrix> {
    let header = matrix.header();
    if header.num_cols != header.num_rows {
        return Err(Error::HeaderNotSquare {
            rows: header.num_rows,
            cols: header.num_cols,
        });
    }
    if coords.len() != header.num_rows as usize {
        return Err(Error::SpatialTableSize {
            expected: header.num_rows,
            actual: coords.len(),
        });
    }

    // voxel → region, checked once so the streaming loop below can index
    // the matrices directly.
    let mut regions = Vec::with_capacity(coords.len());
    for (index, coord) in coords.iter().enumerate() {
        let label = volume.label(coord)?;
        if label < 0 || label as usize >= REGION_COUNT {
            return Err(Error::RegionLabelOutOfRange {
                label,
                voxel: index as u32,
            });
        }
        regions.push(label as usize);
    }

    log::debug!(
        "aggregating {} columns over {} regions",
        header.num_cols,
        REGION_COUNT
    );

    let mut result = RegionMatrix::new(weights);
    let mut col = 0usize;
    while let Some(entries) = matrix.next_column()? {
        let start = regions[col];
        for (row, value) in entries {
            let end = regions[row as usize];
            result.counts[start][end] += 1;
            if start != end {
                result.counts[end][start] += 1;
            }
            if let Some(sums) = result.sums.as_mut() {
                sums[start][end] += value as i64;
                if start != end {
                    sums[end][start] += value as i64;
                }
            }
        }
        col += 1;
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;
    use std::io::Cursor;

    fn volume_with(dims: Vector3<u32>, labels: &[(usize, i32)]) -> RegionVolume {
        let count = (dims.x * dims.y * dims.z) as usize;
        let mut raw = vec![0i32; count];
        for &(index, label) in labels {
            raw[index] = label;
        }
        let mut bytes = Vec::with_capacity(count * 4);
        for label in raw {
            bytes.write_i32::<BigEndian>(label).unwrap();
        }
        RegionVolume::read_from(dims, &mut Cursor::new(bytes)).unwrap()
    }

    #[test]
    fn volume_size_mismatch_is_fatal() {
        let dims = Vector3::new(4, 4, 4);
        let bytes = vec![0u8; 4 * 4 * 4 * 4 - 4];
        match RegionVolume::read_from(dims, &mut Cursor::new(bytes)) {
            Err(Error::RegionVolumeSize { expected, actual }) => {
                assert_eq!(expected, 256);
                assert_eq!(actual, 252);
            }
            other => panic!("expected RegionVolumeSize, got {other:?}"),
        }
    }

    #[test]
    fn labels_above_100_are_shifted() {
        let dims = Vector3::new(4, 4, 4);
        // index = x*16 + y*4 + z for these dims.
        let volume = volume_with(dims, &[(0, 12), (21, 112)]);
        assert_eq!(volume.label(&Point3::new(0, 0, 0)).unwrap(), 12);
        assert_eq!(volume.label(&Point3::new(1, 1, 1)).unwrap(), 47);
    }

    #[test]
    fn index_past_the_stored_labels_is_rejected() {
        // At the default atlas dims the index convention runs past the
        // stored labels for any voxel with x >= z_dim, even though every
        // coordinate is inside the volume bounds.
        let dims = default_atlas_dims();
        let bytes = vec![0u8; (dims.x * dims.y * dims.z) as usize * 4];
        let volume = RegionVolume::read_from(dims, &mut Cursor::new(bytes)).unwrap();

        assert!(matches!(
            volume.label(&Point3::new(200, 0, 0)),
            Err(Error::VoxelOutsideVolume(_))
        ));
        // The largest voxel the convention can still address resolves fine.
        assert_eq!(volume.label(&Point3::new(198, 255, 198)).unwrap(), 0);
    }

    #[test]
    fn out_of_volume_voxel_is_rejected() {
        let volume = volume_with(Vector3::new(4, 4, 4), &[]);
        assert!(matches!(
            volume.label(&Point3::new(4, 0, 0)),
            Err(Error::VoxelOutsideVolume(_))
        ));
    }

    fn sparse_bytes(columns: &[&[(i32, f32)]]) -> Vec<u8> {
        use byteorder::LittleEndian;
        let total: usize = columns.iter().map(|c| c.len()).sum();
        let mut bytes = Vec::new();
        bytes
            .write_i32::<LittleEndian>(columns.len() as i32)
            .unwrap();
        bytes
            .write_i32::<LittleEndian>(columns.len() as i32)
            .unwrap();
        bytes.write_i32::<LittleEndian>(total as i32).unwrap();
        for column in columns {
            bytes
                .write_i32::<LittleEndian>(column.len() as i32)
                .unwrap();
            for &(row, value) in *column {
                bytes.write_i32::<LittleEndian>(row).unwrap();
                bytes.write_f32::<LittleEndian>(value).unwrap();
            }
        }
        bytes
    }

    #[test]
    fn off_diagonal_entries_are_mirrored() {
        // Voxels 0 and 2 map to region 5, voxel 1 to region 7.
        let dims = Vector3::new(4, 4, 4);
        let volume = volume_with(dims, &[(0, 5), (21, 7), (42, 5)]);
        let coords = [
            Point3::new(0, 0, 0),
            Point3::new(1, 1, 1),
            Point3::new(2, 2, 2),
        ];

        let bytes = sparse_bytes(&[
            &[(1, 1.0)],
            &[(0, 1.0), (2, 2.0)],
            &[(1, 2.0)],
        ]);
        let mut matrix = SparseReader::new(Cursor::new(bytes)).unwrap();
        let stats = aggregate(&mut matrix, &coords, &volume, false).unwrap();

        assert_eq!(stats.count(5, 7), 4);
        assert_eq!(stats.count(7, 5), 4);
        assert_eq!(stats.count(5, 5), 0);
        assert_eq!(stats.total(), 8);
        assert!(!stats.has_weights());
    }

    #[test]
    fn diagonal_entries_are_counted_once() {
        // Both voxels in region 3.
        let dims = Vector3::new(4, 4, 4);
        let volume = volume_with(dims, &[(0, 3), (21, 3)]);
        let coords = [Point3::new(0, 0, 0), Point3::new(1, 1, 1)];

        let bytes = sparse_bytes(&[&[(1, 1.0)], &[(0, 1.0)]]);
        let mut matrix = SparseReader::new(Cursor::new(bytes)).unwrap();
        let stats = aggregate(&mut matrix, &coords, &volume, false).unwrap();

        assert_eq!(stats.count(3, 3), 2);
        assert_eq!(stats.total(), 2);
    }

    #[test]
    fn weights_accumulate_in_a_parallel_matrix() {
        let dims = Vector3::new(4, 4, 4);
        let volume = volume_with(dims, &[(0, 5), (21, 7)]);
        let coords = [Point3::new(0, 0, 0), Point3::new(1, 1, 1)];

        let bytes = sparse_bytes(&[&[(1, 3.0)], &[(0, 3.0)]]);
        let mut matrix = SparseReader::new(Cursor::new(bytes)).unwrap();
        let stats = aggregate(&mut matrix, &coords, &volume, true).unwrap();

        assert_eq!(stats.count(5, 7), 2);
        assert_eq!(stats.sum(5, 7), Some(6));
        assert_eq!(stats.sum(7, 5), Some(6));
    }

    #[test]
    fn out_of_range_label_is_rejected() {
        let dims = Vector3::new(4, 4, 4);
        // 180 shifts to 115, outside the 71-region atlas.
        let volume = volume_with(dims, &[(0, 180)]);
        let coords = [Point3::new(0, 0, 0)];

        let bytes = sparse_bytes(&[&[]]);
        let mut matrix = SparseReader::new(Cursor::new(bytes)).unwrap();
        match aggregate(&mut matrix, &coords, &volume, false) {
            Err(Error::RegionLabelOutOfRange { label: 115, .. }) => {}
            other => panic!("expected RegionLabelOutOfRange, got {other:?}"),
        }
    }

    #[test]
    fn non_square_header_is_rejected() {
        use byteorder::LittleEndian;
        // Header claims 2 columns over 1 row; the second column block would
        // index past the voxel -> region table.
        let mut bytes = Vec::new();
        bytes.write_i32::<LittleEndian>(1).unwrap();
        bytes.write_i32::<LittleEndian>(2).unwrap();
        bytes.write_i32::<LittleEndian>(0).unwrap();
        bytes.write_i32::<LittleEndian>(0).unwrap();
        bytes.write_i32::<LittleEndian>(0).unwrap();

        let volume = volume_with(Vector3::new(4, 4, 4), &[]);
        let mut matrix = SparseReader::new(Cursor::new(bytes)).unwrap();
        assert!(matches!(
            aggregate(&mut matrix, &[Point3::new(0, 0, 0)], &volume, false),
            Err(Error::HeaderNotSquare { rows: 1, cols: 2 })
        ));
    }

    #[test]
    fn spatial_table_must_match_matrix_rows() {
        let volume = volume_with(Vector3::new(4, 4, 4), &[]);
        let bytes = sparse_bytes(&[&[], &[]]);
        let mut matrix = SparseReader::new(Cursor::new(bytes)).unwrap();
        assert!(matches!(
            aggregate(&mut matrix, &[Point3::new(0, 0, 0)], &volume, false),
            Err(Error::SpatialTableSize { expected: 2, actual: 1 })
        ));
    }
}
