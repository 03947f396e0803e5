//! Error types shared by every stage of the pipeline.

use na::Point3;
use std::io;

/// Convenience alias for results produced by this crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors raised while building or aggregating connectivity graphs.
///
/// None of these are recoverable mid-pipeline: every downstream stage assumes
/// a fully consistent upstream structure, so callers are expected to abort the
/// run on the first error rather than keep a partial output.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The input does not start with the `"FiberDat"` file tag.
    #[error("not a fiber-data file: expected tag \"FiberDat\", found {0:?}")]
    BadMagic([u8; 8]),
    /// A fiber contained no point with a fractional part of 0.5 on all three
    /// axes. The tractography format encodes true voxel centers this way, so
    /// a missing origin means the data file is malformed.
    #[error("fiber {0} has no origin point; the file does not encode voxel centers")]
    MissingOrigin(usize),
    /// A line of the spatial side table did not hold four integers.
    #[error("malformed spatial table at line {0}")]
    MalformedSpatialLine(usize),
    /// The spatial side table holds a different number of voxels than the
    /// sparse matrix has rows.
    #[error("spatial table lists {actual} voxels but the matrix has {expected} rows")]
    SpatialTableSize {
        /// Number of rows announced by the sparse matrix header.
        expected: u32,
        /// Number of voxel lines found in the spatial table.
        actual: usize,
    },
    /// The sparse matrix header declares a different number of columns than
    /// rows. The voxel matrix is square by construction, so an unequal
    /// header means the file is corrupt.
    #[error("sparse matrix declares {cols} columns but {rows} rows")]
    HeaderNotSquare {
        /// Number of rows announced by the header.
        rows: u32,
        /// Number of columns announced by the header.
        cols: u32,
    },
    /// A sparse matrix entry referenced a row outside the matrix.
    #[error("sparse matrix entry references row {row}, but the matrix has {rows} rows")]
    RowIndexOutOfRange {
        /// The offending row index as stored on disk.
        row: i32,
        /// Number of rows announced by the header.
        rows: u32,
    },
    /// The region volume holds a different number of bytes than its declared
    /// dimensions require. Partial reads are not tolerated: a short volume
    /// would silently mislabel voxels.
    #[error("region volume is {actual} bytes, expected exactly {expected}")]
    RegionVolumeSize {
        /// Byte length implied by the volume dimensions.
        expected: u64,
        /// Byte length actually present.
        actual: u64,
    },
    /// A covered voxel lies outside the region volume.
    #[error("voxel {0:?} lies outside the region volume")]
    VoxelOutsideVolume(Point3<u32>),
    /// A region label fell outside the atlas range after the >100 shift.
    #[error("region label {label} of voxel {voxel} is outside the atlas range")]
    RegionLabelOutOfRange {
        /// The shifted label value.
        label: i32,
        /// Dense index of the voxel carrying the label.
        voxel: u32,
    },
    /// An underlying read or write failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}
