/*!
tractograph
===========

**tractograph** converts raw brain-fiber tractography data into structural
connectivity graphs.

Each fiber (an ordered poly-line of 3D points) is discretized into the grid
voxels it passes through; every pair of voxels touched by a common fiber
contributes to a symmetric, weighted adjacency structure which is written out
as a column-major sparse binary matrix together with a text side table mapping
dense matrix indices back to voxel coordinates. A second, independent pass can
collapse the voxel-level matrix into a fixed 71×71 anatomical-region adjacency
matrix using an external region-label volume.

The pipeline is a strictly sequential batch process over local files: fibers
are consumed one at a time in file order, the serialized matrix is produced
once at end of stream, and any format or I/O error aborts the run — there is
no partial-success mode.
*/

#![deny(non_camel_case_types)]
#![deny(unused_parens)]
#![deny(non_upper_case_globals)]
#![warn(missing_docs)]
#![warn(unused_imports)]

pub extern crate nalgebra as na;

pub mod errors;
pub mod fiber;
pub mod graph;
pub mod region;
pub mod sparse;
pub mod voxel;
pub mod voxelize;

pub use errors::{Error, Result};
