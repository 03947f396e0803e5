//! On-disk serialization of the accumulated graph.
//!
//! Two artifacts are produced at end of stream: a text side table mapping the
//! dense matrix indices back to voxel coordinates, and a column-major sparse
//! binary matrix — a `(numRows, numCols, totalNonZeroEntries)` header of
//! little-endian `i32`, then per column an `i32` entry count followed by that
//! many `(i32 rowIndex, f32 value)` pairs.
//!
//! Row and column indices refer to the dense coverage-set enumeration, not
//! raw voxel keys.

use crate::errors::{Error, Result};
use crate::graph::FiberGraph;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use na::Point3;
use std::collections::BTreeMap;
use std::io::{BufRead, Read, Write};

/// The `(numRows, numCols, totalNonZeroEntries)` header of a sparse binary
/// matrix.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SparseHeader {
    /// Number of matrix rows, equal to the covered voxel count.
    pub num_rows: u32,
    /// Number of matrix columns, always equal to `num_rows`.
    pub num_cols: u32,
    /// Total non-zero entries across all columns: twice the distinct edge
    /// count, since every edge contributes a forward and a mirrored entry.
    pub non_zero_entries: u32,
}

impl SparseHeader {
    /// Reads a sparse matrix header.
    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        Ok(Self {
            num_rows: r.read_i32::<LittleEndian>()? as u32,
            num_cols: r.read_i32::<LittleEndian>()? as u32,
            non_zero_entries: r.read_i32::<LittleEndian>()? as u32,
        })
    }

    /// Writes a sparse matrix header.
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_i32::<LittleEndian>(self.num_rows as i32)?;
        w.write_i32::<LittleEndian>(self.num_cols as i32)?;
        w.write_i32::<LittleEndian>(self.non_zero_entries as i32)?;
        Ok(())
    }
}

/// Writes the spatial side table: a `n x y z` header line, then one line per
/// covered voxel holding its dense index and 3D coordinates.
///
/// Voxels are enumerated in ascending key order. This enumeration defines the
/// dense index space of the sparse matrix and of every downstream consumer.
pub fn write_spatial<W: Write>(graph: &FiberGraph, w: &mut W) -> Result<()> {
    writeln!(w, "n x y z")?;
    for (index, &key) in graph.coverage().iter().enumerate() {
        let v = graph.grid().voxel(key);
        writeln!(w, "{} {} {} {}", index, v.x, v.y, v.z)?;
    }
    Ok(())
}

/// Reads a spatial side table back into its dense-index → coordinate form:
/// element `i` of the returned vector is the coordinate of matrix row `i`.
pub fn read_spatial<R: BufRead>(r: R) -> Result<Vec<Point3<u32>>> {
    let mut coords = Vec::new();
    let mut lines = r.lines();

    // Skip the "n x y z" header line.
    if let Some(line) = lines.next() {
        line?;
    }

    for (n, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        // Line numbers are 1-based and account for the header line.
        let line_no = n + 2;
        let fields: Vec<u32> = line
            .split_whitespace()
            .map(str::parse)
            .collect::<core::result::Result<_, _>>()
            .map_err(|_| Error::MalformedSpatialLine(line_no))?;
        if fields.len() != 4 {
            return Err(Error::MalformedSpatialLine(line_no));
        }
        coords.push(Point3::new(fields[1], fields[2], fields[3]));
    }
    Ok(coords)
}

/// Serializes the graph as a column-major sparse binary matrix.
///
/// Only one direction of every edge was stored during accumulation; the
/// mirrored entries are synthesized here, so the emitted matrix reads fully
/// symmetrically column by column, and `totalNonZeroEntries` equals twice the
/// distinct edge count.
///
/// Every dense column gets a block, including covered voxels with no edges at
/// all (a single-point fiber touches a voxel without ever pairing it), so the
/// file always holds exactly `numCols` blocks.
pub fn write_sparse<W: Write>(graph: &FiberGraph, w: &mut W) -> Result<()> {
    // Dense index assignment: ascending enumeration of the coverage set.
    let dense: BTreeMap<u32, u32> = graph
        .coverage()
        .iter()
        .enumerate()
        .map(|(index, &key)| (key, index as u32))
        .collect();

    // Mirror every edge into both endpoint columns. Row maps are keyed by
    // voxel key, which orders rows ascending within each column.
    let mut columns: BTreeMap<u32, BTreeMap<u32, u32>> = BTreeMap::new();
    for (combo, &weight) in graph.edges() {
        columns
            .entry(combo.first())
            .or_default()
            .insert(combo.second(), weight);
        columns
            .entry(combo.second())
            .or_default()
            .insert(combo.first(), weight);
    }

    let header = SparseHeader {
        num_rows: graph.coverage().len() as u32,
        num_cols: graph.coverage().len() as u32,
        non_zero_entries: graph.edges().len() as u32 * 2,
    };
    header.write_to(w)?;

    for &key in graph.coverage().iter() {
        match columns.get(&key) {
            Some(rows) => {
                w.write_i32::<LittleEndian>(rows.len() as i32)?;
                for (row_key, &weight) in rows {
                    w.write_i32::<LittleEndian>(dense[row_key] as i32)?;
                    w.write_f32::<LittleEndian>(weight as f32)?;
                }
            }
            None => w.write_i32::<LittleEndian>(0)?,
        }
    }
    Ok(())
}

/// Streaming reader over the column blocks of a sparse binary matrix.
pub struct SparseReader<R> {
    header: SparseHeader,
    reader: R,
    next_col: u32,
}

impl<R: Read> SparseReader<R> {
    /// Opens a sparse matrix stream, reading its header.
    pub fn new(mut reader: R) -> Result<Self> {
        let header = SparseHeader::read_from(&mut reader)?;
        Ok(Self {
            header,
            reader,
            next_col: 0,
        })
    }

    /// The matrix header.
    pub fn header(&self) -> SparseHeader {
        self.header
    }

    /// Reads the next column's `(rowIndex, value)` entries, or `None` once
    /// all `numCols` blocks have been consumed.
    ///
    /// Row indices are validated against the header; a reference outside the
    /// matrix means the file is corrupt.
    pub fn next_column(&mut self) -> Result<Option<Vec<(u32, f32)>>> {
        if self.next_col == self.header.num_cols {
            return Ok(None);
        }
        self.next_col += 1;

        let count = self.reader.read_i32::<LittleEndian>()?.max(0) as usize;
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            let row = self.reader.read_i32::<LittleEndian>()?;
            let value = self.reader.read_f32::<LittleEndian>()?;
            if row < 0 || row as u32 >= self.header.num_rows {
                return Err(Error::RowIndexOutOfRange {
                    row,
                    rows: self.header.num_rows,
                });
            }
            entries.push((row as u32, value));
        }
        Ok(Some(entries))
    }
}
