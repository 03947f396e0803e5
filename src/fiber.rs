//! The `FiberDat` tractography file format.
//!
//! A fiber-data file opens with a fixed 128-byte header tagged `"FiberDat"`,
//! followed by one record per fiber: a 16-byte record header holding the
//! point count, a display color and the selected point range, then
//! `point_count` little-endian `f32` coordinate triples.
//!
//! Field order, width and endianness are stated explicitly here instead of
//! reading structs as raw byte blocks, so the format does not depend on any
//! particular in-memory layout.

use crate::errors::{Error, Result};
use crate::voxel::VoxelGrid;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use na::{Point3, Vector3};
use std::io::{Read, Write};

/// Size of the fixed file header, in bytes.
pub const HEADER_LEN: usize = 128;

/// The tag opening every fiber-data file.
pub const FIBER_TAG: [u8; 8] = *b"FiberDat";

/// The fixed 128-byte header of a fiber-data file.
///
/// The meaningful fields occupy the first 54 bytes; the remainder of the
/// header is zero padding.
#[derive(Clone, Debug, PartialEq)]
pub struct FiberDatHeader {
    /// Total number of fibers in the file.
    pub fiber_count: u32,
    /// Length of the longest fiber, in points.
    pub max_fiber_len: u32,
    /// Mean fiber length, in points.
    pub mean_fiber_len: f32,
    /// Image dimensions: width, height, slices.
    pub dims: Vector3<u32>,
    /// Physical voxel size: width, height, slice thickness.
    pub voxel_size: Vector3<f32>,
    /// Slice orientation code.
    pub slice_orientation: u8,
    /// Slice sequencing code.
    pub slice_sequencing: u8,
    /// Version tag.
    pub version: [u8; 8],
}

impl FiberDatHeader {
    /// Reads and validates a file header.
    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let mut buf = [0u8; HEADER_LEN];
        r.read_exact(&mut buf)?;

        let mut tag = [0u8; 8];
        tag.copy_from_slice(&buf[0..8]);
        if tag != FIBER_TAG {
            return Err(Error::BadMagic(tag));
        }

        // Sequential reads below line up with the C struct offsets: the
        // version tag starts at byte 46.
        let mut cur = &buf[8..];
        let fiber_count = cur.read_u32::<LittleEndian>()?;
        let max_fiber_len = cur.read_u32::<LittleEndian>()?;
        let mean_fiber_len = cur.read_f32::<LittleEndian>()?;
        let dims = Vector3::new(
            cur.read_u32::<LittleEndian>()?,
            cur.read_u32::<LittleEndian>()?,
            cur.read_u32::<LittleEndian>()?,
        );
        let voxel_size = Vector3::new(
            cur.read_f32::<LittleEndian>()?,
            cur.read_f32::<LittleEndian>()?,
            cur.read_f32::<LittleEndian>()?,
        );
        let slice_orientation = cur.read_u8()?;
        let slice_sequencing = cur.read_u8()?;
        let mut version = [0u8; 8];
        cur.read_exact(&mut version)?;

        Ok(Self {
            fiber_count,
            max_fiber_len,
            mean_fiber_len,
            dims,
            voxel_size,
            slice_orientation,
            slice_sequencing,
            version,
        })
    }

    /// Serializes the header, zero-padded to its fixed 128-byte length.
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        let mut buf = Vec::with_capacity(HEADER_LEN);
        buf.extend_from_slice(&FIBER_TAG);
        buf.write_u32::<LittleEndian>(self.fiber_count)?;
        buf.write_u32::<LittleEndian>(self.max_fiber_len)?;
        buf.write_f32::<LittleEndian>(self.mean_fiber_len)?;
        for i in 0..3 {
            buf.write_u32::<LittleEndian>(self.dims[i])?;
        }
        for i in 0..3 {
            buf.write_f32::<LittleEndian>(self.voxel_size[i])?;
        }
        buf.write_u8(self.slice_orientation)?;
        buf.write_u8(self.slice_sequencing)?;
        buf.extend_from_slice(&self.version);
        buf.resize(HEADER_LEN, 0);
        w.write_all(&buf)?;
        Ok(())
    }

    /// The voxel grid spanned by the image dimensions of this header.
    pub fn grid(&self) -> VoxelGrid {
        VoxelGrid::new(self.dims)
    }
}

/// One fiber: its record header and its ordered point sequence.
#[derive(Clone, Debug, PartialEq)]
pub struct Fiber {
    /// Reserved byte following the point count.
    pub reserved: u8,
    /// Display color, `(r, g, b)`.
    pub color: [u8; 3],
    /// First point of the selected range.
    pub select_start: i32,
    /// Last point of the selected range.
    pub select_end: i32,
    /// The ordered 3D points of the streamline.
    pub points: Vec<Point3<f32>>,
}

impl Fiber {
    /// Reads one fiber record.
    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let point_count = r.read_i32::<LittleEndian>()?.max(0) as usize;
        let reserved = r.read_u8()?;
        let mut color = [0u8; 3];
        r.read_exact(&mut color)?;
        let select_start = r.read_i32::<LittleEndian>()?;
        let select_end = r.read_i32::<LittleEndian>()?;

        let mut points = Vec::with_capacity(point_count);
        for _ in 0..point_count {
            let x = r.read_f32::<LittleEndian>()?;
            let y = r.read_f32::<LittleEndian>()?;
            let z = r.read_f32::<LittleEndian>()?;
            points.push(Point3::new(x, y, z));
        }

        Ok(Self {
            reserved,
            color,
            select_start,
            select_end,
            points,
        })
    }

    /// Serializes one fiber record.
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_i32::<LittleEndian>(self.points.len() as i32)?;
        w.write_u8(self.reserved)?;
        w.write_all(&self.color)?;
        w.write_i32::<LittleEndian>(self.select_start)?;
        w.write_i32::<LittleEndian>(self.select_end)?;
        for p in &self.points {
            w.write_f32::<LittleEndian>(p.x)?;
            w.write_f32::<LittleEndian>(p.y)?;
            w.write_f32::<LittleEndian>(p.z)?;
        }
        Ok(())
    }
}

/// Streaming reader over the fibers of a fiber-data file.
///
/// The header is read and validated eagerly; fibers are then decoded one at a
/// time in file order, so arbitrarily large files are processed in constant
/// memory.
pub struct FiberReader<R> {
    header: FiberDatHeader,
    reader: R,
    remaining: u32,
}

impl<R: Read> FiberReader<R> {
    /// Opens a fiber stream, reading and validating the 128-byte header.
    pub fn new(mut reader: R) -> Result<Self> {
        let header = FiberDatHeader::read_from(&mut reader)?;
        let remaining = header.fiber_count;
        Ok(Self {
            header,
            reader,
            remaining,
        })
    }

    /// The validated file header.
    pub fn header(&self) -> &FiberDatHeader {
        &self.header
    }

    /// Caps the number of fibers this reader will yield.
    ///
    /// Used to limit a run to a prefix of the file, e.g. for a quick test on
    /// a multi-million fiber input.
    pub fn limit(&mut self, max: u32) {
        self.remaining = self.remaining.min(max);
    }
}

impl<R: Read> Iterator for FiberReader<R> {
    type Item = Result<Fiber>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(Fiber::read_from(&mut self.reader))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn header() -> FiberDatHeader {
        FiberDatHeader {
            fiber_count: 2,
            max_fiber_len: 120,
            mean_fiber_len: 35.5,
            dims: Vector3::new(10, 10, 10),
            voxel_size: Vector3::new(1.0, 1.0, 1.0),
            slice_orientation: 0,
            slice_sequencing: 0,
            version: *b"0.3\0\0\0\0\0",
        }
    }

    #[test]
    fn header_round_trips_at_fixed_length() {
        let mut bytes = Vec::new();
        header().write_to(&mut bytes).unwrap();
        assert_eq!(bytes.len(), HEADER_LEN);

        let decoded = FiberDatHeader::read_from(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(decoded, header());
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut bytes = Vec::new();
        header().write_to(&mut bytes).unwrap();
        bytes[0..8].copy_from_slice(b"NotFiber");

        match FiberDatHeader::read_from(&mut Cursor::new(&bytes)) {
            Err(Error::BadMagic(tag)) => assert_eq!(&tag, b"NotFiber"),
            other => panic!("expected BadMagic, got {other:?}"),
        }
    }

    #[test]
    fn fiber_record_round_trips() {
        let fiber = Fiber {
            reserved: 0,
            color: [255, 0, 128],
            select_start: 0,
            select_end: 1,
            points: vec![Point3::new(2.5, 2.5, 2.5), Point3::new(3.0, 2.5, 2.5)],
        };

        let mut bytes = Vec::new();
        fiber.write_to(&mut bytes).unwrap();
        // 16-byte record header plus two 12-byte points.
        assert_eq!(bytes.len(), 16 + 24);

        let decoded = Fiber::read_from(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(decoded, fiber);
    }

    #[test]
    fn reader_streams_fibers_and_honors_limit() {
        let fiber = Fiber {
            reserved: 0,
            color: [0, 0, 0],
            select_start: 0,
            select_end: 0,
            points: vec![Point3::new(4.5, 4.5, 4.5)],
        };

        let mut bytes = Vec::new();
        header().write_to(&mut bytes).unwrap();
        fiber.write_to(&mut bytes).unwrap();
        fiber.write_to(&mut bytes).unwrap();

        let reader = FiberReader::new(Cursor::new(&bytes)).unwrap();
        assert_eq!(reader.map(|f| f.unwrap()).count(), 2);

        let mut limited = FiberReader::new(Cursor::new(&bytes)).unwrap();
        limited.limit(1);
        assert_eq!(limited.map(|f| f.unwrap()).count(), 1);
    }
}
