// Wire protocol for block catalogs and delta streams.
//
// All integers are fixed width, big-endian.
//
// Catalog:
//   [i32 count] then count x ([i64 weak checksum][16-byte strong hash])
//
// Delta stream, a sequence of tagged records:
//   [u8 0][i32 block index]           Match
//   [u8 1][i32 length][length bytes]  Literal
//   [u8 2]                            Finished (terminates the stream)
//
// There is no outer framing and no checksum over the payload; a stream that
// ends early surfaces as an `UnexpectedEof` I/O error.

pub mod blocks;
pub mod delta;

use std::io::{self, Read, Write};

use crate::error::SyncError;

/// Tag of a Match record.
pub const TAG_MATCH: u8 = 0;

/// Tag of a Literal record.
pub const TAG_LITERAL: u8 = 1;

/// Tag of the terminating Finished record.
pub const TAG_FINISHED: u8 = 2;

/// Encoded size of one catalog entry.
pub const BLOCK_RECORD_LEN: usize = 8 + crate::hash::strong::STRONG_HASH_LEN;

// ---------------------------------------------------------------------------
// Fixed-width integers
// ---------------------------------------------------------------------------

pub(crate) fn write_u8<W: Write>(w: &mut W, v: u8) -> io::Result<()> {
    w.write_all(&[v])
}

pub(crate) fn write_i32<W: Write>(w: &mut W, v: i32) -> io::Result<()> {
    w.write_all(&v.to_be_bytes())
}

pub(crate) fn write_u64<W: Write>(w: &mut W, v: u64) -> io::Result<()> {
    w.write_all(&v.to_be_bytes())
}

pub(crate) fn read_u8<R: Read>(r: &mut R) -> io::Result<u8> {
    let mut b = [0u8; 1];
    r.read_exact(&mut b)?;
    Ok(b[0])
}

pub(crate) fn read_i32<R: Read>(r: &mut R) -> io::Result<i32> {
    let mut b = [0u8; 4];
    r.read_exact(&mut b)?;
    Ok(i32::from_be_bytes(b))
}

pub(crate) fn read_u64<R: Read>(r: &mut R) -> io::Result<u64> {
    let mut b = [0u8; 8];
    r.read_exact(&mut b)?;
    Ok(u64::from_be_bytes(b))
}

/// Convert a length or index to its `i32` wire form.
pub(crate) fn to_wire_len(field: &'static str, v: usize) -> Result<i32, SyncError> {
    i32::try_from(v).map_err(|_| SyncError::InvalidLength {
        field,
        value: v as i64,
    })
}

/// Read an `i32` length or index that must not be negative.
pub(crate) fn read_wire_len<R: Read>(r: &mut R, field: &'static str) -> Result<u32, SyncError> {
    let v = read_i32(r)?;
    u32::try_from(v).map_err(|_| SyncError::InvalidLength {
        field,
        value: i64::from(v),
    })
}
