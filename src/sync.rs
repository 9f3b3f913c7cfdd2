// Whole-buffer helpers over the full signature -> delta -> patch pipeline.
//
// Each step goes through the wire format, so the output of one helper is
// exactly what the other end of a session would receive.

use std::io::Write;

use crate::catalog::BlockCatalog;
use crate::engine::{self, DiffStats};
use crate::error::SyncError;
use crate::protocol::blocks;
use crate::protocol::delta::{self, DeltaWriter};
use crate::sink::Reconstructor;

/// Build the catalog of `basis` and encode it for the wire.
pub fn signature_all(basis: &[u8], block_size: usize) -> Result<Vec<u8>, SyncError> {
    let catalog = BlockCatalog::from_slice(basis, block_size)?;
    blocks::encode_blocks(&catalog)
}

/// Diff `new` against a catalog and write the encoded delta stream to `out`.
pub fn encode_all<W: Write>(
    out: &mut W,
    catalog: &BlockCatalog,
    new: &[u8],
    block_size: usize,
) -> Result<DiffStats, SyncError> {
    engine::diff(catalog, block_size, new, DeltaWriter::new(out))
}

/// Decode a wire catalog, diff `new` against it and return the delta stream.
pub fn delta_all(signature: &[u8], new: &[u8], block_size: usize) -> Result<Vec<u8>, SyncError> {
    let catalog = blocks::read_blocks(&mut &signature[..])?;
    let mut out = Vec::new();
    encode_all(&mut out, &catalog, new, block_size)?;
    Ok(out)
}

/// Apply an encoded delta stream to `basis` and return the new content.
pub fn patch_all(basis: &[u8], delta: &[u8], block_size: usize) -> Result<Vec<u8>, SyncError> {
    let mut rec = Reconstructor::new(basis, Vec::new(), block_size)?;
    delta::read_delta(&mut &delta[..], &mut rec)?;
    Ok(rec.into_inner())
}
