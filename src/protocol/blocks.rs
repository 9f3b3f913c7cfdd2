// Catalog encoding: [i32 count][count x (i64 weak, 16-byte strong)].

use std::io::{Read, Write};

use log::debug;

use super::{read_u64, read_wire_len, to_wire_len, write_i32, write_u64};
use crate::catalog::{Block, BlockCatalog};
use crate::error::SyncError;
use crate::hash::strong::{STRONG_HASH_LEN, StrongHash};

/// Upper bound on entries pre-allocated from an untrusted count field.
const MAX_PREALLOC_BLOCKS: usize = 1 << 16;

/// Write `catalog` to `w`.
pub fn write_blocks<W: Write>(catalog: &BlockCatalog, w: &mut W) -> Result<(), SyncError> {
    let count = to_wire_len("block count", catalog.len())?;
    write_i32(w, count)?;
    for block in catalog {
        write_u64(w, block.weak)?;
        w.write_all(block.strong.as_bytes())?;
    }
    debug!("protocol: wrote catalog of {count} blocks");
    Ok(())
}

/// Read a catalog written by [`write_blocks`].
pub fn read_blocks<R: Read>(r: &mut R) -> Result<BlockCatalog, SyncError> {
    let count = read_wire_len(r, "block count")? as usize;
    let mut blocks = Vec::with_capacity(count.min(MAX_PREALLOC_BLOCKS));
    for _ in 0..count {
        let weak = read_u64(r)?;
        let mut hash = [0u8; STRONG_HASH_LEN];
        r.read_exact(&mut hash)?;
        blocks.push(Block {
            weak,
            strong: StrongHash::from_bytes(hash),
        });
    }
    debug!("protocol: read catalog of {count} blocks");
    BlockCatalog::from_blocks(blocks)
}

/// Encode a catalog into a fresh buffer.
pub fn encode_blocks(catalog: &BlockCatalog) -> Result<Vec<u8>, SyncError> {
    let mut out = Vec::with_capacity(4 + catalog.len() * super::BLOCK_RECORD_LEN);
    write_blocks(catalog, &mut out)?;
    Ok(out)
}
