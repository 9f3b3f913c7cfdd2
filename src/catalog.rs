// Block catalog: the baseline side's description of its content.
//
// The baseline is read sequentially in chunks of exactly `block_size` bytes.
// Every complete chunk becomes one `Block` (weak checksum + strong hash), in
// read order, so block `i` covers baseline bytes `i * block_size ..
// (i + 1) * block_size`.
//
// A final chunk shorter than `block_size` is excluded: those trailing bytes
// are never matchable and the diff engine sends them as literals instead.
// Only the bytes read in the current iteration are ever hashed.

use std::io::{self, Read};

use log::debug;

use crate::config::validate_block_size;
use crate::error::SyncError;
use crate::hash::rolling;
use crate::hash::strong::StrongHash;
use crate::hash::table::{BlockIndex, block_index};

// ---------------------------------------------------------------------------
// Block
// ---------------------------------------------------------------------------

/// One fixed-length slice of the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Block {
    /// Weak rolling checksum of the block.
    pub weak: u64,
    /// Strong hash of the block.
    pub strong: StrongHash,
}

impl Block {
    /// Compute both checksums for `data`.
    pub fn compute(data: &[u8]) -> Self {
        Self {
            weak: rolling::checksum(data),
            strong: StrongHash::compute(data),
        }
    }
}

// ---------------------------------------------------------------------------
// BlockCatalog
// ---------------------------------------------------------------------------

/// Ordered, immutable list of baseline blocks plus a weak-checksum index.
///
/// Safe to share across threads; every diff session only reads it.
#[derive(Debug, Clone, Default)]
pub struct BlockCatalog {
    blocks: Vec<Block>,
    index: BlockIndex,
}

impl BlockCatalog {
    /// Build a catalog by reading `reader` to the end.
    pub fn build<R: Read>(mut reader: R, block_size: usize) -> Result<Self, SyncError> {
        validate_block_size(block_size)?;

        let mut blocks = Vec::new();
        let mut buf = vec![0u8; block_size];
        let mut tail = 0usize;
        loop {
            let n = read_chunk(&mut reader, &mut buf)?;
            if n < block_size {
                tail = n;
                break;
            }
            block_index(blocks.len())?;
            blocks.push(Block::compute(&buf));
        }

        let catalog = Self::from_blocks(blocks)?;
        debug!(
            "catalog: {} blocks of {block_size} bytes ({} distinct weak checksums), \
             {tail} trailing bytes excluded",
            catalog.len(),
            catalog.index.distinct()
        );
        Ok(catalog)
    }

    /// Build a catalog over an in-memory baseline.
    pub fn from_slice(data: &[u8], block_size: usize) -> Result<Self, SyncError> {
        Self::build(data, block_size)
    }

    /// Wrap an existing block list (e.g. one decoded from the wire).
    ///
    /// Fails if the list holds more blocks than a `u32` index can address.
    pub fn from_blocks(blocks: Vec<Block>) -> Result<Self, SyncError> {
        let index = BlockIndex::build(blocks.iter().map(|b| b.weak))?;
        Ok(Self { blocks, index })
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// True if the baseline had no complete block.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Block at `index`.
    pub fn get(&self, index: u32) -> Option<&Block> {
        self.blocks.get(index as usize)
    }

    /// All blocks in catalog order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Iterate blocks in catalog order.
    pub fn iter(&self) -> std::slice::Iter<'_, Block> {
        self.blocks.iter()
    }

    /// Cheap pre-filter: could any block match a window with this checksum?
    #[inline]
    pub fn has_weak(&self, weak: u64) -> bool {
        self.index.contains(weak)
    }

    /// Find the lowest-index block whose weak checksum is `weak` and whose
    /// strong hash equals that of `window`.
    ///
    /// The strong hash of `window` is computed at most once, and only if
    /// some block shares the weak checksum.
    pub fn find_match(&self, weak: u64, window: &[u8]) -> Option<u32> {
        if !self.has_weak(weak) {
            return None;
        }
        let strong = StrongHash::compute(window);
        self.index
            .candidates(weak)
            .iter()
            .copied()
            .find(|&i| self.blocks[i as usize].strong == strong)
    }
}

impl PartialEq for BlockCatalog {
    fn eq(&self, other: &Self) -> bool {
        self.blocks == other.blocks
    }
}

impl Eq for BlockCatalog {}

impl<'a> IntoIterator for &'a BlockCatalog {
    type Item = &'a Block;
    type IntoIter = std::slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}

/// Fill `buf` from `reader`, tolerating short reads.
///
/// Returns the number of bytes placed in `buf`; less than `buf.len()` only
/// at end of input.
pub(crate) fn read_chunk<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Reader that hands out at most `step` bytes per call.
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = buf.len().min(self.step).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn blocks_in_read_order() {
        let data: Vec<u8> = (0..32u8).collect();
        let cat = BlockCatalog::from_slice(&data, 8).unwrap();
        assert_eq!(cat.len(), 4);
        for (i, block) in cat.iter().enumerate() {
            assert_eq!(*block, Block::compute(&data[i * 8..(i + 1) * 8]));
        }
    }

    #[test]
    fn short_tail_is_excluded() {
        let data: Vec<u8> = (0..30u8).collect();
        let cat = BlockCatalog::from_slice(&data, 8).unwrap();
        assert_eq!(cat.len(), 3);
        assert_eq!(cat.get(2), Some(&Block::compute(&data[16..24])));
        assert!(cat.get(3).is_none());
    }

    #[test]
    fn short_tail_does_not_see_stale_bytes() {
        // A tail that would equal the previous block if the buffer were reused
        // without truncation must not add a block.
        let data = b"ABCDABCDAB";
        let cat = BlockCatalog::from_slice(data, 4).unwrap();
        assert_eq!(cat.len(), 2);
    }

    #[test]
    fn baseline_shorter_than_block() {
        let cat = BlockCatalog::from_slice(b"abc", 8).unwrap();
        assert!(cat.is_empty());
        let cat = BlockCatalog::from_slice(b"", 8).unwrap();
        assert!(cat.is_empty());
    }

    #[test]
    fn short_reads_still_form_whole_blocks() {
        let data: Vec<u8> = (0..64u8).collect();
        let trickled = BlockCatalog::build(Trickle { data: &data, step: 3 }, 16).unwrap();
        let direct = BlockCatalog::from_slice(&data, 16).unwrap();
        assert_eq!(trickled, direct);
    }

    #[test]
    fn deterministic() {
        let data: Vec<u8> = (0..1000u32).map(|i| (i * 7 % 251) as u8).collect();
        let a = BlockCatalog::from_slice(&data, 37).unwrap();
        let b = BlockCatalog::from_slice(&data, 37).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.blocks(), b.blocks());
    }

    #[test]
    fn zero_block_size_rejected() {
        let err = BlockCatalog::from_slice(b"data", 0).unwrap_err();
        assert!(matches!(err, SyncError::InvalidBlockSize(0)));
    }

    #[test]
    fn find_match_prefers_lowest_index() {
        let data = b"abcdXXXXabcdabcd";
        let cat = BlockCatalog::from_slice(data, 4).unwrap();
        let weak = rolling::checksum(b"abcd");
        assert_eq!(cat.find_match(weak, b"abcd"), Some(0));
        assert_eq!(cat.find_match(rolling::checksum(b"XXXX"), b"XXXX"), Some(1));
    }

    #[test]
    fn find_match_rejects_weak_collision() {
        // Both windows have a = 2 and b = 4.
        let cat = BlockCatalog::from_slice(&[1, 0, 1], 3).unwrap();
        let weak = rolling::checksum(&[1, 0, 1]);
        assert_eq!(weak, rolling::checksum(&[0, 2, 0]));
        assert!(cat.has_weak(weak));
        assert_eq!(cat.find_match(weak, &[0, 2, 0]), None);
        assert_eq!(cat.find_match(weak, &[1, 0, 1]), Some(0));
        assert!(!cat.has_weak(weak + 1));
    }

    #[test]
    fn catalog_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BlockCatalog>();
    }
}
