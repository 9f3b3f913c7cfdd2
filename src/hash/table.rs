// Weak-checksum index over a block catalog.
//
// Maps each 64-bit weak checksum to every block index carrying it, in
// ascending order.  Walking a bucket front to back therefore visits
// candidates in catalog order, so the first strong-hash hit is the
// lowest-index match.

use std::collections::HashMap;

use crate::error::SyncError;

/// Multi-valued lookup from weak checksum to block indices.
#[derive(Debug, Clone, Default)]
pub struct BlockIndex {
    buckets: HashMap<u64, Vec<u32>>,
}

impl BlockIndex {
    /// Build an index from weak checksums listed in catalog order.
    pub fn build<I>(checksums: I) -> Result<Self, SyncError>
    where
        I: IntoIterator<Item = u64>,
    {
        let mut index = Self::default();
        for (i, cksum) in checksums.into_iter().enumerate() {
            index.insert(cksum, block_index(i)?);
        }
        Ok(index)
    }

    /// Append a block index under `cksum`.
    ///
    /// Indices must be inserted in ascending order.
    pub fn insert(&mut self, cksum: u64, index: u32) {
        let bucket = self.buckets.entry(cksum).or_default();
        debug_assert!(bucket.last().is_none_or(|&last| last < index));
        bucket.push(index);
    }

    /// All block indices whose weak checksum equals `cksum`, ascending.
    #[inline]
    pub fn candidates(&self, cksum: u64) -> &[u32] {
        self.buckets.get(&cksum).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True if any block has this weak checksum.
    #[inline]
    pub fn contains(&self, cksum: u64) -> bool {
        self.buckets.contains_key(&cksum)
    }

    /// Number of distinct weak checksums.
    pub fn distinct(&self) -> usize {
        self.buckets.len()
    }
}

/// Index of the block at `position` in the catalog.
///
/// Match records carry a `u32`, so a catalog cannot hold more blocks than
/// that can address.
pub(crate) fn block_index(position: usize) -> Result<u32, SyncError> {
    u32::try_from(position).map_err(|_| SyncError::TooManyBlocks(position))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
