// Session parameters.

use crate::error::SyncError;

/// Default block size (1 KiB).
pub const DEFAULT_BLOCK_SIZE: usize = 1024;

/// Default size of the chunks pulled from a byte source (64 KiB).
pub const DEFAULT_READ_BUFFER: usize = 64 * 1024;

/// Parameters both ends of a session must agree on, plus local tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Block size in bytes. Must match on both ends.
    pub block_size: usize,
    /// How many bytes the diff engine requests from its source per read.
    /// Purely local; has no effect on the produced events.
    pub read_buffer_size: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            read_buffer_size: DEFAULT_READ_BUFFER,
        }
    }
}

impl SyncOptions {
    /// Options with the given block size and default tuning.
    pub fn with_block_size(block_size: usize) -> Self {
        Self {
            block_size,
            ..Self::default()
        }
    }

    /// Check the session preconditions.
    pub fn validate(&self) -> Result<(), SyncError> {
        validate_block_size(self.block_size)
    }
}

/// Block size must be positive.
pub fn validate_block_size(block_size: usize) -> Result<(), SyncError> {
    if block_size == 0 {
        return Err(SyncError::InvalidBlockSize(block_size));
    }
    Ok(())
}
