// Error type shared by catalog construction, the diff engine, sinks and the
// wire protocol.
//
// Three families:
//   - I/O failures on a byte source or sink (including truncated streams).
//   - Protocol errors while decoding a catalog or delta stream.
//   - Precondition violations on session parameters.

use thiserror::Error;

/// Errors produced by rollsync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Read or write failure on an underlying byte source or sink.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Delta stream contained a tag byte that is not Match/Literal/Finished.
    #[error("unknown delta instruction tag: {0:#04x}")]
    UnknownTag(u8),

    /// A length or count field cannot be represented on the wire, or was
    /// negative when read from it.
    #[error("invalid {field} on the wire: {value}")]
    InvalidLength {
        /// Which field was out of range (`"block count"`, `"literal length"`, ...).
        field: &'static str,
        /// The offending value.
        value: i64,
    },

    /// Block size must be at least one byte.
    #[error("invalid block size: {0} (must be at least 1)")]
    InvalidBlockSize(usize),

    /// A catalog would need block indices beyond `u32::MAX`.
    #[error("too many blocks: block {0} cannot be addressed by a u32 index")]
    TooManyBlocks(usize),

    /// A Match referenced a block the baseline cannot supply in full.
    #[error("block {index} is out of range for the baseline (block size {block_size})")]
    BlockOutOfRange {
        /// Index carried by the Match event.
        index: u32,
        /// Block size of the session.
        block_size: usize,
    },

    /// An expected digest was not valid hex of the right length.
    #[error("invalid digest {value:?}: {reason}")]
    InvalidDigest {
        /// The digest as supplied.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Reconstructed content does not hash to the expected digest.
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Hex digest the caller expected.
        expected: String,
        /// Hex digest of the reconstructed output.
        actual: String,
    },
}

impl SyncError {
    /// True for errors caused by malformed wire data rather than I/O or
    /// caller mistakes.
    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::UnknownTag(_) | Self::InvalidLength { .. })
    }

    /// True when the underlying reader ran out of bytes mid-record.
    pub fn is_truncated(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == std::io::ErrorKind::UnexpectedEof)
    }
}
