// Strong block hash: SHA-256 truncated to 128 bits.
//
// Only consulted after a weak checksum hit, so its cost is paid at most once
// per window position.

use sha2::{Digest, Sha256};

/// Length in bytes of a [`StrongHash`] on the wire.
pub const STRONG_HASH_LEN: usize = 16;

/// 128-bit digest confirming a weak-checksum match.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StrongHash([u8; STRONG_HASH_LEN]);

impl StrongHash {
    /// Hash a block of data.
    pub fn compute(data: &[u8]) -> Self {
        let digest = Sha256::digest(data);
        let mut out = [0u8; STRONG_HASH_LEN];
        out.copy_from_slice(&digest[..STRONG_HASH_LEN]);
        Self(out)
    }

    /// Wrap raw digest bytes (e.g. read from the wire).
    pub const fn from_bytes(bytes: [u8; STRONG_HASH_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes.
    pub const fn as_bytes(&self) -> &[u8; STRONG_HASH_LEN] {
        &self.0
    }

    /// Lower-case hex rendering.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Debug for StrongHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StrongHash({})", self.to_hex())
    }
}
