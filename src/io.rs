// File-level helpers for the three session steps.
//
// `signature_file()`, `delta_file()` and `patch_file()` wrap the streaming
// engine with buffered I/O and return statistics.  With the `file-io`
// feature, SHA-256 digests of the streamed content are computed on the fly
// so the two ends can confirm the reconstruction.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

#[cfg(feature = "file-io")]
use sha2::{Digest, Sha256};

use crate::catalog::BlockCatalog;
use crate::config::SyncOptions;
use crate::engine;
use crate::error::SyncError;
use crate::protocol::blocks;
use crate::protocol::delta::{self, DeltaWriter};
use crate::sink::{Reconstructor, SeekSource};

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Statistics returned by `signature_file()`.
#[derive(Debug, Clone)]
pub struct SignatureStats {
    /// Basis file size in bytes.
    pub basis_size: u64,
    /// Blocks in the catalog.
    pub blocks: u64,
    /// Encoded signature size in bytes.
    pub signature_size: u64,
    /// SHA-256 of the basis file (if `file-io` feature is enabled).
    pub basis_sha256: Option<[u8; 32]>,
}

/// Statistics returned by `delta_file()`.
#[derive(Debug, Clone)]
pub struct DeltaStats {
    /// New file size in bytes.
    pub new_size: u64,
    /// Encoded delta size in bytes.
    pub delta_size: u64,
    /// Match records written.
    pub matched_blocks: u64,
    /// Literal records written.
    pub literal_runs: u64,
    /// Bytes carried in literal records.
    pub literal_bytes: u64,
    /// SHA-256 of the new file (if `file-io` feature is enabled).
    pub new_sha256: Option<[u8; 32]>,
}

/// Statistics returned by `patch_file()`.
#[derive(Debug, Clone)]
pub struct PatchStats {
    /// Delta records applied, Finished included.
    pub records: u64,
    /// Reconstructed output size in bytes.
    pub output_size: u64,
    /// SHA-256 of the reconstructed output (if `file-io` feature is enabled).
    pub output_sha256: Option<[u8; 32]>,
}

// ---------------------------------------------------------------------------
// Default buffer size
// ---------------------------------------------------------------------------

const BUF_SIZE: usize = 64 * 1024; // 64 KiB

// ---------------------------------------------------------------------------
// signature_file
// ---------------------------------------------------------------------------

/// Build the catalog of `basis_path` and write it to `signature_path`.
pub fn signature_file(
    basis_path: &Path,
    signature_path: &Path,
    opts: &SyncOptions,
) -> Result<SignatureStats, SyncError> {
    opts.validate()?;
    let basis = BufReader::with_capacity(BUF_SIZE, File::open(basis_path)?);
    let mut basis = HashingReader::new(basis);

    let catalog = BlockCatalog::build(&mut basis, opts.block_size)?;
    // Catalog construction stops short of a partial tail; drain it so the
    // size and digest cover the whole file.
    io::copy(&mut basis, &mut io::sink())?;
    let (basis_size, basis_sha256) = basis.finish();

    let mut out = BufWriter::with_capacity(BUF_SIZE, File::create(signature_path)?);
    blocks::write_blocks(&catalog, &mut out)?;
    out.flush()?;
    let signature_size = out.get_ref().metadata()?.len();

    Ok(SignatureStats {
        basis_size,
        blocks: catalog.len() as u64,
        signature_size,
        basis_sha256,
    })
}

// ---------------------------------------------------------------------------
// delta_file
// ---------------------------------------------------------------------------

/// Diff `new_path` against the signature in `signature_path`, writing the
/// delta stream to `delta_path`.
///
/// Each literal run is held in memory until the next match or the end of
/// input, and the wire format caps a run at `i32::MAX` bytes. A new file
/// over 2 GiB with no matching block is therefore buffered in full and then
/// rejected with [`SyncError::InvalidLength`].
pub fn delta_file(
    signature_path: &Path,
    new_path: &Path,
    delta_path: &Path,
    opts: &SyncOptions,
) -> Result<DeltaStats, SyncError> {
    opts.validate()?;
    let mut sig = BufReader::with_capacity(BUF_SIZE, File::open(signature_path)?);
    let catalog = blocks::read_blocks(&mut sig)?;

    let new_file = File::open(new_path)?;
    let mut new = HashingReader::new(new_file);

    let out = BufWriter::with_capacity(BUF_SIZE, File::create(delta_path)?);
    let mut writer = DeltaWriter::new(out);
    let stats = engine::diff_with_options(&catalog, &mut new, &mut writer, opts)?;
    let (new_size, new_sha256) = new.finish();

    let delta_size = writer
        .into_inner()
        .into_inner()
        .map_err(|e| e.into_error())?
        .metadata()?
        .len();

    Ok(DeltaStats {
        new_size,
        delta_size,
        matched_blocks: stats.matched_blocks,
        literal_runs: stats.literal_runs,
        literal_bytes: stats.literal_bytes,
        new_sha256,
    })
}

// ---------------------------------------------------------------------------
// patch_file
// ---------------------------------------------------------------------------

/// Rebuild the new content from `basis_path` and the delta in `delta_path`,
/// writing it to `output_path`.
pub fn patch_file(
    basis_path: &Path,
    delta_path: &Path,
    output_path: &Path,
    opts: &SyncOptions,
) -> Result<PatchStats, SyncError> {
    opts.validate()?;
    let basis = SeekSource::new(File::open(basis_path)?);
    let mut delta_in = BufReader::with_capacity(BUF_SIZE, File::open(delta_path)?);

    let output = BufWriter::with_capacity(BUF_SIZE, File::create(output_path)?);
    let output = HashingWriter::new(output);

    let mut rec = Reconstructor::new(basis, output, opts.block_size)?;
    let records = delta::read_delta(&mut delta_in, &mut rec)?;
    let (output_size, output_sha256) = rec.into_inner().finish();

    Ok(PatchStats {
        records,
        output_size,
        output_sha256,
    })
}

/// Compare a digest against the hex string the sender reported.
///
/// Fails with [`SyncError::InvalidDigest`] if `expected_hex` is not 64 hex
/// digits, and with [`SyncError::ChecksumMismatch`] if the digests differ.
pub fn check_sha256(expected_hex: &str, actual: &[u8; 32]) -> Result<(), SyncError> {
    let trimmed = expected_hex.trim();
    let invalid = |reason: String| SyncError::InvalidDigest {
        value: trimmed.to_string(),
        reason,
    };
    let expected = hex::decode(trimmed).map_err(|e| invalid(e.to_string()))?;
    if expected.len() != actual.len() {
        return Err(invalid(format!(
            "expected {} bytes, got {}",
            actual.len(),
            expected.len()
        )));
    }
    if expected[..] == actual[..] {
        Ok(())
    } else {
        Err(SyncError::ChecksumMismatch {
            expected: hex::encode(&expected),
            actual: hex::encode(actual),
        })
    }
}

// ---------------------------------------------------------------------------
// Hashing adapters
// ---------------------------------------------------------------------------

/// Counts (and with `file-io`, hashes) everything read through it.
struct HashingReader<R> {
    inner: R,
    len: u64,
    #[cfg(feature = "file-io")]
    hasher: Sha256,
}

impl<R: Read> HashingReader<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            len: 0,
            #[cfg(feature = "file-io")]
            hasher: Sha256::new(),
        }
    }

    fn finish(self) -> (u64, Option<[u8; 32]>) {
        #[cfg(feature = "file-io")]
        let digest = Some(self.hasher.finalize().into());
        #[cfg(not(feature = "file-io"))]
        let digest: Option<[u8; 32]> = None;
        (self.len, digest)
    }
}

impl<R: Read> Read for HashingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        #[cfg(feature = "file-io")]
        self.hasher.update(&buf[..n]);
        self.len += n as u64;
        Ok(n)
    }
}

/// Counts (and with `file-io`, hashes) everything written through it.
struct HashingWriter<W: Write> {
    inner: W,
    len: u64,
    #[cfg(feature = "file-io")]
    hasher: Sha256,
}

impl<W: Write> HashingWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            len: 0,
            #[cfg(feature = "file-io")]
            hasher: Sha256::new(),
        }
    }

    fn finish(self) -> (u64, Option<[u8; 32]>) {
        #[cfg(feature = "file-io")]
        let digest = Some(self.hasher.finalize().into());
        #[cfg(not(feature = "file-io"))]
        let digest: Option<[u8; 32]> = None;
        (self.len, digest)
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        #[cfg(feature = "file-io")]
        self.hasher.update(&buf[..n]);
        self.len += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
