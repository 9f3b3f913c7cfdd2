// Delta events and the consumers that receive them.
//
// A diff session produces, in order:
//   on_start, then any mix of on_match / on_different, then on_finish.
// Any callback may fail; the failure aborts the session and is returned to
// the caller unchanged.  Nothing already delivered is rolled back.

use std::io::{Read, Seek, SeekFrom, Write};

use log::trace;

use crate::error::SyncError;

// ---------------------------------------------------------------------------
// DeltaEvent
// ---------------------------------------------------------------------------

/// One reconstruction instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeltaEvent {
    /// Copy baseline block `index` (bytes `index * block_size ..`).
    Match(u32),
    /// Append these bytes. Never empty.
    Literal(Vec<u8>),
    /// End of the delta stream.
    Finished,
}

impl DeltaEvent {
    /// Deliver this event to the matching sink callback.
    pub fn dispatch<S: DeltaSink + ?Sized>(&self, sink: &mut S) -> Result<(), SyncError> {
        match self {
            Self::Match(index) => sink.on_match(*index),
            Self::Literal(data) => sink.on_different(data),
            Self::Finished => sink.on_finish(),
        }
    }
}

// ---------------------------------------------------------------------------
// DeltaSink
// ---------------------------------------------------------------------------

/// Receiver of delta events.
pub trait DeltaSink {
    /// Called once before any other event.
    fn on_start(&mut self) -> Result<(), SyncError> {
        Ok(())
    }

    /// New content at this point equals baseline block `index`.
    fn on_match(&mut self, index: u32) -> Result<(), SyncError>;

    /// New content at this point is `data`, which has no baseline block.
    fn on_different(&mut self, data: &[u8]) -> Result<(), SyncError>;

    /// Called once after the last event.
    fn on_finish(&mut self) -> Result<(), SyncError> {
        Ok(())
    }
}

impl<S: DeltaSink + ?Sized> DeltaSink for &mut S {
    fn on_start(&mut self) -> Result<(), SyncError> {
        (**self).on_start()
    }

    fn on_match(&mut self, index: u32) -> Result<(), SyncError> {
        (**self).on_match(index)
    }

    fn on_different(&mut self, data: &[u8]) -> Result<(), SyncError> {
        (**self).on_different(data)
    }

    fn on_finish(&mut self) -> Result<(), SyncError> {
        (**self).on_finish()
    }
}

/// Collects events, `Finished` included.
impl DeltaSink for Vec<DeltaEvent> {
    fn on_match(&mut self, index: u32) -> Result<(), SyncError> {
        self.push(DeltaEvent::Match(index));
        Ok(())
    }

    fn on_different(&mut self, data: &[u8]) -> Result<(), SyncError> {
        self.push(DeltaEvent::Literal(data.to_vec()));
        Ok(())
    }

    fn on_finish(&mut self) -> Result<(), SyncError> {
        self.push(DeltaEvent::Finished);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Random-access baseline
// ---------------------------------------------------------------------------

/// Supplies whole baseline blocks by index.
pub trait BlockSource {
    /// Fill `buf` (exactly one block long) with block `index`, i.e. baseline
    /// bytes `index * buf.len() .. (index + 1) * buf.len()`.
    fn read_block(&mut self, index: u32, buf: &mut [u8]) -> Result<(), SyncError>;
}

/// In-memory baseline.
impl BlockSource for &[u8] {
    fn read_block(&mut self, index: u32, buf: &mut [u8]) -> Result<(), SyncError> {
        let block_size = buf.len();
        let start = (index as usize).checked_mul(block_size);
        let range = start.and_then(|s| Some(s..s.checked_add(block_size)?));
        match range.and_then(|r| self.get(r)) {
            Some(block) => {
                buf.copy_from_slice(block);
                Ok(())
            }
            None => Err(SyncError::BlockOutOfRange { index, block_size }),
        }
    }
}

/// Baseline behind any seekable reader (e.g. a `File`).
pub struct SeekSource<R> {
    inner: R,
}

impl<R: Read + Seek> SeekSource<R> {
    /// Wrap a seekable reader.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Return the wrapped reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read + Seek> BlockSource for SeekSource<R> {
    fn read_block(&mut self, index: u32, buf: &mut [u8]) -> Result<(), SyncError> {
        let block_size = buf.len();
        let offset = u64::from(index) * block_size as u64;
        self.inner.seek(SeekFrom::Start(offset))?;
        self.inner.read_exact(buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                SyncError::BlockOutOfRange { index, block_size }
            } else {
                SyncError::Io(e)
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Reconstructor
// ---------------------------------------------------------------------------

/// Rebuilds new content from a baseline and a delta event stream.
///
/// Matches copy one block from the baseline, literals are written through.
/// The output is flushed on `on_finish`.
pub struct Reconstructor<B, W> {
    basis: B,
    out: W,
    block: Vec<u8>,
    written: u64,
}

impl<B: BlockSource, W: Write> Reconstructor<B, W> {
    /// Create a reconstructor for a session with the given block size.
    pub fn new(basis: B, out: W, block_size: usize) -> Result<Self, SyncError> {
        crate::config::validate_block_size(block_size)?;
        Ok(Self {
            basis,
            out,
            block: vec![0u8; block_size],
            written: 0,
        })
    }

    /// Bytes written so far.
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Return the output writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<B: BlockSource, W: Write> DeltaSink for Reconstructor<B, W> {
    fn on_match(&mut self, index: u32) -> Result<(), SyncError> {
        trace!("reconstruct: copy block {index}");
        self.basis.read_block(index, &mut self.block)?;
        self.out.write_all(&self.block)?;
        self.written += self.block.len() as u64;
        Ok(())
    }

    fn on_different(&mut self, data: &[u8]) -> Result<(), SyncError> {
        trace!("reconstruct: {} literal bytes", data.len());
        self.out.write_all(data)?;
        self.written += data.len() as u64;
        Ok(())
    }

    fn on_finish(&mut self) -> Result<(), SyncError> {
        self.out.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
