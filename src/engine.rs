// Diff engine: scans new content against a baseline catalog.
//
// The scan keeps a window of `block_size` bytes over the new content and its
// weak checksum.  Two states:
//   - SEARCHING: probe the catalog for the window.  On a miss, the window's
//     first byte joins the pending literal run and the window slides by one
//     byte using the O(1) rolling update.
//   - MATCHING: after a hit, the pending literal (if any) is flushed, a Match
//     is emitted and the whole matched block is skipped at once; the next
//     `block_size` bytes become the new window with a freshly computed
//     checksum.
// At end of input every unmatched byte (pending run plus any partial
// trailing window) is flushed as one literal, then Finished is emitted.
//
// `DeltaEvents` is the lazy form: an iterator that reads from the source
// only as far as needed to produce the next event.  `diff()` drives it into
// a `DeltaSink`.

use std::io::{self, Read};
use std::iter::FusedIterator;

use log::{debug, trace};

use crate::catalog::BlockCatalog;
use crate::config::SyncOptions;
use crate::error::SyncError;
use crate::hash::rolling;
use crate::sink::{DeltaEvent, DeltaSink};

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Counters for one diff session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStats {
    /// Bytes read from the new content.
    pub bytes_read: u64,
    /// Match events emitted.
    pub matched_blocks: u64,
    /// Literal events emitted.
    pub literal_runs: u64,
    /// Bytes carried by literal events.
    pub literal_bytes: u64,
}

// ---------------------------------------------------------------------------
// DeltaEvents
// ---------------------------------------------------------------------------

/// Lazy, finite, non-restartable sequence of delta events.
///
/// Yields `Ok` events ending with exactly one `DeltaEvent::Finished`.  If
/// reading the source fails, the error is yielded once and the iterator is
/// exhausted afterwards.
pub struct DeltaEvents<'c, R> {
    catalog: &'c BlockCatalog,
    reader: R,
    block_size: usize,
    read_size: usize,
    /// Unconsumed input.  `lit_start..pos` is the pending literal run,
    /// `pos..pos + block_size` the current window.
    buf: Vec<u8>,
    lit_start: usize,
    pos: usize,
    /// Weak checksum of the current window; `None` after a skip-ahead.
    weak: Option<u64>,
    eof: bool,
    queued: Option<DeltaEvent>,
    done: bool,
    stats: DiffStats,
}

impl<'c, R: Read> DeltaEvents<'c, R> {
    /// Start a diff of `reader` against `catalog` with the given block size.
    pub fn new(catalog: &'c BlockCatalog, reader: R, block_size: usize) -> Result<Self, SyncError> {
        Self::with_options(catalog, reader, &SyncOptions::with_block_size(block_size))
    }

    /// Start a diff with explicit options.
    pub fn with_options(
        catalog: &'c BlockCatalog,
        reader: R,
        opts: &SyncOptions,
    ) -> Result<Self, SyncError> {
        opts.validate()?;
        let block_size = opts.block_size;
        Ok(Self {
            catalog,
            reader,
            block_size,
            read_size: opts.read_buffer_size.max(block_size).max(1),
            buf: Vec::new(),
            lit_start: 0,
            pos: 0,
            weak: None,
            eof: false,
            queued: None,
            done: false,
            stats: DiffStats::default(),
        })
    }

    /// Counters so far; final once the iterator is exhausted.
    pub fn stats(&self) -> DiffStats {
        self.stats
    }

    /// Produce the next non-queued event.
    fn step(&mut self) -> Result<DeltaEvent, SyncError> {
        let bs = self.block_size;
        loop {
            if !self.fill(bs)? {
                return Ok(self.finish());
            }

            let weak = match self.weak {
                Some(w) => w,
                None => {
                    let w = rolling::checksum(&self.buf[self.pos..self.pos + bs]);
                    self.weak = Some(w);
                    w
                }
            };

            let window = &self.buf[self.pos..self.pos + bs];
            if let Some(index) = self.catalog.find_match(weak, window) {
                trace!("diff: block {index} matches at input offset {}", self.input_offset());
                let literal = self.take_literal(self.pos);
                self.pos += bs;
                self.lit_start = self.pos;
                self.weak = None;
                self.stats.matched_blocks += 1;
                return Ok(match literal {
                    Some(data) => {
                        self.queued = Some(DeltaEvent::Match(index));
                        DeltaEvent::Literal(data)
                    }
                    None => DeltaEvent::Match(index),
                });
            }

            // Miss: slide by one byte if there is one more byte to take in.
            if !self.fill(bs + 1)? {
                return Ok(self.finish());
            }
            let outgoing = self.buf[self.pos];
            let incoming = self.buf[self.pos + bs];
            self.weak = Some(rolling::update(weak, outgoing, incoming, bs));
            self.pos += 1;
        }
    }

    /// Input is exhausted: flush whatever was not matched, then finish.
    fn finish(&mut self) -> DeltaEvent {
        self.done = true;
        let end = self.buf.len();
        let literal = self.take_literal(end);
        self.pos = end;
        self.lit_start = end;
        debug!(
            "diff: {} bytes in, {} matched blocks, {} literal bytes in {} runs",
            self.stats.bytes_read,
            self.stats.matched_blocks,
            self.stats.literal_bytes,
            self.stats.literal_runs
        );
        match literal {
            Some(data) => {
                self.queued = Some(DeltaEvent::Finished);
                DeltaEvent::Literal(data)
            }
            None => DeltaEvent::Finished,
        }
    }

    /// Remove `lit_start..end` as a literal run, or `None` if it is empty.
    fn take_literal(&mut self, end: usize) -> Option<Vec<u8>> {
        if end <= self.lit_start {
            return None;
        }
        let data = self.buf[self.lit_start..end].to_vec();
        self.stats.literal_runs += 1;
        self.stats.literal_bytes += data.len() as u64;
        trace!("diff: literal run of {} bytes", data.len());
        Some(data)
    }

    /// Absolute offset of the window start in the new content.
    fn input_offset(&self) -> u64 {
        self.stats.bytes_read - (self.buf.len() - self.pos) as u64
    }

    /// Make sure `ahead` bytes are buffered from the window start.
    ///
    /// Returns `false` if the source ended first.
    fn fill(&mut self, ahead: usize) -> io::Result<bool> {
        while self.buf.len() < self.pos + ahead {
            if self.eof {
                return Ok(false);
            }
            self.compact();
            let old = self.buf.len();
            self.buf.resize(old + self.read_size, 0);
            loop {
                match self.reader.read(&mut self.buf[old..]) {
                    Ok(0) => {
                        self.eof = true;
                        self.buf.truncate(old);
                    }
                    Ok(n) => {
                        self.buf.truncate(old + n);
                        self.stats.bytes_read += n as u64;
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        self.buf.truncate(old);
                        return Err(e);
                    }
                }
                break;
            }
        }
        Ok(true)
    }

    /// Drop bytes that precede the pending literal run.
    fn compact(&mut self) {
        if self.lit_start > 0 {
            self.buf.drain(..self.lit_start);
            self.pos -= self.lit_start;
            self.lit_start = 0;
        }
    }
}

impl<R: Read> Iterator for DeltaEvents<'_, R> {
    type Item = Result<DeltaEvent, SyncError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(event) = self.queued.take() {
            return Some(Ok(event));
        }
        if self.done {
            return None;
        }
        match self.step() {
            Ok(event) => Some(Ok(event)),
            Err(e) => {
                self.done = true;
                self.queued = None;
                Some(Err(e))
            }
        }
    }
}

impl<R: Read> FusedIterator for DeltaEvents<'_, R> {}

// ---------------------------------------------------------------------------
// Sink-driven entry points
// ---------------------------------------------------------------------------

/// Diff `reader` against `catalog`, delivering events to `sink`.
///
/// Calls `on_start`, then one callback per event, ending with `on_finish`.
/// The first failing callback or source read aborts the diff and its error
/// is returned.
pub fn diff<R, S>(
    catalog: &BlockCatalog,
    block_size: usize,
    reader: R,
    sink: S,
) -> Result<DiffStats, SyncError>
where
    R: Read,
    S: DeltaSink,
{
    diff_with_options(catalog, reader, sink, &SyncOptions::with_block_size(block_size))
}

/// [`diff`] with explicit options.
pub fn diff_with_options<R, S>(
    catalog: &BlockCatalog,
    reader: R,
    mut sink: S,
    opts: &SyncOptions,
) -> Result<DiffStats, SyncError>
where
    R: Read,
    S: DeltaSink,
{
    let mut events = DeltaEvents::with_options(catalog, reader, opts)?;
    sink.on_start()?;
    for event in &mut events {
        event?.dispatch(&mut sink)?;
    }
    Ok(events.stats())
}

/// Collect the full event list for an in-memory diff.
pub fn diff_events(
    catalog: &BlockCatalog,
    block_size: usize,
    new: &[u8],
) -> Result<Vec<DeltaEvent>, SyncError> {
    DeltaEvents::new(catalog, new, block_size)?.collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
