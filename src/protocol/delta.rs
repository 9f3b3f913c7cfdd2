// Delta stream encoding: tagged Match / Literal / Finished records.
//
// `DeltaWriter` is a `DeltaSink` that emits one record per callback, so the
// diff engine can write straight to the wire.  `DeltaReader` decodes a
// stream back into events; `read_delta` replays it into any sink.

use std::io::{Read, Write};

use log::{debug, trace};

use super::{
    TAG_FINISHED, TAG_LITERAL, TAG_MATCH, read_u8, read_wire_len, to_wire_len, write_i32,
    write_u8,
};
use crate::error::SyncError;
use crate::sink::{DeltaEvent, DeltaSink};

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Sink that serializes events to a byte stream.
///
/// `on_start` writes nothing; `on_finish` writes the Finished tag and
/// flushes the underlying writer.
pub struct DeltaWriter<W: Write> {
    out: W,
    records: u64,
}

impl<W: Write> DeltaWriter<W> {
    /// Wrap an output stream.
    pub fn new(out: W) -> Self {
        Self { out, records: 0 }
    }

    /// Records written so far, Finished included.
    pub fn records_written(&self) -> u64 {
        self.records
    }

    /// Return the output stream.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> DeltaSink for DeltaWriter<W> {
    fn on_match(&mut self, index: u32) -> Result<(), SyncError> {
        let index = to_wire_len("block index", index as usize)?;
        write_u8(&mut self.out, TAG_MATCH)?;
        write_i32(&mut self.out, index)?;
        self.records += 1;
        Ok(())
    }

    fn on_different(&mut self, data: &[u8]) -> Result<(), SyncError> {
        // Empty literals carry no information and are not valid on the wire.
        if data.is_empty() {
            return Ok(());
        }
        let len = to_wire_len("literal length", data.len())?;
        write_u8(&mut self.out, TAG_LITERAL)?;
        write_i32(&mut self.out, len)?;
        self.out.write_all(data)?;
        self.records += 1;
        Ok(())
    }

    fn on_finish(&mut self) -> Result<(), SyncError> {
        write_u8(&mut self.out, TAG_FINISHED)?;
        self.out.flush()?;
        self.records += 1;
        debug!("protocol: wrote delta stream of {} records", self.records);
        Ok(())
    }
}

/// Encode one event.
pub fn write_event<W: Write>(w: &mut W, event: &DeltaEvent) -> Result<(), SyncError> {
    event.dispatch(&mut DeltaWriter::new(w))
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Decode one record.
///
/// An unknown tag fails with [`SyncError::UnknownTag`] after consuming only
/// the tag byte.
pub fn read_event<R: Read>(r: &mut R) -> Result<DeltaEvent, SyncError> {
    match read_u8(r)? {
        TAG_MATCH => {
            let index = read_wire_len(r, "block index")?;
            Ok(DeltaEvent::Match(index))
        }
        TAG_LITERAL => {
            let len = read_wire_len(r, "literal length")?;
            if len == 0 {
                return Err(SyncError::InvalidLength {
                    field: "literal length",
                    value: 0,
                });
            }
            // Grow as bytes arrive rather than trusting the length up front.
            let mut data = Vec::new();
            r.by_ref().take(u64::from(len)).read_to_end(&mut data)?;
            if data.len() < len as usize {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!("literal truncated: {} of {len} bytes", data.len()),
                )
                .into());
            }
            Ok(DeltaEvent::Literal(data))
        }
        TAG_FINISHED => Ok(DeltaEvent::Finished),
        tag => Err(SyncError::UnknownTag(tag)),
    }
}

/// Iterator over the records of a delta stream.
///
/// Ends after yielding `Finished` or the first error.
pub struct DeltaReader<R: Read> {
    inner: R,
    done: bool,
}

impl<R: Read> DeltaReader<R> {
    /// Wrap an input stream positioned at the first record.
    pub fn new(inner: R) -> Self {
        Self { inner, done: false }
    }

    /// Return the input stream, positioned after the last record read.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Iterator for DeltaReader<R> {
    type Item = Result<DeltaEvent, SyncError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let event = read_event(&mut self.inner);
        if matches!(event, Ok(DeltaEvent::Finished) | Err(_)) {
            self.done = true;
        }
        Some(event)
    }
}

impl<R: Read> std::iter::FusedIterator for DeltaReader<R> {}

/// Replay a delta stream into `sink`.
///
/// Calls `on_start`, then one callback per record; `on_finish` is called when
/// the Finished tag is read.  Returns the number of records read.
pub fn read_delta<R: Read, S: DeltaSink>(r: &mut R, mut sink: S) -> Result<u64, SyncError> {
    sink.on_start()?;
    let mut records = 0u64;
    for event in DeltaReader::new(r) {
        let event = event?;
        trace!("protocol: read {event:?}");
        records += 1;
        event.dispatch(&mut sink)?;
    }
    debug!("protocol: read delta stream of {records} records");
    Ok(records)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
