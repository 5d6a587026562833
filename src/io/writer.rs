//! Append-only writer for the payload region, footer and trailer.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use tracing::trace;

use super::{encoding::write_varint, footer::encode_footer};
use crate::{
    constructs::{Part, Stream, Trailer},
    ArcError, Result,
};

/// Default capacity of the buffered file handle used by write sessions.
pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

/// Writer for the physical layout of an archive.
///
/// The writer owns the write cursor: the absolute offset of the next byte.
/// Bytes only ever go to the end of the data written so far.
pub(crate) struct Writer<W: Write> {
    /// Inner writer providing the data sink
    inner: W,

    /// Absolute offset of the next byte to be written
    cursor: u64,

    /// Set once a write fails; the cursor no longer matches the sink
    failed: bool,
}

impl<W: Write> Writer<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            cursor: 0,
            failed: false,
        }
    }

    #[cfg(test)]
    pub fn position(&self) -> u64 {
        self.cursor
    }

    /// Writes one framed part at the cursor.
    ///
    /// Returns the part's location and the number of bytes it occupies,
    /// framing included.
    pub fn write_part(&mut self, data: &[u8], metadata: u64) -> Result<(Part, u64)> {
        self.check_failed()?;
        let offset = self.cursor;
        let framing = match write_varint(&mut self.inner, metadata) {
            Ok(n) => n as u64,
            Err(e) => return Err(self.fail(e)),
        };
        if let Err(e) = self.inner.write_all(data) {
            return Err(self.fail(e.into()));
        }

        let size = data.len() as u64;
        self.cursor += framing + size;
        trace!(offset, size, metadata, "wrote part");
        Ok((Part::new(offset, size), framing + size))
    }

    /// Writes the footer and trailer, then flushes the sink.
    ///
    /// Returns the footer offset. Nothing is written if a slot is still
    /// reserved.
    pub fn finish(&mut self, streams: &mut Vec<Stream>) -> Result<u64> {
        self.check_failed()?;
        let footer = encode_footer(streams)?;
        let footer_offset = self.cursor;
        let written = self
            .inner
            .write_all(&footer)
            .and_then(|_| self.inner.write_all(Trailer::new(footer_offset).as_bytes()))
            .and_then(|_| self.inner.flush());
        if let Err(e) = written {
            return Err(self.fail(e.into()));
        }
        self.cursor += (footer.len() + crate::TRAILER_SIZE) as u64;
        Ok(footer_offset)
    }

    /// Returns `true` once a write has failed.
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    fn check_failed(&self) -> Result<()> {
        if self.failed {
            return Err(ArcError::WriterFailed);
        }
        Ok(())
    }

    fn fail(&mut self, err: ArcError) -> ArcError {
        self.failed = true;
        err
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl Writer<BufWriter<File>> {
    /// Creates (or truncates) the file at `path`.
    pub fn from_path<P: AsRef<Path>>(path: P, buffer_size: usize) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::with_capacity(buffer_size, file)))
    }
}
