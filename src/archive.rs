//! The thread-safe archive container.

use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::{
    constructs::{Registry, StreamInfo},
    io::{Reader, Writer, DEFAULT_BUFFER_SIZE},
    ArcError, Result,
};

/// Session kind an [`Archive`] is created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Mode {
    /// Register streams and append parts; the index is written on close.
    Write,
    /// Decode the index on open and read parts back in logical order.
    Read,
}

enum Session {
    Unopened,
    Writing(Writer<BufWriter<File>>),
    Reading(Reader<BufReader<File>>),
    Closed,
}

/// State guarded by the archive lock.
struct Inner {
    session: Session,
    registry: Registry,
}
impl Inner {
    fn writer(&mut self) -> Result<(&mut Writer<BufWriter<File>>, &mut Registry)> {
        match &mut self.session {
            Session::Writing(writer) => Ok((writer, &mut self.registry)),
            Session::Unopened => Err(ArcError::NotOpen),
            Session::Closed => Err(ArcError::Closed),
            Session::Reading(_) => Err(ArcError::WrongMode {
                expected: Mode::Write,
                actual: Mode::Read,
            }),
        }
    }

    fn reader(&mut self) -> Result<(&mut Reader<BufReader<File>>, &mut Registry)> {
        match &mut self.session {
            Session::Reading(reader) => Ok((reader, &mut self.registry)),
            Session::Unopened => Err(ArcError::NotOpen),
            Session::Closed => Err(ArcError::Closed),
            Session::Writing(_) => Err(ArcError::WrongMode {
                expected: Mode::Read,
                actual: Mode::Write,
            }),
        }
    }
}

/// A single file holding several independently written streams of parts.
///
/// An archive is created for one [`Mode`] and bound to one file by
/// [`Archive::open`]. All methods take `&self`: the stream registry, the
/// write cursor and the file handle sit behind one lock, so an archive can be
/// shared between worker threads.
///
/// # Examples
///
/// ```rust
/// use seqarc::{Archive, Mode};
///
/// # fn main() -> seqarc::Result<()> {
/// # let dir = tempfile::tempdir()?;
/// # let path = dir.path().join("reads.sarc");
/// let archive = Archive::new(Mode::Write);
/// let reads = archive.register_stream("reads")?;
/// archive.open(&path)?;
/// archive.add_part(reads, b"ACGT", 4)?;
/// archive.close()?;
///
/// let archive = Archive::load(&path)?;
/// let reads = archive.stream_id("reads").unwrap();
/// let mut buf = Vec::new();
/// assert_eq!(archive.get_part(reads, &mut buf)?, Some(4));
/// assert_eq!(buf, b"ACGT");
/// assert_eq!(archive.get_part(reads, &mut buf)?, None);
/// # Ok(())
/// # }
/// ```
pub struct Archive {
    mode: Mode,
    buffer_size: usize,
    inner: Mutex<Inner>,
}

impl Archive {
    /// Creates an unopened archive for the given mode.
    pub fn new(mode: Mode) -> Self {
        Self::with_buffer_size(mode, DEFAULT_BUFFER_SIZE)
    }

    /// Creates an unopened archive whose file handle buffers `buffer_size`
    /// bytes.
    pub fn with_buffer_size(mode: Mode, buffer_size: usize) -> Self {
        Self {
            mode,
            buffer_size,
            inner: Mutex::new(Inner {
                session: Session::Unopened,
                registry: Registry::default(),
            }),
        }
    }

    /// Creates (or truncates) `path` and opens a write session on it.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let archive = Self::new(Mode::Write);
        archive.open(path)?;
        Ok(archive)
    }

    /// Opens a read session on `path`, decoding its index.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let archive = Self::new(Mode::Read);
        archive.open(path)?;
        Ok(archive)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Returns `true` between a successful [`Archive::open`] and
    /// [`Archive::close`].
    pub fn is_open(&self) -> bool {
        matches!(
            self.inner.lock().session,
            Session::Writing(_) | Session::Reading(_)
        )
    }

    fn check_mode(&self, expected: Mode) -> Result<()> {
        if self.mode != expected {
            return Err(ArcError::WrongMode {
                expected,
                actual: self.mode,
            });
        }
        Ok(())
    }

    /// Binds the archive to `path`.
    ///
    /// In write mode the file is created or truncated. In read mode the
    /// trailer and footer are decoded immediately; the stream registry is only
    /// replaced once the whole index has been validated. A failed open leaves
    /// the archive unopened.
    pub fn open<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut inner = self.inner.lock();
        match inner.session {
            Session::Unopened => {}
            Session::Closed => return Err(ArcError::Closed),
            Session::Writing(_) | Session::Reading(_) => return Err(ArcError::AlreadyOpen),
        }

        match self.mode {
            Mode::Write => {
                inner.session = Session::Writing(Writer::from_path(path, self.buffer_size)?);
            }
            Mode::Read => {
                let mut reader = Reader::from_path(path)?;
                let streams = reader.read_footer()?;
                inner.registry = Registry::from_streams(streams);
                inner.session = Session::Reading(reader);
            }
        }
        debug!(
            path = %path.display(),
            mode = ?self.mode,
            streams = inner.registry.len(),
            "opened archive"
        );
        Ok(())
    }

    /// Ends the session.
    ///
    /// In write mode this writes the footer and trailer after the last part.
    /// If a reserved slot was never completed, nothing is written and the
    /// archive stays open so the slot can still be completed. Once the footer
    /// has been attempted the archive is closed, even if writing it failed.
    ///
    /// Closing a closed archive is a no-op. If an earlier write failed, close
    /// gives up on the file and returns [`ArcError::WriterFailed`].
    pub fn close(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        let Inner { session, registry } = &mut *inner;
        match session {
            Session::Unopened => Err(ArcError::NotOpen),
            Session::Closed => Ok(()),
            Session::Reading(_) => {
                *session = Session::Closed;
                debug!("closed archive");
                Ok(())
            }
            Session::Writing(writer) => {
                // a failed writer cannot fill slots anymore, so close regardless
                if !writer.is_failed() {
                    if let Some((stream, part)) = registry.first_unfilled() {
                        return Err(ArcError::UnfilledPart { stream, part });
                    }
                }
                let finished = writer.finish(registry.streams_mut());
                *session = Session::Closed;
                let footer_offset = finished?;
                debug!(footer_offset, streams = registry.len(), "closed archive");
                Ok(())
            }
        }
    }

    /// Registers a new stream and returns its id.
    ///
    /// Ids are assigned densely in call order. Streams can be registered
    /// before or after [`Archive::open`], but not after [`Archive::close`].
    pub fn register_stream(&self, name: &str) -> Result<usize> {
        self.check_mode(Mode::Write)?;
        let mut inner = self.inner.lock();
        if let Session::Closed = inner.session {
            return Err(ArcError::Closed);
        }
        let id = inner.registry.register(name);
        debug!(stream = id, name, "registered stream");
        Ok(id)
    }

    /// Looks up a stream id by name.
    ///
    /// When a name was registered more than once, the first id is returned.
    pub fn stream_id(&self, name: &str) -> Option<usize> {
        self.inner.lock().registry.id_of(name)
    }

    pub fn num_streams(&self) -> usize {
        self.inner.lock().registry.len()
    }

    /// Bytes occupied by the stream's parts, framing included.
    ///
    /// Returns 0 for an unknown id.
    pub fn stream_packed_size(&self, stream_id: usize) -> u64 {
        self.inner
            .lock()
            .registry
            .get(stream_id)
            .map_or(0, |stream| stream.packed_size)
    }

    /// Bytes occupied by the stream's part payloads.
    ///
    /// Returns 0 for an unknown id.
    pub fn stream_packed_data_size(&self, stream_id: usize) -> u64 {
        self.inner
            .lock()
            .registry
            .get(stream_id)
            .map_or(0, |stream| stream.packed_data_size)
    }

    /// Logical size recorded for the stream, 0 for an unknown id.
    pub fn raw_size(&self, stream_id: usize) -> u64 {
        self.inner
            .lock()
            .registry
            .get(stream_id)
            .map_or(0, |stream| stream.raw_size)
    }

    /// Records the stream's logical size. The last value set before close is
    /// stored.
    pub fn set_raw_size(&self, stream_id: usize, raw_size: u64) -> Result<()> {
        self.check_mode(Mode::Write)?;
        let mut inner = self.inner.lock();
        if let Session::Closed = inner.session {
            return Err(ArcError::Closed);
        }
        inner.registry.get_mut(stream_id)?.raw_size = raw_size;
        Ok(())
    }

    /// Number of part slots of the stream, 0 for an unknown id.
    pub fn num_parts(&self, stream_id: usize) -> usize {
        self.inner
            .lock()
            .registry
            .get(stream_id)
            .map_or(0, |stream| stream.parts.len())
    }

    /// Snapshot of every stream's index entry, in id order.
    pub fn streams(&self) -> Vec<StreamInfo> {
        self.inner
            .lock()
            .registry
            .streams()
            .iter()
            .enumerate()
            .map(|(id, stream)| stream.info(id))
            .collect()
    }

    /// Appends a part to the stream.
    ///
    /// The bytes are written at the current write cursor and the part takes
    /// the next logical position of the stream, as one atomic step.
    pub fn add_part(&self, stream_id: usize, data: &[u8], metadata: u64) -> Result<()> {
        self.check_mode(Mode::Write)?;
        let mut inner = self.inner.lock();
        let (writer, registry) = inner.writer()?;
        let stream = registry.get_mut(stream_id)?;

        let (part, framed) = writer.write_part(data, metadata)?;
        let index = stream.push_filled(part, framed);
        trace!(stream = stream_id, part = index, "added part");
        Ok(())
    }

    /// Reserves the next logical position of the stream and returns its index.
    ///
    /// Parts are read back in reservation order, whatever order the matching
    /// [`Archive::add_part_complete`] calls happen in.
    pub fn add_part_prepare(&self, stream_id: usize) -> Result<usize> {
        self.check_mode(Mode::Write)?;
        let mut inner = self.inner.lock();
        let (_, registry) = inner.writer()?;
        let index = registry.get_mut(stream_id)?.reserve();
        trace!(stream = stream_id, part = index, "reserved part");
        Ok(index)
    }

    /// Writes the data of a slot reserved by [`Archive::add_part_prepare`].
    ///
    /// The bytes land at the write cursor as it stands when this call runs;
    /// the slot keeps its logical position.
    pub fn add_part_complete(
        &self,
        stream_id: usize,
        part_index: usize,
        data: &[u8],
        metadata: u64,
    ) -> Result<()> {
        self.check_mode(Mode::Write)?;
        let mut inner = self.inner.lock();
        let (writer, registry) = inner.writer()?;
        let stream = registry.get_mut(stream_id)?;
        stream.check_reserved(stream_id, part_index)?;

        let (part, framed) = writer.write_part(data, metadata)?;
        stream.fill(part_index, part, framed);
        trace!(stream = stream_id, part = part_index, "completed part");
        Ok(())
    }

    /// Fills a reserved slot with an empty part (metadata 0) so the archive
    /// can be closed without its data.
    ///
    /// Readers see the slot as a zero-length part.
    pub fn abandon_part(&self, stream_id: usize, part_index: usize) -> Result<()> {
        self.add_part_complete(stream_id, part_index, &[], 0)?;
        debug!(stream = stream_id, part = part_index, "abandoned part");
        Ok(())
    }

    /// Abandons every slot of `part_indices` that is still reserved, under a
    /// single lock. Returns the abandoned indices.
    pub(crate) fn abandon_reserved(
        &self,
        stream_id: usize,
        part_indices: &[usize],
    ) -> Result<Vec<usize>> {
        self.check_mode(Mode::Write)?;
        let mut inner = self.inner.lock();
        let (writer, registry) = inner.writer()?;
        let stream = registry.get_mut(stream_id)?;

        let mut abandoned = Vec::new();
        for &index in part_indices {
            if !stream.is_reserved(index) {
                continue;
            }
            let (part, framed) = writer.write_part(&[], 0)?;
            stream.fill(index, part, framed);
            abandoned.push(index);
        }
        if !abandoned.is_empty() {
            debug!(
                stream = stream_id,
                parts = abandoned.len(),
                "abandoned reserved parts"
            );
        }
        Ok(abandoned)
    }

    /// Reads the next part of the stream into `buf`.
    ///
    /// Returns the part's metadata word, or `None` once every part of the
    /// stream has been read. Parts are handed out once, in logical order.
    pub fn get_part(&self, stream_id: usize, buf: &mut Vec<u8>) -> Result<Option<u64>> {
        self.check_mode(Mode::Read)?;
        let mut inner = self.inner.lock();
        let (reader, registry) = inner.reader()?;
        let stream = registry.get_mut(stream_id)?;

        let Some(part) = stream.current_part() else {
            return Ok(None);
        };
        let metadata = reader.read_part(part, buf)?;
        stream.advance();
        Ok(Some(metadata))
    }
}

/// Closes an open archive when dropped.
///
/// Slots still reserved at that point are abandoned so the completed parts
/// stay readable. Errors during the automatic close are logged, so explicit
/// calls to [`Archive::close`] are recommended for proper error handling.
impl Drop for Archive {
    fn drop(&mut self) {
        if !self.is_open() {
            return;
        }
        loop {
            match self.close() {
                Ok(()) => break,
                Err(ArcError::UnfilledPart { stream, part }) => {
                    warn!(stream, part, "abandoning unfilled part on drop");
                    if let Err(e) = self.abandon_part(stream, part) {
                        warn!(error = %e, "failed to close archive on drop");
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "failed to close archive on drop");
                    break;
                }
            }
        }
    }
}
