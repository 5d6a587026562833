//! Error handling for the seqarc library.
//!
//! This module defines all error types that can occur while writing or reading
//! an archive: usage errors (bad stream ids, wrong session mode), I/O errors
//! from the backing file, and format errors found while decoding the footer.

use std::error::Error as StdError;
use thiserror::Error;

use crate::Mode;

/// A specialized `Result` type for archive operations.
///
/// It's equivalent to `std::result::Result<T, ArcError>`.
pub type Result<T> = std::result::Result<T, ArcError>;

/// Error types for archive operations.
///
/// # Examples
///
/// ```rust
/// use seqarc::{ArcError, Archive, Mode};
///
/// let archive = Archive::new(Mode::Write);
/// let id = archive.register_stream("reads").unwrap();
///
/// // Parts can only be added once the archive is bound to a file
/// match archive.add_part(id, b"ACGT", 0) {
///     Err(ArcError::NotOpen) => {}
///     other => panic!("unexpected: {:?}", other),
/// }
/// ```
#[derive(Error, Debug)]
pub enum ArcError {
    /// I/O error from the backing file.
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    /// The stream id does not refer to a registered stream.
    #[error("Invalid stream id ({id}) - Must be less than {max}")]
    InvalidStream { id: usize, max: usize },

    /// The part index does not refer to a reserved slot of the stream.
    #[error("Invalid part index ({part}) for stream {stream} - Must be less than {max}")]
    InvalidPart {
        stream: usize,
        part: usize,
        max: usize,
    },

    /// The reserved slot has already received its data.
    #[error("Part {part} of stream {stream} has already been completed")]
    PartAlreadyFilled { stream: usize, part: usize },

    /// A reserved slot was never completed before the footer was written.
    #[error("Part {part} of stream {stream} was reserved but never completed")]
    UnfilledPart { stream: usize, part: usize },

    /// The operation is not valid in the archive's mode.
    #[error("Operation requires {expected:?} mode, archive is in {actual:?} mode")]
    WrongMode { expected: Mode, actual: Mode },

    /// The archive has not been bound to a file yet.
    #[error("Archive is not open")]
    NotOpen,

    /// The archive is already bound to a file.
    #[error("Archive is already open")]
    AlreadyOpen,

    /// The archive has been closed.
    #[error("Archive has been closed")]
    Closed,

    /// An earlier write failed, so the payload region can no longer be
    /// trusted; the archive can only be closed.
    #[error("A previous write to the archive failed")]
    WriterFailed,

    /// Ran out of bytes while decoding.
    #[error("Truncated data at position {pos}")]
    Truncated { pos: u64 },

    /// A variable-length integer does not fit in 64 bits.
    #[error("Variable-length integer overflows 64 bits at position {pos}")]
    VarintOverflow { pos: u64 },

    /// A stream name is not valid UTF-8.
    #[error("Stream name at position {pos} is not valid UTF-8")]
    InvalidStreamName { pos: u64 },

    /// Invalid magic number in the file trailer.
    #[error("Invalid magic number, expected ({expected:#x}), found ({actual:#x})")]
    InvalidMagicNumber { expected: u32, actual: u32 },

    /// Unsupported file format version.
    #[error("Invalid version found, expected ({expected}), found ({actual})")]
    InvalidVersion { expected: u32, actual: u32 },

    /// The footer pointer lies outside the file.
    #[error("Footer offset ({offset}) out of range - payload ends at {limit}")]
    FooterOutOfRange { offset: u64, limit: u64 },

    /// A stream record carries an id that does not match its position.
    #[error("Stream id mismatch, expected ({expected}), found ({actual})")]
    StreamIdMismatch { expected: u64, actual: u64 },

    /// A part index entry points outside the payload region.
    #[error("Part {part} of stream {stream} lies outside the payload region")]
    PartOutOfRange { stream: usize, part: usize },

    /// Bytes remain after the last stream record of the footer.
    #[error("Footer has {remaining} trailing bytes")]
    TrailingFooterBytes { remaining: usize },

    /// Error raised by a user-supplied part encoder.
    #[error("Processing error: {0}")]
    Process(Box<dyn StdError + Send + Sync>),

    /// A worker thread panicked during parallel part production.
    #[error("Worker thread panicked")]
    WorkerPanic,

    /// Parallel production of a stream failed. The listed slots were filled
    /// with empty parts so the archive can still be closed.
    #[error("Parallel write to stream {stream} failed, {} part(s) left empty: {source}", .parts.len())]
    PartsAbandoned {
        stream: usize,
        parts: Vec<usize>,
        source: Box<ArcError>,
    },
}

/// Trait for converting errors into `ArcError::Process` variants.
///
/// # Examples
///
/// ```rust
/// use seqarc::{ArcError, IntoArcError};
///
/// let io_err = std::io::Error::new(std::io::ErrorKind::Other, "codec failed");
/// match io_err.into_arc_error() {
///     ArcError::Process(_) => {}
///     _ => unreachable!(),
/// }
/// ```
pub trait IntoArcError {
    /// Converts the error into an `ArcError`.
    fn into_arc_error(self) -> ArcError;
}

impl<E> IntoArcError for E
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn into_arc_error(self) -> ArcError {
        ArcError::Process(self.into())
    }
}
