//! # seqarc - Multi-Stream Part Archive for Genomic Read Compression
//!
//! `seqarc` is the container layer of a read compression pipeline. A single
//! file holds several independently sized logical channels ("streams"), such
//! as read sequences, quality strings and headers. Each stream is written as a
//! series of already-compressed chunks ("parts") and read back in a fixed
//! logical order.
//!
//! Parts can be appended in one call, or in two phases: a slot is reserved
//! first, fixing the part's logical position, and filled later. The two-phase
//! path lets many worker threads compress chunks in parallel and hand them to
//! the archive in whatever order they finish.
//!
//! ## Format Specification
//!
//! ```text
//! [payload]  parts in physical write order, each: varint(metadata) ++ bytes
//! [footer]   stream index (see below), written on close
//! [trailer]  16 bytes: footer offset (u64 LE), magic "SARC", version (u32 LE)
//! ```
//!
//! ### Footer
//! All integers are varints (7 bits per byte, least-significant group first).
//! - Stream count
//! - Per stream: id, name (length-prefixed UTF-8), raw size, packed size,
//!   packed data size, part count, then one `(offset, size)` pair per part
//!
//! Part offsets point at the metadata framing; sizes count payload bytes only.
//!
//! ## Basic Usage
//!
//! ```rust
//! use seqarc::Archive;
//!
//! # fn main() -> seqarc::Result<()> {
//! # let dir = tempfile::tempdir()?;
//! # let path = dir.path().join("sample.sarc");
//! // Write two streams
//! let archive = Archive::create(&path)?;
//! let seqs = archive.register_stream("sequences")?;
//! let quals = archive.register_stream("qualities")?;
//!
//! archive.add_part(seqs, b"\x1b\x2c", 8)?;
//! archive.add_part(quals, b"IIIIHHHH", 8)?;
//! archive.set_raw_size(seqs, 8)?;
//! archive.close()?;
//!
//! // Read them back by name
//! let archive = Archive::load(&path)?;
//! let seqs = archive.stream_id("sequences").unwrap();
//! assert_eq!(archive.raw_size(seqs), 8);
//!
//! let mut buf = Vec::new();
//! while let Some(metadata) = archive.get_part(seqs, &mut buf)? {
//!     println!("part of {} bytes, metadata {}", buf.len(), metadata);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Out-of-Order Producers
//!
//! ```rust
//! use seqarc::Archive;
//!
//! # fn main() -> seqarc::Result<()> {
//! # let dir = tempfile::tempdir()?;
//! # let path = dir.path().join("ordered.sarc");
//! let archive = Archive::create(&path)?;
//! let id = archive.register_stream("reads")?;
//!
//! // Reservation order is the read order
//! let first = archive.add_part_prepare(id)?;
//! let second = archive.add_part_prepare(id)?;
//!
//! // Completion order is free
//! std::thread::scope(|s| {
//!     s.spawn(|| archive.add_part_complete(id, second, b"second", 0));
//!     s.spawn(|| archive.add_part_complete(id, first, b"first", 0));
//! });
//! archive.close()?;
//!
//! let archive = Archive::load(&path)?;
//! let mut buf = Vec::new();
//! archive.get_part(id, &mut buf)?;
//! assert_eq!(buf, b"first");
//! archive.get_part(id, &mut buf)?;
//! assert_eq!(buf, b"second");
//! # Ok(())
//! # }
//! ```
//!
//! For bulk encoding across threads see [`ParallelWriter`] and
//! [`PartEncoder`].
//!
//! ## Error Handling
//!
//! All fallible operations return `Result<T, ArcError>`. Size accessors such
//! as [`Archive::stream_packed_size`] return 0 for an unknown stream instead of
//! failing.
//!
//! ```rust
//! use seqarc::{ArcError, Archive};
//!
//! # fn main() -> seqarc::Result<()> {
//! # let dir = tempfile::tempdir()?;
//! # let path = dir.path().join("empty.sarc");
//! let archive = Archive::create(&path)?;
//! assert_eq!(archive.stream_packed_size(3), 0);
//! assert!(matches!(
//!     archive.add_part(3, b"ACGT", 0),
//!     Err(ArcError::InvalidStream { id: 3, max: 0 })
//! ));
//! # Ok(())
//! # }
//! ```

mod archive;
mod constructs;
mod error;
mod io;
mod parallel;

pub use archive::{Archive, Mode};
pub use constructs::{StreamInfo, Trailer, MAGIC, TRAILER_SIZE, VERSION};
pub use error::{ArcError, IntoArcError, Result};
pub use io::{
    decode_bytes, decode_varint, encode_varint, read_varint, write_bytes, write_varint,
    DEFAULT_BUFFER_SIZE, MAX_VARINT_LEN,
};
pub use parallel::{ParallelWriter, PartEncoder};
