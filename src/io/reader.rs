//! Random-access reader over a finished archive file.

use std::{
    fs::File,
    io::{BufReader, Read, Seek, SeekFrom},
    path::Path,
};

use super::{encoding::read_varint, footer::decode_footer};
use crate::{
    constructs::{Part, Stream, Trailer},
    ArcError, Result, TRAILER_SIZE,
};

/// Reader for the physical layout of an archive.
///
/// Construction validates the trailer; [`Reader::read_footer`] then decodes
/// the stream index and [`Reader::read_part`] fetches individual parts.
pub(crate) struct Reader<R: Read + Seek> {
    /// Inner reader providing the data source
    inner: R,

    /// Trailer read from the end of the file
    trailer: Trailer,

    /// Offset of the trailer, i.e. the end of the footer
    footer_end: u64,
}

impl<R: Read + Seek> Reader<R> {
    pub fn new(mut inner: R) -> Result<Self> {
        let len = inner.seek(SeekFrom::End(0))?;
        if len < TRAILER_SIZE as u64 {
            return Err(ArcError::Truncated { pos: len });
        }
        let footer_end = len - TRAILER_SIZE as u64;

        // load trailer
        let trailer = {
            let mut trailer_bytes = [0u8; TRAILER_SIZE];
            inner.seek(SeekFrom::Start(footer_end))?;
            inner.read_exact(&mut trailer_bytes)?;

            let trailer = Trailer::from_bytes(&trailer_bytes);
            trailer.validate()?;
            trailer
        };
        if trailer.footer_offset() > footer_end {
            return Err(ArcError::FooterOutOfRange {
                offset: trailer.footer_offset(),
                limit: footer_end,
            });
        }

        Ok(Self {
            inner,
            trailer,
            footer_end,
        })
    }

    pub fn footer_offset(&self) -> u64 {
        self.trailer.footer_offset()
    }

    /// Decodes the stream index and checks every part against the payload
    /// region.
    pub fn read_footer(&mut self) -> Result<Vec<Stream>> {
        let footer_offset = self.footer_offset();
        let mut footer = vec![0u8; (self.footer_end - footer_offset) as usize];
        self.inner.seek(SeekFrom::Start(footer_offset))?;
        self.inner.read_exact(&mut footer)?;

        let streams = decode_footer(&footer, footer_offset)?;
        for (id, stream) in streams.iter().enumerate() {
            for (idx, slot) in stream.parts.iter().enumerate() {
                let in_range = slot.part().is_some_and(|part| {
                    part.offset < footer_offset
                        && part
                            .offset
                            .checked_add(part.size)
                            .is_some_and(|end| end <= footer_offset)
                });
                if !in_range {
                    return Err(ArcError::PartOutOfRange {
                        stream: id,
                        part: idx,
                    });
                }
            }
        }
        Ok(streams)
    }

    /// Reads the part at `part` into `buf`, returning its metadata word.
    pub fn read_part(&mut self, part: Part, buf: &mut Vec<u8>) -> Result<u64> {
        self.inner.seek(SeekFrom::Start(part.offset))?;
        let (metadata, framing) = read_varint(&mut self.inner).map_err(|e| match e {
            ArcError::Truncated { pos } => ArcError::Truncated {
                pos: part.offset + pos,
            },
            other => other,
        })?;

        let payload_start = part.offset + framing as u64;
        if payload_start + part.size > self.footer_offset() {
            return Err(ArcError::Truncated {
                pos: self.footer_offset(),
            });
        }
        buf.clear();
        buf.resize(part.size as usize, 0);
        self.inner.read_exact(buf)?;
        Ok(metadata)
    }
}

impl Reader<BufReader<File>> {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let rdr = File::open(path).map(BufReader::new)?;
        Self::new(rdr)
    }
}
