//! Footer index: the stream registry and every part's location.
//!
//! The layout is described once, by [`visit_footer`], and walked by either an
//! [`Encoder`] or a [`Decoder`]. Both directions therefore share one field
//! order.

use super::encoding::{decode_bytes, decode_varint, encode_varint, write_bytes};
use crate::{
    constructs::{Part, PartSlot, Stream},
    ArcError, Result,
};

/// A direction over the footer schema.
trait Visitor {
    const DECODING: bool;

    fn varint(&mut self, value: &mut u64) -> Result<()>;

    fn name(&mut self, value: &mut String) -> Result<()>;

    /// Writes `len` as a count, or reads a count and returns it.
    fn count(&mut self, len: usize) -> Result<usize>;
}

fn visit_footer<V: Visitor>(v: &mut V, streams: &mut Vec<Stream>) -> Result<()> {
    let num_streams = v.count(streams.len())?;
    streams.resize_with(num_streams, Stream::default);
    for (id, stream) in streams.iter_mut().enumerate() {
        visit_stream(v, id, stream)?;
    }
    Ok(())
}

fn visit_stream<V: Visitor>(v: &mut V, id: usize, stream: &mut Stream) -> Result<()> {
    let mut stored_id = id as u64;
    v.varint(&mut stored_id)?;
    if stored_id != id as u64 {
        return Err(ArcError::StreamIdMismatch {
            expected: id as u64,
            actual: stored_id,
        });
    }
    v.name(&mut stream.name)?;
    v.varint(&mut stream.raw_size)?;
    v.varint(&mut stream.packed_size)?;
    v.varint(&mut stream.packed_data_size)?;

    let num_parts = v.count(stream.parts.len())?;
    stream.parts.resize(num_parts, PartSlot::Reserved);
    for (idx, slot) in stream.parts.iter_mut().enumerate() {
        let mut part = match slot.part() {
            Some(part) => part,
            None if V::DECODING => Part::default(),
            None => {
                return Err(ArcError::UnfilledPart {
                    stream: id,
                    part: idx,
                })
            }
        };
        v.varint(&mut part.offset)?;
        v.varint(&mut part.size)?;
        *slot = PartSlot::Filled(part);
    }
    Ok(())
}

/// Serializes the footer into an in-memory buffer.
struct Encoder {
    buf: Vec<u8>,
}
impl Visitor for Encoder {
    const DECODING: bool = false;

    fn varint(&mut self, value: &mut u64) -> Result<()> {
        encode_varint(*value, &mut self.buf);
        Ok(())
    }

    fn name(&mut self, value: &mut String) -> Result<()> {
        write_bytes(&mut self.buf, value.as_bytes())?;
        Ok(())
    }

    fn count(&mut self, len: usize) -> Result<usize> {
        encode_varint(len as u64, &mut self.buf);
        Ok(len)
    }
}

/// Deserializes the footer from its raw bytes.
struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
    /// File offset of `data[0]`, used in error positions
    base: u64,
}
impl<'a> Decoder<'a> {
    fn rebase(&self, err: ArcError) -> ArcError {
        let at = |pos: u64| self.base + self.pos as u64 + pos;
        match err {
            ArcError::Truncated { pos } => ArcError::Truncated { pos: at(pos) },
            ArcError::VarintOverflow { pos } => ArcError::VarintOverflow { pos: at(pos) },
            other => other,
        }
    }

    fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }
}
impl Visitor for Decoder<'_> {
    const DECODING: bool = true;

    fn varint(&mut self, value: &mut u64) -> Result<()> {
        let (decoded, consumed) = decode_varint(self.remaining()).map_err(|e| self.rebase(e))?;
        *value = decoded;
        self.pos += consumed;
        Ok(())
    }

    fn name(&mut self, value: &mut String) -> Result<()> {
        let (bytes, consumed) = decode_bytes(self.remaining()).map_err(|e| self.rebase(e))?;
        *value = String::from_utf8(bytes.to_vec()).map_err(|_| ArcError::InvalidStreamName {
            pos: self.base + self.pos as u64,
        })?;
        self.pos += consumed;
        Ok(())
    }

    fn count(&mut self, _len: usize) -> Result<usize> {
        let start = self.pos;
        let mut count = 0;
        self.varint(&mut count)?;
        // every counted entry occupies at least one byte
        if count > self.remaining().len() as u64 {
            return Err(ArcError::Truncated {
                pos: self.base + start as u64,
            });
        }
        Ok(count as usize)
    }
}

/// Encodes the footer for `streams`.
///
/// Fails with [`ArcError::UnfilledPart`] if any slot is still reserved.
pub fn encode_footer(streams: &mut Vec<Stream>) -> Result<Vec<u8>> {
    let mut encoder = Encoder { buf: Vec::new() };
    visit_footer(&mut encoder, streams)?;
    Ok(encoder.buf)
}

/// Decodes a footer that starts at file offset `base`.
///
/// The footer must span `data` exactly.
pub fn decode_footer(data: &[u8], base: u64) -> Result<Vec<Stream>> {
    let mut decoder = Decoder { data, pos: 0, base };
    let mut streams = Vec::new();
    visit_footer(&mut decoder, &mut streams)?;
    let remaining = decoder.remaining().len();
    if remaining > 0 {
        return Err(ArcError::TrailingFooterBytes { remaining });
    }
    Ok(streams)
}
