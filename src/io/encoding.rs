//! Integer and byte-string encodings used by the part framing and the footer.
//!
//! - Varint: 7 payload bits per byte, least-significant group first, high bit
//!   set on every byte but the last. At most [`MAX_VARINT_LEN`] bytes.
//! - Length-prefixed bytes: varint length followed by the raw bytes.
//!
//! Slice decoders return the decoded value and the number of bytes consumed.

use std::io::{Read, Write};

use crate::{ArcError, Result};

pub const MAX_VARINT_LEN: usize = 10;

/// Appends the varint encoding of `value` to `buf`, returning its length.
pub fn encode_varint(mut value: u64, buf: &mut Vec<u8>) -> usize {
    let start = buf.len();
    while value >= 0x80 {
        buf.push((value as u8) | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
    buf.len() - start
}

pub fn write_varint<W: Write>(writer: &mut W, value: u64) -> Result<usize> {
    let mut buf = [0u8; MAX_VARINT_LEN];
    let mut value = value;
    let mut len = 0;
    while value >= 0x80 {
        buf[len] = (value as u8) | 0x80;
        value >>= 7;
        len += 1;
    }
    buf[len] = value as u8;
    len += 1;
    writer.write_all(&buf[..len])?;
    Ok(len)
}

/// Folds one varint byte into `value`; returns `true` once the final byte
/// has been consumed.
#[inline]
fn fold_varint_byte(value: &mut u64, idx: usize, byte: u8) -> std::result::Result<bool, ()> {
    let payload = u64::from(byte & 0x7f);
    let shift = 7 * idx as u32;
    if idx == MAX_VARINT_LEN - 1 && payload > 1 {
        return Err(());
    }
    *value |= payload << shift;
    Ok(byte & 0x80 == 0)
}

pub fn decode_varint(data: &[u8]) -> Result<(u64, usize)> {
    let mut value = 0u64;
    for (idx, &byte) in data.iter().enumerate().take(MAX_VARINT_LEN) {
        match fold_varint_byte(&mut value, idx, byte) {
            Ok(true) => return Ok((value, idx + 1)),
            Ok(false) => {}
            Err(()) => return Err(ArcError::VarintOverflow { pos: idx as u64 }),
        }
    }
    if data.len() >= MAX_VARINT_LEN {
        Err(ArcError::VarintOverflow {
            pos: (MAX_VARINT_LEN - 1) as u64,
        })
    } else {
        Err(ArcError::Truncated {
            pos: data.len() as u64,
        })
    }
}

/// Reads a varint from a stream, returning the value and its encoded length.
pub fn read_varint<R: Read>(reader: &mut R) -> Result<(u64, usize)> {
    let mut value = 0u64;
    let mut byte = [0u8; 1];
    for idx in 0..MAX_VARINT_LEN {
        if let Err(e) = reader.read_exact(&mut byte) {
            return Err(match e.kind() {
                std::io::ErrorKind::UnexpectedEof => ArcError::Truncated { pos: idx as u64 },
                _ => e.into(),
            });
        }
        match fold_varint_byte(&mut value, idx, byte[0]) {
            Ok(true) => return Ok((value, idx + 1)),
            Ok(false) => {}
            Err(()) => return Err(ArcError::VarintOverflow { pos: idx as u64 }),
        }
    }
    Err(ArcError::VarintOverflow {
        pos: (MAX_VARINT_LEN - 1) as u64,
    })
}

pub fn write_bytes<W: Write>(writer: &mut W, bytes: &[u8]) -> Result<usize> {
    let len = write_varint(writer, bytes.len() as u64)?;
    writer.write_all(bytes)?;
    Ok(len + bytes.len())
}

pub fn decode_bytes(data: &[u8]) -> Result<(&[u8], usize)> {
    let (len, consumed) = decode_varint(data)?;
    let rest = &data[consumed..];
    if len > rest.len() as u64 {
        return Err(ArcError::Truncated {
            pos: data.len() as u64,
        });
    }
    let len = len as usize;
    Ok((&rest[..len], consumed + len))
}
