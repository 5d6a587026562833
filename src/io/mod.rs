mod encoding;
mod footer;
mod reader;
mod writer;

pub use encoding::{
    decode_bytes, decode_varint, encode_varint, read_varint, write_bytes, write_varint, MAX_VARINT_LEN,
};
pub(crate) use reader::Reader;
pub use writer::DEFAULT_BUFFER_SIZE;
pub(crate) use writer::Writer;
