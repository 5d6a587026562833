use bytemuck::{Pod, Zeroable};

use crate::ArcError;

pub const MAGIC: u32 = 0x43524153; // "SARC"
pub const VERSION: u32 = 1;
pub const TRAILER_SIZE: usize = std::mem::size_of::<Trailer>();

/// 16-byte trailer closing every archive file.
///
/// Fields are stored little-endian regardless of the host byte order; use the
/// accessors rather than reading the fields directly.
#[derive(Copy, Clone, Pod, Zeroable, Debug, PartialEq, Eq, Hash)]
#[repr(C)]
pub struct Trailer {
    footer_offset: u64, // start of the footer index
    magic: u32,         // "SARC" - file type validation
    version: u32,       // Format version (1)
}
impl Trailer {
    pub fn new(footer_offset: u64) -> Self {
        Self {
            footer_offset: footer_offset.to_le(),
            magic: MAGIC.to_le(),
            version: VERSION.to_le(),
        }
    }
    pub fn footer_offset(&self) -> u64 {
        u64::from_le(self.footer_offset)
    }
    pub fn magic(&self) -> u32 {
        u32::from_le(self.magic)
    }
    pub fn version(&self) -> u32 {
        u32::from_le(self.version)
    }
    pub fn validate(&self) -> crate::Result<()> {
        if self.magic() != MAGIC {
            return Err(ArcError::InvalidMagicNumber {
                expected: MAGIC,
                actual: self.magic(),
            });
        }
        if self.version() != VERSION {
            return Err(ArcError::InvalidVersion {
                expected: VERSION,
                actual: self.version(),
            });
        }
        Ok(())
    }
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
    pub fn from_bytes(bytes: &[u8; TRAILER_SIZE]) -> Self {
        bytemuck::pod_read_unaligned(bytes)
    }
}
