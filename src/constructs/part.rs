/// A contiguous byte range of the payload region belonging to one stream.
///
/// `offset` is the absolute file position of the part's framing (its metadata
/// varint); `size` is the length of the payload that follows the framing.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub(crate) struct Part {
    pub offset: u64,
    pub size: u64,
}
impl Part {
    pub fn new(offset: u64, size: u64) -> Self {
        Self { offset, size }
    }
}

/// One logical position in a stream.
///
/// A slot is `Reserved` between `add_part_prepare` and `add_part_complete`.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub(crate) enum PartSlot {
    #[default]
    Reserved,
    Filled(Part),
}
impl PartSlot {
    pub fn part(&self) -> Option<Part> {
        match self {
            Self::Reserved => None,
            Self::Filled(part) => Some(*part),
        }
    }
    pub fn is_filled(&self) -> bool {
        matches!(self, Self::Filled(_))
    }
}
