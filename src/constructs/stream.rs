use std::collections::HashMap;

use super::{Part, PartSlot};
use crate::{ArcError, Result};

/// In-memory state of one stream.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct Stream {
    pub name: String,
    /// Logical (uncompressed) size, supplied by the caller
    pub raw_size: u64,
    /// Bytes occupied by all parts, framing included
    pub packed_size: u64,
    /// Bytes occupied by part payloads only
    pub packed_data_size: u64,
    /// Slots in logical order
    pub parts: Vec<PartSlot>,
    /// Index of the next part handed out by a read session
    pub read_cursor: usize,
}
impl Stream {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Accounts for a part written at `part.offset` spanning `framed` bytes.
    fn account(&mut self, part: Part, framed: u64) {
        self.packed_size += framed;
        self.packed_data_size += part.size;
    }

    pub fn push_filled(&mut self, part: Part, framed: u64) -> usize {
        self.parts.push(PartSlot::Filled(part));
        self.account(part, framed);
        self.parts.len() - 1
    }

    pub fn reserve(&mut self) -> usize {
        self.parts.push(PartSlot::Reserved);
        self.parts.len() - 1
    }

    /// Checks that `index` names an outstanding reservation.
    pub fn check_reserved(&self, id: usize, index: usize) -> Result<()> {
        match self.parts.get(index) {
            None => Err(ArcError::InvalidPart {
                stream: id,
                part: index,
                max: self.parts.len(),
            }),
            Some(PartSlot::Filled(_)) => Err(ArcError::PartAlreadyFilled {
                stream: id,
                part: index,
            }),
            Some(PartSlot::Reserved) => Ok(()),
        }
    }

    /// Fills a slot previously validated with [`Stream::check_reserved`].
    pub fn fill(&mut self, index: usize, part: Part, framed: u64) {
        self.parts[index] = PartSlot::Filled(part);
        self.account(part, framed);
    }

    pub fn is_reserved(&self, index: usize) -> bool {
        matches!(self.parts.get(index), Some(PartSlot::Reserved))
    }

    pub fn first_unfilled(&self) -> Option<usize> {
        self.parts.iter().position(|slot| !slot.is_filled())
    }

    /// Returns the part under the read cursor, if any remain.
    pub fn current_part(&self) -> Option<Part> {
        self.parts.get(self.read_cursor)?.part()
    }

    pub fn advance(&mut self) {
        self.read_cursor += 1;
    }

    /// Returns the part under the read cursor and advances past it.
    #[cfg(test)]
    pub fn next_part(&mut self) -> Option<Part> {
        let part = self.current_part()?;
        self.advance();
        Some(part)
    }

    pub fn info(&self, id: usize) -> StreamInfo {
        StreamInfo {
            id,
            name: self.name.clone(),
            raw_size: self.raw_size,
            packed_size: self.packed_size,
            packed_data_size: self.packed_data_size,
            num_parts: self.parts.len(),
        }
    }
}

/// Read-only snapshot of a stream's index entry.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StreamInfo {
    pub id: usize,
    pub name: String,
    pub raw_size: u64,
    pub packed_size: u64,
    pub packed_data_size: u64,
    pub num_parts: usize,
}

/// Append-only stream registry.
///
/// Ids are dense and equal to the registration order. The name map is only
/// consulted by name lookups; when a name is registered twice the first id
/// wins.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    streams: Vec<Stream>,
    by_name: HashMap<String, usize>,
}
impl Registry {
    pub fn from_streams(streams: Vec<Stream>) -> Self {
        let mut by_name = HashMap::with_capacity(streams.len());
        for (id, stream) in streams.iter().enumerate() {
            by_name.entry(stream.name.clone()).or_insert(id);
        }
        Self { streams, by_name }
    }

    pub fn register(&mut self, name: &str) -> usize {
        let id = self.streams.len();
        self.streams.push(Stream::new(name));
        self.by_name.entry(name.to_string()).or_insert(id);
        id
    }

    pub fn id_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn get(&self, id: usize) -> Option<&Stream> {
        self.streams.get(id)
    }

    pub fn get_mut(&mut self, id: usize) -> Result<&mut Stream> {
        let max = self.streams.len();
        self.streams
            .get_mut(id)
            .ok_or(ArcError::InvalidStream { id, max })
    }

    pub fn streams(&self) -> &[Stream] {
        &self.streams
    }

    /// Stream list for footer encoding; the encoder never changes its length.
    pub fn streams_mut(&mut self) -> &mut Vec<Stream> {
        &mut self.streams
    }

    /// Locates the first reserved slot that was never completed.
    pub fn first_unfilled(&self) -> Option<(usize, usize)> {
        self.streams
            .iter()
            .enumerate()
            .find_map(|(id, stream)| stream.first_unfilled().map(|part| (id, part)))
    }
}
