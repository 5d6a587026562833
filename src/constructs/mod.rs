mod part;
mod stream;
mod trailer;

pub(crate) use part::{Part, PartSlot};
pub(crate) use stream::{Registry, Stream};
pub use stream::StreamInfo;
pub use trailer::{Trailer, MAGIC, TRAILER_SIZE, VERSION};
