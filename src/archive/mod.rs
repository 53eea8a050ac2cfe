//! Archive containers: reading, indexing and the bloom pre-check.
//!
//! An archive is scanned once, when its set first needs it. The resulting
//! [`ArchiveIndex`] answers every later lookup without touching the file;
//! only content reads reopen the archive.

mod bloom;
mod index;
mod source;

pub use bloom::{ArchiveBloom, TABLE_SIZE};
pub use index::{ArchiveIndex, EntryMeta};
pub use source::ArchiveSource;
