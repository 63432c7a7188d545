//! Persistence backends for flatdex index files.
//!
//! An index is serialized as a flat sequence of little-endian integer and
//! key-value sections. Where those bytes live is decided here:
//!
//! - [`file::BufferedIndexFile`]: buffered I/O, offsets below 2 GiB.
//! - [`file::HugeIndexFile`]: unbuffered descriptor I/O with 64-bit offsets.
//! - [`file::MappedIndexFile`]: read-only access through a memory map.
//! - [`file::MemIndexFile`]: an in-memory file system for tests and ephemeral use.
//! - [`file::InstrumentedIndexFile`]: a counting wrapper around any of the above.
//!
//! All of them implement [`file::IndexFile`], so the index layer never knows
//! which one it is talking to. Files may be dedicated to one index or shared
//! by up to [`constants::MAX_SLOTS`] indexes through a [`directory::SlotDirectory`].

pub mod codec;
pub mod constants;
pub mod directory;
pub mod file;
pub mod types;

pub use file::{IndexFile, open_index_file};
pub use types::{FileBackend, FileOffset, IndexSlot, OpenMode};
