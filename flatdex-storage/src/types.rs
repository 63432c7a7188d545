use crate::constants::MAX_SLOTS;
use crate::file::MemFileSystem;
use flatdex_result::{Error, Result};

/// Absolute byte offset inside an index file.
pub type FileOffset = u64;

/// Where an index lives inside its file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IndexSlot {
    /// The file holds exactly this index.
    Dedicated,
    /// The file is shared; this index owns the given directory slot.
    Shared(u32),
}

impl IndexSlot {
    /// Validate a shared slot number against the directory size.
    pub fn shared(id: u32) -> Result<Self> {
        if (id as usize) < MAX_SLOTS {
            Ok(IndexSlot::Shared(id))
        } else {
            Err(Error::InvalidArgumentError(format!(
                "index slot {id} exceeds the {MAX_SLOTS}-slot directory"
            )))
        }
    }

    #[inline]
    pub fn shared_id(self) -> Option<usize> {
        match self {
            IndexSlot::Dedicated => None,
            IndexSlot::Shared(id) => Some(id as usize),
        }
    }
}

/// Access mode used to open an index file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpenMode {
    /// Read an existing index.
    Read,
    /// Create or truncate the file. A shared file gets a zeroed directory.
    Write,
    /// Append another index to an existing shared file.
    Insert,
}

/// Selects the [`IndexFile`](crate::IndexFile) implementation.
#[derive(Clone, Debug, Default)]
pub enum FileBackend {
    /// Buffered standard-library streams, offsets below 2 GiB.
    #[default]
    Buffered,
    /// Unbuffered descriptor I/O with 64-bit offsets.
    Huge,
    /// Files kept in a process-local map.
    Memory(MemFileSystem),
}
