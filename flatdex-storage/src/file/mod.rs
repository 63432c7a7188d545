//! The index-file contract plus its implementations.
//!
//! - I/O is **sequential**: the index layer writes and reads sections in one
//!   fixed order, seeking only to reach a shared slot's payload.
//! - Opening a shared file positions the stream at the slot's payload
//!   (read) or after the directory / at end of file (write / insert).
//! - Closing a shared file that was written patches only that slot's
//!   directory entry.

use crate::constants::BUFFERED_OFFSET_LIMIT;
use crate::directory::{encode_entry, entry_position};
use crate::types::{FileBackend, FileOffset, IndexSlot, OpenMode};
use flatdex_result::{Error, Result};
use std::fs::OpenOptions;
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;

pub mod buffered;
pub use buffered::*;

pub mod huge;
pub use huge::*;

pub mod instrumented;
pub use instrumented::*;

pub mod mapped;
pub use mapped::*;

pub mod mem;
pub use mem::*;

pub trait IndexFile {
    /// Open `path` in `mode`, positioning the stream for `slot`.
    fn open(&mut self, path: &Path, slot: IndexSlot, mode: OpenMode) -> Result<()>;

    /// Move to an absolute offset.
    fn seek(&mut self, offset: FileOffset) -> Result<()>;

    /// Fill `buf` completely or fail.
    fn read(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Write all of `buf`, returning the number of bytes written.
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    /// Flush and close. A shared slot opened for writing gets its directory
    /// entry patched with the offset its payload started at.
    fn close(&mut self, path: &Path, slot: IndexSlot) -> Result<()>;

    fn is_open(&self) -> bool;

    /// Make any persisted index at `path`/`slot` unloadable: a dedicated
    /// file is removed, a shared slot's directory entry is zeroed.
    fn discard(&mut self, path: &Path, slot: IndexSlot) -> Result<()>;
}

impl<F: IndexFile + ?Sized> IndexFile for Box<F> {
    fn open(&mut self, path: &Path, slot: IndexSlot, mode: OpenMode) -> Result<()> {
        (**self).open(path, slot, mode)
    }
    fn seek(&mut self, offset: FileOffset) -> Result<()> {
        (**self).seek(offset)
    }
    fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        (**self).read(buf)
    }
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        (**self).write(buf)
    }
    fn close(&mut self, path: &Path, slot: IndexSlot) -> Result<()> {
        (**self).close(path, slot)
    }
    fn is_open(&self) -> bool {
        (**self).is_open()
    }
    fn discard(&mut self, path: &Path, slot: IndexSlot) -> Result<()> {
        (**self).discard(path, slot)
    }
}

/// Create an unopened file handle for `backend`.
pub fn open_index_file(backend: &FileBackend) -> Box<dyn IndexFile> {
    match backend {
        FileBackend::Buffered => Box::new(BufferedIndexFile::new()),
        FileBackend::Huge => Box::new(HugeIndexFile::new()),
        FileBackend::Memory(fs) => Box::new(MemIndexFile::new(fs.clone())),
    }
}

// ------------------------- helpers shared by disk backends -------------------------

/// Rewrite one directory entry of an on-disk shared file.
pub(crate) fn patch_disk_entry(path: &Path, slot: usize, offset: FileOffset) -> Result<()> {
    let mut file = OpenOptions::new().read(true).write(true).open(path)?;
    file.seek(SeekFrom::Start(entry_position(slot)))?;
    file.write_all(&encode_entry(offset))?;
    file.flush()?;
    tracing::trace!(path = %path.display(), slot, offset, "patched slot directory entry");
    Ok(())
}

pub(crate) fn discard_disk(path: &Path, slot: IndexSlot) -> Result<()> {
    match slot {
        IndexSlot::Dedicated => match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        },
        IndexSlot::Shared(id) => {
            if path.exists() {
                patch_disk_entry(path, id as usize, 0)
            } else {
                Ok(())
            }
        }
    }
}

#[inline]
pub(crate) fn check_buffered_offset(offset: FileOffset) -> Result<()> {
    if offset > BUFFERED_OFFSET_LIMIT {
        return Err(Error::InvalidArgumentError(format!(
            "offset {offset} is beyond the buffered backend limit; use the huge backend"
        )));
    }
    Ok(())
}

#[inline]
pub(crate) fn not_open(op: &str) -> Error {
    Error::Io(io::Error::other(format!("{op}: index file is not open")))
}
