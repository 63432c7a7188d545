//! Read-only index file served from a memory map.
//!
//! The whole file is mapped at open; sections are copied out of the map as
//! the index layer reads them. Writing goes through the buffered or huge
//! backends.

use super::{IndexFile, discard_disk, not_open};
use crate::constants::DIRECTORY_SIZE;
use crate::directory::SlotDirectory;
use crate::types::{FileOffset, IndexSlot, OpenMode};
use flatdex_result::{Error, Result};
use memmap2::Mmap;
use std::fs::File;
use std::io;
use std::path::Path;

#[derive(Default)]
pub struct MappedIndexFile {
    map: Option<Mmap>,
    cursor: usize,
}

impl MappedIndexFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes left between the cursor and the end of the mapping.
    pub fn remaining(&self) -> usize {
        self.map
            .as_ref()
            .map_or(0, |m| m.len().saturating_sub(self.cursor))
    }
}

fn past_end(what: &str, at: usize, len: usize) -> Error {
    Error::Io(io::Error::new(
        io::ErrorKind::UnexpectedEof,
        format!("{what} {len} bytes at {at} runs past the mapped file"),
    ))
}

fn to_cursor(offset: FileOffset) -> Result<usize> {
    usize::try_from(offset).map_err(|_| {
        Error::InvalidArgumentError(format!("offset {offset} exceeds the address space"))
    })
}

impl IndexFile for MappedIndexFile {
    fn open(&mut self, path: &Path, slot: IndexSlot, mode: OpenMode) -> Result<()> {
        if mode != OpenMode::Read {
            return Err(Error::InvalidArgumentError(format!(
                "mapped index file {} is read-only",
                path.display()
            )));
        }
        if self.map.is_some() {
            return Err(Error::InvalidArgumentError(format!(
                "index file {} is already open",
                path.display()
            )));
        }

        let file = File::open(path)?;
        // SAFETY: the map is read-only and dropped at close; index files are
        // not rewritten while a reader holds them.
        let map = unsafe { Mmap::map(&file)? };

        let mut cursor = 0;
        if let Some(id) = slot.shared_id() {
            let head = map
                .get(..DIRECTORY_SIZE)
                .ok_or_else(|| past_end("directory of", 0, DIRECTORY_SIZE))?;
            let offset = SlotDirectory::from_le_bytes(head)?
                .offset(id)
                .ok_or(Error::NotFound)?;
            cursor = to_cursor(offset)?;
        }

        tracing::trace!(
            path = %path.display(),
            ?slot,
            len = map.len(),
            cursor,
            "mapped index file opened"
        );
        self.map = Some(map);
        self.cursor = cursor;
        Ok(())
    }

    fn seek(&mut self, offset: FileOffset) -> Result<()> {
        if self.map.is_none() {
            return Err(not_open("seek"));
        }
        self.cursor = to_cursor(offset)?;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        let map = self.map.as_ref().ok_or_else(|| not_open("read"))?;
        let end = self.cursor.saturating_add(buf.len());
        let bytes = map
            .get(self.cursor..end)
            .ok_or_else(|| past_end("reading", self.cursor, buf.len()))?;
        buf.copy_from_slice(bytes);
        self.cursor = end;
        Ok(())
    }

    fn write(&mut self, _buf: &[u8]) -> Result<usize> {
        Err(Error::InvalidArgumentError(
            "mapped index files are read-only".into(),
        ))
    }

    fn close(&mut self, _path: &Path, _slot: IndexSlot) -> Result<()> {
        self.map = None;
        self.cursor = 0;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.map.is_some()
    }

    fn discard(&mut self, path: &Path, slot: IndexSlot) -> Result<()> {
        self.map = None;
        discard_disk(path, slot)
    }
}
