//! Index files held in a process-local map.

use super::{IndexFile, not_open};
use crate::constants::DIRECTORY_SIZE;
use crate::directory::{SlotDirectory, encode_entry, entry_position};
use crate::types::{FileOffset, IndexSlot, OpenMode};
use flatdex_result::{Error, Result};
use rustc_hash::FxHashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared in-memory "disk". Clones see the same files.
#[derive(Clone, Debug, Default)]
pub struct MemFileSystem {
    files: Arc<Mutex<FxHashMap<PathBuf, Vec<u8>>>>,
}

impl MemFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, FxHashMap<PathBuf, Vec<u8>>>> {
        self.files
            .lock()
            .map_err(|_| Error::Internal("memory file system lock poisoned".into()))
    }

    pub fn exists(&self, path: &Path) -> Result<bool> {
        Ok(self.lock()?.contains_key(path))
    }

    pub fn len(&self, path: &Path) -> Result<Option<u64>> {
        Ok(self.lock()?.get(path).map(|b| b.len() as u64))
    }

    /// Copy of a file's bytes.
    pub fn contents(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        Ok(self.lock()?.get(path).cloned())
    }

    /// Replace a file's bytes outright.
    pub fn put(&self, path: &Path, bytes: Vec<u8>) -> Result<()> {
        self.lock()?.insert(path.to_path_buf(), bytes);
        Ok(())
    }

    pub fn remove(&self, path: &Path) -> Result<bool> {
        Ok(self.lock()?.remove(path).is_some())
    }

    fn write_at(&self, path: &Path, offset: FileOffset, bytes: &[u8]) -> Result<()> {
        let mut files = self.lock()?;
        let data = files.get_mut(path).ok_or_else(|| missing(path))?;
        let start = offset as usize;
        let end = start + bytes.len();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(bytes);
        Ok(())
    }

    fn read_at(&self, path: &Path, offset: FileOffset, buf: &mut [u8]) -> Result<()> {
        let files = self.lock()?;
        let data = files.get(path).ok_or_else(|| missing(path))?;
        let start = offset as usize;
        let end = start + buf.len();
        if end > data.len() {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("read past end of {}", path.display()),
            )));
        }
        buf.copy_from_slice(&data[start..end]);
        Ok(())
    }
}

fn missing(path: &Path) -> Error {
    Error::Io(io::Error::new(
        io::ErrorKind::NotFound,
        format!("{} does not exist", path.display()),
    ))
}

pub struct MemIndexFile {
    fs: MemFileSystem,
    path: Option<PathBuf>,
    cursor: FileOffset,
    mode: OpenMode,
    new_offset: FileOffset,
}

impl MemIndexFile {
    pub fn new(fs: MemFileSystem) -> Self {
        Self {
            fs,
            path: None,
            cursor: 0,
            mode: OpenMode::Read,
            new_offset: 0,
        }
    }

    fn open_path(&self, op: &str) -> Result<&Path> {
        self.path.as_deref().ok_or_else(|| not_open(op))
    }
}

impl IndexFile for MemIndexFile {
    fn open(&mut self, path: &Path, slot: IndexSlot, mode: OpenMode) -> Result<()> {
        if self.path.is_some() {
            return Err(Error::InvalidArgumentError(format!(
                "index file {} is already open",
                path.display()
            )));
        }
        self.mode = mode;
        self.new_offset = 0;
        self.cursor = 0;

        match mode {
            OpenMode::Read => {
                if !self.fs.exists(path)? {
                    return Err(missing(path));
                }
                if let Some(id) = slot.shared_id() {
                    let mut head = [0u8; DIRECTORY_SIZE];
                    self.fs.read_at(path, 0, &mut head)?;
                    self.cursor = SlotDirectory::from_le_bytes(&head)?
                        .offset(id)
                        .ok_or(Error::NotFound)?;
                }
            }
            OpenMode::Write => {
                let bytes = if slot.shared_id().is_some() {
                    SlotDirectory::default().to_le_bytes()
                } else {
                    Vec::new()
                };
                self.cursor = bytes.len() as FileOffset;
                self.new_offset = self.cursor;
                self.fs.put(path, bytes)?;
            }
            OpenMode::Insert => {
                let len = self.fs.len(path)?.ok_or_else(|| missing(path))?;
                self.cursor = len;
                self.new_offset = len;
            }
        }

        tracing::trace!(
            path = %path.display(),
            ?slot,
            ?mode,
            cursor = self.cursor,
            "memory index file opened"
        );
        self.path = Some(path.to_path_buf());
        Ok(())
    }

    fn seek(&mut self, offset: FileOffset) -> Result<()> {
        self.open_path("seek")?;
        self.cursor = offset;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        let path = self.open_path("read")?;
        self.fs.read_at(path, self.cursor, buf)?;
        self.cursor += buf.len() as FileOffset;
        Ok(())
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if self.mode == OpenMode::Read {
            return Err(Error::InvalidArgumentError(
                "index file is open for reading".into(),
            ));
        }
        let path = self.open_path("write")?;
        self.fs.write_at(path, self.cursor, buf)?;
        self.cursor += buf.len() as FileOffset;
        Ok(buf.len())
    }

    fn close(&mut self, path: &Path, slot: IndexSlot) -> Result<()> {
        if self.path.take().is_none() {
            return Ok(());
        }
        if self.mode == OpenMode::Read {
            return Ok(());
        }
        if let Some(id) = slot.shared_id() {
            self.fs
                .write_at(path, entry_position(id), &encode_entry(self.new_offset))?;
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.path.is_some()
    }

    fn discard(&mut self, path: &Path, slot: IndexSlot) -> Result<()> {
        self.path = None;
        match slot {
            IndexSlot::Dedicated => {
                self.fs.remove(path)?;
            }
            IndexSlot::Shared(id) => {
                if self.fs.exists(path)? {
                    self.fs
                        .write_at(path, entry_position(id as usize), &encode_entry(0))?;
                }
            }
        }
        Ok(())
    }
}
