//! Unbuffered index file with 64-bit offsets, for index files past 2 GiB.
//!
//! Every read and write goes straight to the descriptor.

use super::{IndexFile, discard_disk, not_open};
use crate::constants::DIRECTORY_SIZE;
use crate::directory::{SlotDirectory, encode_entry, entry_position};
use crate::types::{FileOffset, IndexSlot, OpenMode};
use flatdex_result::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

pub struct HugeIndexFile {
    file: Option<File>,
    mode: OpenMode,
    new_offset: FileOffset,
}

impl Default for HugeIndexFile {
    fn default() -> Self {
        Self::new()
    }
}

impl HugeIndexFile {
    pub fn new() -> Self {
        Self {
            file: None,
            mode: OpenMode::Read,
            new_offset: 0,
        }
    }
}

#[cfg(unix)]
fn options_for(mode: OpenMode) -> OpenOptions {
    use std::os::unix::fs::OpenOptionsExt;

    let mut opts = OpenOptions::new();
    match mode {
        OpenMode::Read => opts.read(true),
        OpenMode::Write => opts.write(true).create(true).truncate(true).mode(0o666),
        OpenMode::Insert => opts.append(true),
    };
    opts
}

#[cfg(windows)]
fn options_for(mode: OpenMode) -> OpenOptions {
    use std::os::windows::fs::OpenOptionsExt;

    const FILE_SHARE_READ: u32 = 0x0000_0001;
    let mut opts = OpenOptions::new();
    match mode {
        OpenMode::Read => opts.read(true).share_mode(FILE_SHARE_READ),
        OpenMode::Write => opts.write(true).create(true).truncate(true).share_mode(0),
        OpenMode::Insert => opts.append(true).share_mode(0),
    };
    opts
}

#[cfg(not(any(unix, windows)))]
fn options_for(mode: OpenMode) -> OpenOptions {
    let mut opts = OpenOptions::new();
    match mode {
        OpenMode::Read => opts.read(true),
        OpenMode::Write => opts.write(true).create(true).truncate(true),
        OpenMode::Insert => opts.append(true),
    };
    opts
}

#[cfg(unix)]
fn write_entry(path: &Path, slot: usize, offset: FileOffset) -> Result<()> {
    use std::os::unix::fs::FileExt;

    let file = OpenOptions::new().write(true).open(path)?;
    file.write_all_at(&encode_entry(offset), entry_position(slot))?;
    file.sync_data()?;
    Ok(())
}

#[cfg(not(unix))]
fn write_entry(path: &Path, slot: usize, offset: FileOffset) -> Result<()> {
    super::patch_disk_entry(path, slot, offset)
}

impl IndexFile for HugeIndexFile {
    fn open(&mut self, path: &Path, slot: IndexSlot, mode: OpenMode) -> Result<()> {
        if self.file.is_some() {
            return Err(Error::InvalidArgumentError(format!(
                "index file {} is already open",
                path.display()
            )));
        }
        let mut file = options_for(mode).open(path)?;
        self.mode = mode;
        self.new_offset = 0;

        match mode {
            OpenMode::Read => {
                if let Some(id) = slot.shared_id() {
                    let mut head = [0u8; DIRECTORY_SIZE];
                    file.read_exact(&mut head)?;
                    let offset = SlotDirectory::from_le_bytes(&head)?
                        .offset(id)
                        .ok_or(Error::NotFound)?;
                    file.seek(SeekFrom::Start(offset))?;
                }
            }
            OpenMode::Write => {
                if slot.shared_id().is_some() {
                    file.write_all(&SlotDirectory::default().to_le_bytes())?;
                    self.new_offset = DIRECTORY_SIZE as FileOffset;
                }
            }
            OpenMode::Insert => {
                self.new_offset = file.seek(SeekFrom::End(0))?;
            }
        }

        tracing::trace!(
            path = %path.display(),
            ?slot,
            ?mode,
            new_offset = self.new_offset,
            "huge index file opened"
        );
        self.file = Some(file);
        Ok(())
    }

    fn seek(&mut self, offset: FileOffset) -> Result<()> {
        let file = self.file.as_mut().ok_or_else(|| not_open("seek"))?;
        file.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        let file = self.file.as_mut().ok_or_else(|| not_open("read"))?;
        file.read_exact(buf)?;
        Ok(())
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let file = self.file.as_mut().ok_or_else(|| not_open("write"))?;
        file.write_all(buf)?;
        Ok(buf.len())
    }

    fn close(&mut self, path: &Path, slot: IndexSlot) -> Result<()> {
        let Some(file) = self.file.take() else {
            return Ok(());
        };
        if self.mode == OpenMode::Read {
            return Ok(());
        }
        file.sync_data()?;
        drop(file);
        if let Some(id) = slot.shared_id() {
            write_entry(path, id, self.new_offset)?;
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.file.is_some()
    }

    fn discard(&mut self, path: &Path, slot: IndexSlot) -> Result<()> {
        self.file = None;
        discard_disk(path, slot)
    }
}
