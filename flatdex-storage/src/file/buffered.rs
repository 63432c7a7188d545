//! Buffered index file for files below 2 GiB.

use super::{IndexFile, check_buffered_offset, discard_disk, not_open, patch_disk_entry};
use crate::constants::DIRECTORY_SIZE;
use crate::directory::SlotDirectory;
use crate::types::{FileOffset, IndexSlot, OpenMode};
use flatdex_result::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

enum Stream {
    Reader(BufReader<File>),
    Writer(BufWriter<File>),
}

pub struct BufferedIndexFile {
    stream: Option<Stream>,
    new_offset: FileOffset,
}

impl Default for BufferedIndexFile {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferedIndexFile {
    pub fn new() -> Self {
        Self {
            stream: None,
            new_offset: 0,
        }
    }
}

impl IndexFile for BufferedIndexFile {
    fn open(&mut self, path: &Path, slot: IndexSlot, mode: OpenMode) -> Result<()> {
        if self.stream.is_some() {
            return Err(Error::InvalidArgumentError(format!(
                "index file {} is already open",
                path.display()
            )));
        }
        self.new_offset = 0;

        let stream = match mode {
            OpenMode::Read => {
                let mut reader = BufReader::new(File::open(path)?);
                if let Some(id) = slot.shared_id() {
                    let mut head = [0u8; DIRECTORY_SIZE];
                    reader.read_exact(&mut head)?;
                    let offset = SlotDirectory::from_le_bytes(&head)?
                        .offset(id)
                        .ok_or(Error::NotFound)?;
                    check_buffered_offset(offset)?;
                    reader.seek(SeekFrom::Start(offset))?;
                }
                Stream::Reader(reader)
            }
            OpenMode::Write => {
                let mut writer = BufWriter::new(File::create(path)?);
                if slot.shared_id().is_some() {
                    writer.write_all(&SlotDirectory::default().to_le_bytes())?;
                    self.new_offset = DIRECTORY_SIZE as FileOffset;
                }
                Stream::Writer(writer)
            }
            OpenMode::Insert => {
                let file = OpenOptions::new().append(true).open(path)?;
                self.new_offset = file.metadata()?.len();
                check_buffered_offset(self.new_offset)?;
                Stream::Writer(BufWriter::new(file))
            }
        };

        tracing::trace!(
            path = %path.display(),
            ?slot,
            ?mode,
            new_offset = self.new_offset,
            "buffered index file opened"
        );
        self.stream = Some(stream);
        Ok(())
    }

    fn seek(&mut self, offset: FileOffset) -> Result<()> {
        check_buffered_offset(offset)?;
        match self.stream.as_mut() {
            Some(Stream::Reader(r)) => r.seek(SeekFrom::Start(offset))?,
            Some(Stream::Writer(w)) => w.seek(SeekFrom::Start(offset))?,
            None => return Err(not_open("seek")),
        };
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        match self.stream.as_mut() {
            Some(Stream::Reader(r)) => Ok(r.read_exact(buf)?),
            Some(Stream::Writer(_)) => Err(Error::InvalidArgumentError(
                "index file is open for writing".into(),
            )),
            None => Err(not_open("read")),
        }
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        match self.stream.as_mut() {
            Some(Stream::Writer(w)) => {
                w.write_all(buf)?;
                Ok(buf.len())
            }
            Some(Stream::Reader(_)) => Err(Error::InvalidArgumentError(
                "index file is open for reading".into(),
            )),
            None => Err(not_open("write")),
        }
    }

    /// Only a writer patches the directory; the stream kind records the mode.
    fn close(&mut self, path: &Path, slot: IndexSlot) -> Result<()> {
        match self.stream.take() {
            Some(Stream::Writer(w)) => {
                let file = w.into_inner().map_err(|e| e.into_error())?;
                file.sync_data()?;
                drop(file);
                if let Some(id) = slot.shared_id() {
                    patch_disk_entry(path, id, self.new_offset)?;
                }
            }
            Some(Stream::Reader(_)) | None => {}
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    fn discard(&mut self, path: &Path, slot: IndexSlot) -> Result<()> {
        self.stream = None;
        discard_disk(path, slot)
    }
}
