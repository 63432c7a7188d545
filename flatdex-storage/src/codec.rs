//! Little-endian encoding for the fixed-width integers of an index file.

use crate::file::IndexFile;
use flatdex_result::{Error, Result};

pub const INT_SIZE: usize = 4;

#[inline]
pub fn push_u32(out: &mut Vec<u8>, x: u32) {
    out.extend_from_slice(&x.to_le_bytes());
}

#[inline]
pub fn read_u32_at(b: &[u8], pos: usize) -> (u32, usize) {
    let mut word = [0u8; INT_SIZE];
    word.copy_from_slice(&b[pos..pos + INT_SIZE]);
    (u32::from_le_bytes(word), pos + INT_SIZE)
}

/// Encode a slice of integers as one contiguous section.
pub fn encode_u32s(values: &[u32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * INT_SIZE);
    for &v in values {
        push_u32(&mut out, v);
    }
    out
}

/// Decode a section previously produced by [`encode_u32s`].
pub fn decode_u32s(bytes: &[u8]) -> Result<Vec<u32>> {
    if bytes.len() % INT_SIZE != 0 {
        return Err(Error::FormatMismatch(format!(
            "integer section of {} bytes is not a multiple of {INT_SIZE}",
            bytes.len()
        )));
    }
    let mut out = Vec::new();
    out.try_reserve_exact(bytes.len() / INT_SIZE)
        .map_err(|_| Error::allocation("integer section", bytes.len() / INT_SIZE))?;
    let mut pos = 0;
    while pos < bytes.len() {
        let (v, next) = read_u32_at(bytes, pos);
        out.push(v);
        pos = next;
    }
    Ok(out)
}

/// Sequential writer that keeps count of the bytes it pushed to a file.
pub struct SectionWriter<'a> {
    file: &'a mut dyn IndexFile,
    written: usize,
}

impl<'a> SectionWriter<'a> {
    pub fn new(file: &'a mut dyn IndexFile) -> Self {
        Self { file, written: 0 }
    }

    pub fn write_u32s(&mut self, values: &[u32]) -> Result<()> {
        self.write_bytes(&encode_u32s(values))
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.file.write(bytes)?;
        self.written += bytes.len();
        Ok(())
    }

    pub fn written(&self) -> usize {
        self.written
    }
}

/// Sequential reader mirroring [`SectionWriter`].
pub struct SectionReader<'a> {
    file: &'a mut dyn IndexFile,
}

impl<'a> SectionReader<'a> {
    pub fn new(file: &'a mut dyn IndexFile) -> Self {
        Self { file }
    }

    pub fn read_u32s(&mut self, count: usize) -> Result<Vec<u32>> {
        let bytes = self.read_bytes(count * INT_SIZE)?;
        decode_u32s(&bytes)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let mut word = [0u8; INT_SIZE];
        self.file.read(&mut word)?;
        Ok(u32::from_le_bytes(word))
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(len)
            .map_err(|_| Error::allocation("index file section", len))?;
        buf.resize(len, 0);
        self.file.read(&mut buf)?;
        Ok(buf)
    }
}
