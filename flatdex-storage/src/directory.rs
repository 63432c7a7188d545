//! Fixed-size directory at the head of a shared index file.
//!
//! Layout: `MAX_SLOTS` entries of `(low: u32, high: u32)`, little-endian,
//! together forming the 64-bit offset of each slot's payload. A zero entry
//! means the slot holds no committed index.
//!
//! The directory is zeroed when the file is created and each entry is
//! patched only when its index is closed. A crash in between leaves the
//! payload written but the entry still zero; nothing here repairs that.

use crate::codec::{push_u32, read_u32_at};
use crate::constants::{DIRECTORY_ENTRY_SIZE, DIRECTORY_SIZE, MAX_SLOTS};
use crate::types::FileOffset;
use flatdex_result::{Error, Result};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SlotDirectory {
    entries: [FileOffset; MAX_SLOTS],
}

impl SlotDirectory {
    pub fn from_le_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < DIRECTORY_SIZE {
            return Err(Error::FormatMismatch(format!(
                "slot directory truncated to {} bytes",
                bytes.len()
            )));
        }
        let mut entries = [0; MAX_SLOTS];
        let mut pos = 0;
        for entry in entries.iter_mut() {
            let (low, next) = read_u32_at(bytes, pos);
            let (high, next) = read_u32_at(bytes, next);
            *entry = join_offset(low, high);
            pos = next;
        }
        Ok(Self { entries })
    }

    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(DIRECTORY_SIZE);
        for &offset in &self.entries {
            out.extend_from_slice(&encode_entry(offset));
        }
        out
    }

    #[inline]
    pub fn offset(&self, slot: usize) -> Option<FileOffset> {
        self.entries.get(slot).copied().filter(|&o| o != 0)
    }

    pub fn set_offset(&mut self, slot: usize, offset: FileOffset) {
        if let Some(entry) = self.entries.get_mut(slot) {
            *entry = offset;
        }
    }
}

/// Byte position of `slot`'s entry inside the directory.
#[inline]
pub fn entry_position(slot: usize) -> FileOffset {
    (slot * DIRECTORY_ENTRY_SIZE) as FileOffset
}

/// Encode one entry as its `(low, high)` halves.
pub fn encode_entry(offset: FileOffset) -> [u8; DIRECTORY_ENTRY_SIZE] {
    let (low, high) = split_offset(offset);
    let mut out = Vec::with_capacity(DIRECTORY_ENTRY_SIZE);
    push_u32(&mut out, low);
    push_u32(&mut out, high);
    let mut entry = [0u8; DIRECTORY_ENTRY_SIZE];
    entry.copy_from_slice(&out);
    entry
}

#[inline]
pub fn split_offset(offset: FileOffset) -> (u32, u32) {
    (offset as u32, (offset >> 32) as u32)
}

#[inline]
pub fn join_offset(low: u32, high: u32) -> FileOffset {
    ((high as FileOffset) << 32) | low as FileOffset
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_directory_is_all_uncommitted() {
        let dir = SlotDirectory::default();
        let bytes = dir.to_le_bytes();
        assert_eq!(bytes.len(), DIRECTORY_SIZE);
        assert!(bytes.iter().all(|&b| b == 0));
        assert!((0..MAX_SLOTS).all(|s| dir.offset(s).is_none()));
    }

    #[test]
    fn offsets_above_four_gib_keep_their_high_half() {
        let mut dir = SlotDirectory::default();
        dir.set_offset(3, 0x0000_0001_0000_0050);
        let back = SlotDirectory::from_le_bytes(&dir.to_le_bytes()).unwrap();
        assert_eq!(back.offset(3), Some(0x0000_0001_0000_0050));
        assert_eq!(split_offset(0x0000_0001_0000_0050), (0x50, 1));
    }

    #[test]
    fn truncated_directory_is_a_format_mismatch() {
        let err = SlotDirectory::from_le_bytes(&[0u8; 12]).unwrap_err();
        assert!(matches!(err, Error::FormatMismatch(_)));
    }
}
