use crate::types::FileOffset;

/// Number of index slots in a shared index file directory.
pub const MAX_SLOTS: usize = 10;

/// Bytes per directory entry: a `(low, high)` pair of 32-bit halves.
pub const DIRECTORY_ENTRY_SIZE: usize = 8;

/// Bytes reserved at the head of every shared index file.
pub const DIRECTORY_SIZE: usize = MAX_SLOTS * DIRECTORY_ENTRY_SIZE;

/// Largest offset the buffered backend will address.
pub const BUFFERED_OFFSET_LIMIT: FileOffset = i32::MAX as FileOffset;
