use std::{fmt, io};
use thiserror::Error;

/// Unified error type for all flatdex operations.
///
/// None of these are silently degraded: a build that fails leaves no usable
/// index behind, and a persisted index that fails validation is never
/// partially trusted.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error on an index file.
    ///
    /// Wraps the underlying OS error for open, read, write, seek, and close
    /// failures. The caller usually falls back to rebuilding the index or to
    /// an unindexed scan.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Arrow error raised while adapting columnar data as a row source.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// A sized array could not be obtained.
    ///
    /// Raised when reserving the position, key, offset, or block arrays
    /// fails, and when a column cannot be indexed at all (nullable columns
    /// with a full-length key). The current operation is aborted and no
    /// partial index is exposed.
    #[error("cannot allocate {what} ({count} entries)")]
    AllocationFailed { what: String, count: usize },

    /// A unique index encountered a duplicate composite key during build.
    ///
    /// Transient build state is discarded; callers typically scan instead.
    #[error("index {index} is not unique")]
    UniqueViolation { index: String },

    /// A persisted index disagrees with the live index definition.
    ///
    /// Covers part count, per-part value type and key length, and stale row
    /// counts. The index must be rebuilt; it is never patched around.
    #[error("index format mismatch: {0}")]
    FormatMismatch(String),

    /// The row store failed while being scanned.
    #[error("row source error: {0}")]
    RowSource(String),

    /// Invalid user input or API parameter.
    #[error("Invalid argument: {0}")]
    InvalidArgumentError(String),

    /// No persisted index exists where one was expected.
    ///
    /// Also returned for a shared-file slot whose directory entry was never
    /// committed.
    #[error("index not found")]
    NotFound,

    /// Internal error indicating a bug or unexpected state.
    #[error("An internal operation failed: {0}")]
    Internal(String),
}

impl Error {
    /// Build an [`Error::AllocationFailed`] for `count` entries of `what`.
    #[inline]
    pub fn allocation(what: impl Into<String>, count: usize) -> Self {
        Error::AllocationFailed {
            what: what.into(),
            count,
        }
    }

    /// Create a row source error from any displayable error.
    ///
    /// # Examples
    ///
    /// ```
    /// use flatdex_result::Error;
    ///
    /// let err = Error::row_source("unexpected end of record");
    /// assert!(matches!(err, Error::RowSource(msg) if msg.contains("end of record")));
    /// ```
    #[inline]
    pub fn row_source<E: fmt::Display>(err: E) -> Self {
        Error::RowSource(err.to_string())
    }

    /// True for errors that mean "the persisted form cannot be used, rebuild
    /// it" rather than a hard failure.
    pub fn is_rebuildable(&self) -> bool {
        matches!(
            self,
            Error::FormatMismatch(_) | Error::NotFound | Error::Io(_)
        )
    }
}
