//! Error types and result definitions for the flatdex index engine.
//!
//! Every flatdex crate returns [`Result<T>`], where the error variant is the
//! shared [`Error`] enum. Errors are never retried internally: they travel
//! with `?` up to the row-store or query layer that asked for the index, and
//! that caller decides whether to rebuild, reload, or scan unindexed.
//!
//! Errors are organized into several categories:
//!
//! - **Allocation failures** ([`Error::AllocationFailed`]): a sized array could not be reserved
//! - **Uniqueness violations** ([`Error::UniqueViolation`]): a unique index saw a duplicate key
//! - **I/O errors** ([`Error::Io`]): open/read/write/seek failures on an index file
//! - **Format mismatches** ([`Error::FormatMismatch`]): a persisted index disagrees with its definition
//! - **Row store errors** ([`Error::RowSource`]): the row collaborator failed while being scanned
//! - **User input errors** ([`Error::InvalidArgumentError`]): bad probes, slots, or definitions
//! - **Lookup failures** ([`Error::NotFound`]): no persisted index where one was expected
//! - **Internal errors** ([`Error::Internal`]): violated invariants

pub mod error;
pub mod result;

pub use error::Error;
pub use result::Result;
