//! Contract between the index engine and the row store it indexes.
//!
//! The engine only ever scans a source sequentially from the start, asks it
//! for its size, and reads the current row's key columns. Everything else
//! about the row store stays on the other side of this trait.

use crate::types::{KeyType, KeyValue, RowPosition};
use flatdex_result::Result;

/// Outcome of advancing a row source by one record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadStatus {
    Ok,
    EndOfFile,
    /// The record was read but rejected by the source itself.
    Filtered,
}

/// Outcome of the block-level pre-filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockTest {
    Ok,
    EndOfFile,
    /// The current block holds no qualifying row. The source has moved past it.
    NotFound,
}

/// Physical layout of the row store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordFormat {
    /// Delimited or line-oriented records of varying length.
    Variable,
    Fixed,
    Binary,
    /// Column-wise vector files.
    Vector,
    /// dBASE files, whose cardinality counts soft-deleted records.
    Dbf,
}

impl RecordFormat {
    /// Extension of the index file written for this kind of table.
    pub fn index_extension(self) -> &'static str {
        match self {
            RecordFormat::Variable => "dnx",
            RecordFormat::Fixed => "fnx",
            RecordFormat::Binary => "bnx",
            RecordFormat::Vector => "vnx",
            RecordFormat::Dbf => "dbx",
        }
    }

    /// True when row positions of a physically sorted file form an
    /// arithmetic sequence.
    pub fn has_computable_positions(self) -> bool {
        matches!(
            self,
            RecordFormat::Fixed | RecordFormat::Binary | RecordFormat::Vector
        )
    }
}

/// Description of one column the source can supply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    /// Ordinal used with [`RowSource::value`].
    pub ordinal: usize,
    pub key_type: KeyType,
    /// Declared width in bytes (text) or the type's natural width.
    pub width: usize,
    pub nullable: bool,
}

pub trait RowSource {
    fn record_format(&self) -> RecordFormat;

    /// Resolve a column by name.
    fn column_spec(&self, name: &str) -> Result<ColumnSpec>;

    /// Upper bound on the number of rows, if it can be known without a scan.
    fn max_size_estimate(&mut self) -> Option<usize>;

    /// Exact number of rows, for stores that know it without a scan.
    fn exact_cardinality(&mut self) -> Option<usize>;

    /// Position the source before its first row.
    fn rewind(&mut self) -> Result<()>;

    /// Block-level pre-filter consulted before each read.
    fn test_block(&mut self) -> Result<BlockTest> {
        Ok(BlockTest::Ok)
    }

    fn read_next(&mut self) -> Result<ReadStatus>;

    /// Whether a row-level predicate is installed.
    fn has_filter(&self) -> bool {
        false
    }

    /// Evaluate the row-level predicate on the current row.
    fn apply_filter(&mut self) -> Result<bool> {
        Ok(true)
    }

    /// Position of the row last returned by [`RowSource::read_next`].
    fn current_position(&self) -> RowPosition;

    /// Value of column `ordinal` in the current row.
    fn value(&self, ordinal: usize) -> Result<KeyValue>;
}
