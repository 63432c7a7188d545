//! Sorted, deduplicated multi-part secondary indexes over flat row stores.
//!
//! An [`Index`] is built by scanning a [`RowSource`] once, sorting the
//! captured key values and compacting them into one [`KeyColumn`] per key
//! part. Part `k` keeps the distinct values of the key prefix ending at `k`
//! plus offsets into part `k + 1`, so a probe descends the parts left to
//! right, each search narrowed to the range its parent selected.
//!
//! Built indexes can be saved to an index file (dedicated or one slot of a
//! shared file, see [`flatdex_storage`]) and loaded back as long as the
//! definition and the row store still agree with what was saved.
//!
//! Queries go through the [`IndexCursor`] protocol, which [`RowIndex`] also
//! implements for tables addressed by row number.

pub mod arrow_source;
mod builder;
pub mod config;
pub mod cursor;
pub mod definition;
pub mod index;
pub mod key_column;
mod lookup;
pub mod persist;
pub mod row_index;
pub mod source;
pub mod table;
pub mod types;

pub use arrow_source::{BatchRowSource, RowPredicate};
pub use config::{DEFAULT_BLOCK_THRESHOLD, DEFAULT_MIN_BLOCK_STRIDE, IndexConfig, IndexStore};
pub use cursor::{Fetch, IndexCursor, RangeBound, SeekOp};
pub use definition::{IndexDefinition, KeyPartDefinition};
pub use flatdex_result::{Error, Result};
pub use index::Index;
pub use key_column::{KeyColumn, ProbeKey};
pub use persist::read_sizes;
pub use row_index::RowIndex;
pub use source::{BlockTest, ColumnSpec, ReadStatus, RecordFormat, RowSource};
pub use table::{TableIndexes, TableLayout};
pub use types::{KeyType, KeyValue, RowPosition};
